//! 오케스트레이터 에러 타입
//!
//! - [`RunError`]: 실행을 알림 없이 중단시키는 에러
//! - [`PublishError`]: 판정은 났지만 알림 전달이 실패한 경우 (로그만 남김)

use testgate_core::error::TestgateError;
use testgate_core::event::NotificationKind;
use testgate_core::types::{InvalidResourceName, UnknownDeploymentStrategy};
use testgate_integrations::IntegrationError;

/// 실행 중단 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    /// 인식하지 못한 배포 전략 (준비 대기 이전에 중단)
    #[error(transparent)]
    UnknownDeploymentStrategy(#[from] UnknownDeploymentStrategy),

    /// 경로나 외부 도구 인자로 쓸 수 없는 서비스/프로젝트/스테이지 이름
    #[error(transparent)]
    InvalidResourceName(#[from] InvalidResourceName),

    /// 워크로드 준비 대기 시간 초과
    #[error("readiness timeout: {0}")]
    ReadinessTimeout(String),

    /// 준비 상태 조회 실패
    #[error("readiness probe failed: {0}")]
    ReadinessProbe(String),

    /// 테스트 계획 체크아웃 실패
    #[error("source fetch failed: {0}")]
    SourceFetch(String),

    /// 테스트 실행기 실패
    #[error("execution failed: {0}")]
    Execution(String),

    /// 게이트웨이 도메인 조회 실패
    #[error("config lookup failed: {0}")]
    ConfigLookup(String),

    /// 외부에서 취소됨
    #[error("run cancelled")]
    Cancelled,

    /// 실행 태스크가 비정상 종료됨
    #[error("run task failed: {0}")]
    TaskFailed(String),
}

impl RunError {
    /// 메트릭/로그용 고정 이름
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownDeploymentStrategy(_) => "unknown_deployment_strategy",
            Self::InvalidResourceName(_) => "invalid_resource_name",
            Self::ReadinessTimeout(_) => "readiness_timeout",
            Self::ReadinessProbe(_) => "readiness_probe",
            Self::SourceFetch(_) => "source_fetch",
            Self::Execution(_) => "execution",
            Self::ConfigLookup(_) => "config_lookup",
            Self::Cancelled => "cancelled",
            Self::TaskFailed(_) => "task_failed",
        }
    }
}

impl From<IntegrationError> for RunError {
    fn from(err: IntegrationError) -> Self {
        let msg = err.to_string();
        match err {
            IntegrationError::ReadinessTimeout { .. } => Self::ReadinessTimeout(msg),
            IntegrationError::ReadinessProbe { .. } => Self::ReadinessProbe(msg),
            IntegrationError::SourceFetch { .. } => Self::SourceFetch(msg),
            IntegrationError::ConfigLookup { .. } => Self::ConfigLookup(msg),
            IntegrationError::Execution(_)
            | IntegrationError::Artifact { .. }
            | IntegrationError::InvalidArgument { .. }
            | IntegrationError::Publish(_) => Self::Execution(msg),
        }
    }
}

impl From<RunError> for TestgateError {
    fn from(err: RunError) -> Self {
        TestgateError::Run(err.to_string())
    }
}

/// 알림 전달 실패
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to publish {kind}: {reason}")]
pub struct PublishError {
    /// 발행하려던 알림 종류
    pub kind: NotificationKind,
    /// 사유
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_strategy_is_transparent() {
        let err: RunError = UnknownDeploymentStrategy("canary".to_owned()).into();
        assert_eq!(err.to_string(), "unknown deployment strategy 'canary'");
        assert_eq!(err.kind(), "unknown_deployment_strategy");
    }

    #[test]
    fn invalid_name_is_transparent() {
        let err: RunError = InvalidResourceName {
            field: "service".to_owned(),
            value: "..".to_owned(),
            reason: "must not start with '.'",
        }
        .into();
        assert_eq!(err.to_string(), "invalid service '..': must not start with '.'");
        assert_eq!(err.kind(), "invalid_resource_name");
    }

    #[test]
    fn integration_errors_map_by_category() {
        let err: RunError = IntegrationError::ReadinessTimeout {
            workload: "carts".to_owned(),
            namespace: "ns".to_owned(),
            reason: "timed out".to_owned(),
        }
        .into();
        assert!(matches!(err, RunError::ReadinessTimeout(_)));

        let err: RunError = IntegrationError::ConfigLookup {
            namespace: "keptn".to_owned(),
            name: "keptn-domain".to_owned(),
            key: "app_domain".to_owned(),
            reason: "empty value".to_owned(),
        }
        .into();
        assert!(matches!(err, RunError::ConfigLookup(_)));

        let err: RunError = IntegrationError::Artifact {
            path: "/x".to_owned(),
            reason: "denied".to_owned(),
        }
        .into();
        assert!(matches!(err, RunError::Execution(_)));
    }

    #[test]
    fn run_error_into_top_level() {
        let err: TestgateError = RunError::Cancelled.into();
        assert!(matches!(err, TestgateError::Run(_)));
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn publish_error_display() {
        let err = PublishError {
            kind: NotificationKind::EvaluationDone,
            reason: "broker returned 503".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "failed to publish sh.keptn.events.evaluation-done: broker returned 503"
        );
    }
}
