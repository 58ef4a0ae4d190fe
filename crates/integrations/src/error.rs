//! 협력자 에러 타입
//!
//! [`IntegrationError`]는 외부 도구 호출에서 발생하는 모든 에러를 표현합니다.
//! `From<IntegrationError> for TestgateError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use testgate_core::error::{CollaboratorError, TestgateError};

/// 외부 협력자 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    /// 워크로드가 제한 시간 내에 준비되지 않음
    #[error("workload '{workload}' in namespace '{namespace}' not ready: {reason}")]
    ReadinessTimeout {
        /// 대상 워크로드
        workload: String,
        /// 네임스페이스
        namespace: String,
        /// 사유
        reason: String,
    },

    /// 준비 상태 조회 실패 (타임아웃 외)
    #[error("readiness probe for '{workload}' failed: {reason}")]
    ReadinessProbe {
        /// 대상 워크로드
        workload: String,
        /// 사유
        reason: String,
    },

    /// 테스트 계획 저장소 체크아웃 실패
    #[error("source fetch from '{url}' failed: {reason}")]
    SourceFetch {
        /// 저장소 URL
        url: String,
        /// 사유
        reason: String,
    },

    /// 테스트 실행기 실패 (실행 불가, 타임아웃)
    #[error("test execution failed: {0}")]
    Execution(String),

    /// 설정 조회 실패
    #[error("config lookup {namespace}/{name}[{key}] failed: {reason}")]
    ConfigLookup {
        /// 네임스페이스
        namespace: String,
        /// ConfigMap 이름
        name: String,
        /// 데이터 키
        key: String,
        /// 사유
        reason: String,
    },

    /// 이벤트 발행 실패
    #[error("publish failed: {0}")]
    Publish(String),

    /// 아티팩트 정리 실패
    #[error("artifact error: {path}: {reason}")]
    Artifact {
        /// 대상 경로
        path: String,
        /// 사유
        reason: String,
    },

    /// 외부 도구에 전달할 인자가 유효하지 않음
    #[error("invalid argument '{field}': {reason}")]
    InvalidArgument {
        /// 인자 이름
        field: String,
        /// 사유
        reason: String,
    },
}

impl From<IntegrationError> for TestgateError {
    fn from(err: IntegrationError) -> Self {
        let msg = err.to_string();
        let collaborator = match err {
            IntegrationError::ReadinessTimeout { .. } => CollaboratorError::ReadinessTimeout(msg),
            IntegrationError::ReadinessProbe { .. } => CollaboratorError::ReadinessProbe(msg),
            IntegrationError::SourceFetch { .. } => CollaboratorError::SourceFetch(msg),
            IntegrationError::Execution(_)
            | IntegrationError::Artifact { .. }
            | IntegrationError::InvalidArgument { .. } => CollaboratorError::Execution(msg),
            IntegrationError::ConfigLookup { .. } => CollaboratorError::ConfigLookup(msg),
            IntegrationError::Publish(_) => CollaboratorError::Publish(msg),
        };
        TestgateError::Collaborator(collaborator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_timeout_display() {
        let err = IntegrationError::ReadinessTimeout {
            workload: "carts".to_owned(),
            namespace: "sockshop-dev".to_owned(),
            reason: "deadline exceeded".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("carts"));
        assert!(msg.contains("sockshop-dev"));
    }

    #[test]
    fn config_lookup_display() {
        let err = IntegrationError::ConfigLookup {
            namespace: "keptn".to_owned(),
            name: "keptn-domain".to_owned(),
            key: "app_domain".to_owned(),
            reason: "empty value".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "config lookup keptn/keptn-domain[app_domain] failed: empty value"
        );
    }

    #[test]
    fn converts_to_matching_collaborator_error() {
        let err: TestgateError = IntegrationError::ReadinessTimeout {
            workload: "carts".to_owned(),
            namespace: "ns".to_owned(),
            reason: "timed out".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            TestgateError::Collaborator(CollaboratorError::ReadinessTimeout(_))
        ));

        let err: TestgateError = IntegrationError::Publish("503".to_owned()).into();
        assert!(matches!(
            err,
            TestgateError::Collaborator(CollaboratorError::Publish(_))
        ));
    }

    #[test]
    fn artifact_error_maps_to_execution() {
        let err: TestgateError = IntegrationError::Artifact {
            path: "/tmp/x".to_owned(),
            reason: "permission denied".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            TestgateError::Collaborator(CollaboratorError::Execution(_))
        ));
    }
}
