//! 도메인 타입 -- 배포 토폴로지, 테스트 전략, 실행 파라미터, 결과

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 배포 토폴로지 레이블: 단일 롤아웃
pub const TOPOLOGY_DIRECT: &str = "direct";
/// 배포 토폴로지 레이블: blue/green 롤아웃
pub const TOPOLOGY_BLUE_GREEN: &str = "blue_green_service";

/// 인식하지 못한 배포 전략 레이블
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown deployment strategy '{0}'")]
pub struct UnknownDeploymentStrategy(pub String);

/// 리소스 이름 최대 길이 (DNS-1123 subdomain)
pub const MAX_RESOURCE_NAME_LEN: usize = 253;

/// 경로 요소나 외부 도구 인자로 쓸 수 없는 이름
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field} '{value}': {reason}")]
pub struct InvalidResourceName {
    /// 필드 이름 (예: `service`)
    pub field: String,
    /// 거부된 값
    pub value: String,
    /// 사유
    pub reason: &'static str,
}

/// 서비스/프로젝트/스테이지 같은 리소스 이름을 검증합니다.
///
/// ASCII 영숫자와 `-`, `.`, `_`만 허용하고 `-`나 `.`로 시작하는 값은 거부합니다.
/// 따라서 `.`과 `..`을 포함해 경로 구분자나 상위 디렉토리를 가리키는 값은
/// 통과할 수 없습니다.
pub fn check_resource_name(field: &str, value: &str) -> Result<(), InvalidResourceName> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value.len() > MAX_RESOURCE_NAME_LEN {
        Some("must be at most 253 characters")
    } else if value.starts_with('-') {
        Some("must not start with '-'")
    } else if value.starts_with('.') {
        Some("must not start with '.'")
    } else if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
    {
        Some("may only contain ASCII letters, digits, '-', '.' and '_'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(InvalidResourceName {
            field: field.to_owned(),
            value: value.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

/// 배포된 워크로드의 형태
///
/// 헬스 게이트가 몇 개의 준비 대기를 수행할지 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentTopology {
    /// 워크로드 하나 (이름 = 서비스명)
    Direct,
    /// `-blue`, `-green` 접미사를 가진 워크로드 두 개
    BlueGreen,
}

impl DeploymentTopology {
    /// 레이블을 토폴로지로 변환합니다 (대소문자 무시).
    pub fn parse(label: &str) -> Result<Self, UnknownDeploymentStrategy> {
        match label.to_ascii_lowercase().as_str() {
            TOPOLOGY_DIRECT => Ok(Self::Direct),
            TOPOLOGY_BLUE_GREEN => Ok(Self::BlueGreen),
            _ => Err(UnknownDeploymentStrategy(label.to_owned())),
        }
    }

    /// 준비 상태를 기다려야 하는 워크로드 이름을 대기 순서대로 반환합니다.
    pub fn rollout_targets(&self, service: &str) -> Vec<String> {
        match self {
            Self::Direct => vec![service.to_owned()],
            Self::BlueGreen => vec![format!("{service}-blue"), format!("{service}-green")],
        }
    }
}

impl fmt::Display for DeploymentTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "{TOPOLOGY_DIRECT}"),
            Self::BlueGreen => write!(f, "{TOPOLOGY_BLUE_GREEN}"),
        }
    }
}

/// 헬스 체크 이후 실행할 테스트 종류
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStrategy {
    /// 빈 레이블: 테스트 없음
    None,
    /// 기능 테스트
    Functional,
    /// 성능 테스트
    Performance,
    /// 인식하지 못한 비어있지 않은 레이블
    Unknown(String),
}

impl TestStrategy {
    /// 레이블을 전략으로 변환합니다 (대소문자 무시). 실패하지 않습니다.
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "" => Self::None,
            "functional" => Self::Functional,
            "performance" => Self::Performance,
            _ => Self::Unknown(label.to_owned()),
        }
    }

    /// 메트릭 레이블용 고정 이름
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Functional => "functional",
            Self::Performance => "performance",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for TestStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(label) => write!(f, "unknown({label})"),
            other => write!(f, "{}", other.metric_label()),
        }
    }
}

/// 테스트 실행 종류 -- 아티팩트 이름 접두어를 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunKind {
    /// 헬스 체크 스모크 테스트
    HealthCheck,
    /// 기능 테스트
    Functional,
    /// 성능 테스트
    Performance,
}

impl RunKind {
    /// 아티팩트 이름 접두어
    pub fn artifact_stem(&self) -> &'static str {
        match self {
            Self::HealthCheck => "HealthCheck",
            Self::Functional => "FuncCheck",
            Self::Performance => "PerfCheck",
        }
    }

    /// 서비스별 아티팩트 이름 (예: `FuncCheck_carts`)
    pub fn artifact_name(&self, service: &str) -> String {
        format!("{}_{service}", self.artifact_stem())
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HealthCheck => write!(f, "health_check"),
            Self::Functional => write!(f, "functional"),
            Self::Performance => write!(f, "performance"),
        }
    }
}

/// 테스트 실행기에 전달되는 파라미터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestParameters {
    /// 실행 종류
    pub kind: RunKind,
    /// 테스트 계획 파일 경로 (.jmx)
    pub plan_path: PathBuf,
    /// 대상 호스트
    pub target_host: String,
    /// 대상 포트
    pub target_port: u16,
    /// 검사 경로 (예: `/health`)
    pub probe_path: String,
    /// 동시 사용자 수
    pub users: u32,
    /// 반복 횟수
    pub loops: u32,
    /// 램프업 시간 (초)
    pub ramp_up_secs: u32,
    /// 요청 간 대기 시간 (밀리초)
    pub think_time_ms: u32,
    /// 아티팩트 이름 접두어 (예: `HealthCheck_carts`)
    pub artifact_prefix: String,
    /// 실행기에 전달되는 실행 이름 (실행 ID 포함)
    pub run_label: String,
    /// 아티팩트가 저장되는 실행 전용 디렉토리
    pub artifact_dir: PathBuf,
    /// 가벼운 스모크 체크 여부 (리포트 상세도에만 영향)
    pub smoke: bool,
    /// 실행 제한 시간. `None`이면 실행기 기본값을 사용합니다.
    pub timeout: Option<Duration>,
}

/// 테스트 단계 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// 통과 여부
    pub passed: bool,
    /// 테스트 시작 시각
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_parses_known_labels_case_insensitive() {
        assert_eq!(
            DeploymentTopology::parse("direct").unwrap(),
            DeploymentTopology::Direct
        );
        assert_eq!(
            DeploymentTopology::parse("Blue_Green_Service").unwrap(),
            DeploymentTopology::BlueGreen
        );
    }

    #[test]
    fn topology_rejects_unknown_label() {
        let err = DeploymentTopology::parse("canary").unwrap_err();
        assert_eq!(err, UnknownDeploymentStrategy("canary".to_owned()));
        assert!(err.to_string().contains("canary"));
    }

    #[test]
    fn topology_rejects_empty_label() {
        assert!(DeploymentTopology::parse("").is_err());
    }

    #[test]
    fn blue_green_targets_are_ordered_blue_then_green() {
        let targets = DeploymentTopology::BlueGreen.rollout_targets("carts");
        assert_eq!(targets, vec!["carts-blue", "carts-green"]);
    }

    #[test]
    fn direct_target_is_service_name() {
        let targets = DeploymentTopology::Direct.rollout_targets("carts");
        assert_eq!(targets, vec!["carts"]);
    }

    #[test]
    fn strategy_from_label() {
        assert_eq!(TestStrategy::from_label(""), TestStrategy::None);
        assert_eq!(
            TestStrategy::from_label("FUNCTIONAL"),
            TestStrategy::Functional
        );
        assert_eq!(
            TestStrategy::from_label("performance"),
            TestStrategy::Performance
        );
        assert_eq!(
            TestStrategy::from_label("load"),
            TestStrategy::Unknown("load".to_owned())
        );
    }

    #[test]
    fn whitespace_label_is_unknown_not_none() {
        assert_eq!(
            TestStrategy::from_label(" "),
            TestStrategy::Unknown(" ".to_owned())
        );
    }

    #[test]
    fn resource_names_accept_k8s_style_values() {
        assert!(check_resource_name("service", "carts").is_ok());
        assert!(check_resource_name("namespace", "sockshop-dev").is_ok());
        assert!(check_resource_name("service", "carts-db.v2").is_ok());
        assert!(check_resource_name("key", "app_domain").is_ok());
        assert!(check_resource_name("githuborg", "Keptn-Sockshop").is_ok());
    }

    #[test]
    fn resource_names_reject_dot_segments() {
        // Given: values that resolve to the current or parent directory
        for value in [".", "..", ".hidden"] {
            // When
            let err = check_resource_name("service", value).unwrap_err();

            // Then
            assert_eq!(err.reason, "must not start with '.'");
            assert_eq!(err.value, value);
        }
    }

    #[test]
    fn resource_names_reject_separators_and_odd_characters() {
        for value in ["", "../carts", "a/b", "a\\b", "a b", "a\nb", "carts;rm", "카트"] {
            assert!(
                check_resource_name("service", value).is_err(),
                "'{value}' should be rejected"
            );
        }
        let err = check_resource_name("service", "--all").unwrap_err();
        assert!(err.to_string().contains("'-'"));
        assert!(check_resource_name("service", &"a".repeat(254)).is_err());
    }

    #[test]
    fn artifact_names() {
        assert_eq!(RunKind::HealthCheck.artifact_name("carts"), "HealthCheck_carts");
        assert_eq!(RunKind::Functional.artifact_name("carts"), "FuncCheck_carts");
        assert_eq!(RunKind::Performance.artifact_name("carts"), "PerfCheck_carts");
    }
}
