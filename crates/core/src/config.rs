//! 설정 관리 -- testgate.toml 파싱 및 런타임 설정
//!
//! [`ServiceConfig`]는 서비스 전체 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`TESTGATE_CLUSTER_KUBECTL=/usr/bin/kubectl` 형식, `RCV_PORT`/`RCV_PATH`)
//! 2. 설정 파일 (`TESTGATE_CONFIG`로 지정한 경우)
//! 3. 기본값 (`Default` 구현)
//!
//! CLI 플래그는 없습니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), testgate_core::error::TestgateError> {
//! use testgate_core::config::ServiceConfig;
//!
//! // 환경에서 로드 (TESTGATE_CONFIG가 있으면 파일 + 환경변수 오버라이드)
//! let config = ServiceConfig::from_env().await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ServiceConfig::parse("[receiver]\nport = 9000")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TestgateError};

/// 설정 파일 경로를 지정하는 환경변수
pub const CONFIG_PATH_ENV: &str = "TESTGATE_CONFIG";
/// 수신 포트 환경변수
pub const RECEIVER_PORT_ENV: &str = "RCV_PORT";
/// 수신 경로 환경변수
pub const RECEIVER_PATH_ENV: &str = "RCV_PATH";

/// testgate 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 이벤트 수신 설정
    #[serde(default)]
    pub receiver: ReceiverConfig,
    /// 이벤트 브로커 설정
    #[serde(default)]
    pub broker: BrokerConfig,
    /// 클러스터 접근 설정
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// 테스트 실행기 설정
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// 테스트 계획 소스 설정
    #[serde(default)]
    pub source: SourceConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl ServiceConfig {
    /// 프로세스 환경에서 설정을 구성합니다.
    ///
    /// `TESTGATE_CONFIG`가 있으면 해당 TOML 파일을 읽고, 없으면 기본값에서 시작합니다.
    /// 이후 환경변수 오버라이드를 적용하고 검증합니다.
    pub async fn from_env() -> Result<Self, TestgateError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(path).await?,
            _ => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TestgateError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TestgateError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TestgateError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TestgateError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TestgateError> {
        toml::from_str(toml_str).map_err(|e| {
            TestgateError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TESTGATE_{SECTION}_{FIELD}`
    /// 수신 포트와 경로는 `RCV_PORT`, `RCV_PATH`도 인식하며 이쪽이 우선합니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TESTGATE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TESTGATE_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.work_dir, "TESTGATE_GENERAL_WORK_DIR");

        // Receiver
        override_string(
            &mut self.receiver.listen_addr,
            "TESTGATE_RECEIVER_LISTEN_ADDR",
        );
        override_u16(&mut self.receiver.port, "TESTGATE_RECEIVER_PORT");
        override_string(&mut self.receiver.path, "TESTGATE_RECEIVER_PATH");
        override_u16(&mut self.receiver.port, RECEIVER_PORT_ENV);
        override_string(&mut self.receiver.path, RECEIVER_PATH_ENV);

        // Broker
        override_string(&mut self.broker.url, "TESTGATE_BROKER_URL");
        override_u64(&mut self.broker.timeout_secs, "TESTGATE_BROKER_TIMEOUT_SECS");
        override_string(&mut self.broker.source, "TESTGATE_BROKER_SOURCE");

        // Cluster
        override_string(&mut self.cluster.kubectl, "TESTGATE_CLUSTER_KUBECTL");
        override_u64(
            &mut self.cluster.readiness_timeout_secs,
            "TESTGATE_CLUSTER_READINESS_TIMEOUT_SECS",
        );
        override_string(
            &mut self.cluster.domain_namespace,
            "TESTGATE_CLUSTER_DOMAIN_NAMESPACE",
        );
        override_string(
            &mut self.cluster.domain_configmap,
            "TESTGATE_CLUSTER_DOMAIN_CONFIGMAP",
        );
        override_string(&mut self.cluster.domain_key, "TESTGATE_CLUSTER_DOMAIN_KEY");

        // Executor
        override_string(&mut self.executor.jmeter, "TESTGATE_EXECUTOR_JMETER");
        override_u64(
            &mut self.executor.timeout_secs,
            "TESTGATE_EXECUTOR_TIMEOUT_SECS",
        );

        // Source
        override_string(&mut self.source.git, "TESTGATE_SOURCE_GIT");
        override_string(&mut self.source.base_url, "TESTGATE_SOURCE_BASE_URL");
        override_string(&mut self.source.revision, "TESTGATE_SOURCE_REVISION");

        // Metrics
        override_bool(&mut self.metrics.enabled, "TESTGATE_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "TESTGATE_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "TESTGATE_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TestgateError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.general.work_dir.is_empty() {
            return Err(invalid("general.work_dir", "must not be empty".to_owned()));
        }

        if self.receiver.port == 0 {
            return Err(invalid("receiver.port", "must be greater than 0".to_owned()));
        }

        if !self.receiver.path.starts_with('/') {
            return Err(invalid("receiver.path", "must start with '/'".to_owned()));
        }

        if !(self.broker.url.starts_with("http://") || self.broker.url.starts_with("https://")) {
            return Err(invalid(
                "broker.url",
                "must be an http(s) URL".to_owned(),
            ));
        }

        if self.broker.timeout_secs == 0 {
            return Err(invalid(
                "broker.timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.cluster.readiness_timeout_secs == 0 {
            return Err(invalid(
                "cluster.readiness_timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.executor.timeout_secs == 0 {
            return Err(invalid(
                "executor.timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.source.revision.is_empty() {
            return Err(invalid("source.revision", "must not be empty".to_owned()));
        }

        if self.metrics.enabled && self.metrics.port == self.receiver.port {
            return Err(invalid(
                "metrics.port",
                "must differ from receiver.port".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> TestgateError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 실행별 작업 디렉토리의 상위 경로
    pub work_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            work_dir: "/tmp/testgate".to_owned(),
        }
    }
}

/// 이벤트 수신 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// 바인드 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 수신 경로
    pub path: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_owned(),
            port: 8080,
            path: "/".to_owned(),
        }
    }
}

/// 이벤트 브로커 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// 발신 이벤트를 POST할 브로커 주소
    pub url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 발신 이벤트의 source 식별자
    pub source: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "http://event-broker.keptn.svc.cluster.local/keptn".to_owned(),
            timeout_secs: 10,
            source: crate::event::SOURCE_JMETER_SERVICE.to_owned(),
        }
    }
}

/// 클러스터 접근 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// kubectl 실행 파일
    pub kubectl: String,
    /// 워크로드 준비 대기 타임아웃 (초)
    pub readiness_timeout_secs: u64,
    /// 게이트웨이 도메인 ConfigMap 네임스페이스
    pub domain_namespace: String,
    /// 게이트웨이 도메인 ConfigMap 이름
    pub domain_configmap: String,
    /// 게이트웨이 도메인 ConfigMap 키
    pub domain_key: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".to_owned(),
            readiness_timeout_secs: 300,
            domain_namespace: "keptn".to_owned(),
            domain_configmap: "keptn-domain".to_owned(),
            domain_key: "app_domain".to_owned(),
        }
    }
}

/// 테스트 실행기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// jmeter 실행 파일
    pub jmeter: String,
    /// 단일 테스트 실행 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            jmeter: "jmeter".to_owned(),
            timeout_secs: 1800,
        }
    }
}

/// 테스트 계획 소스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// git 실행 파일
    pub git: String,
    /// 저장소 기본 URL (`<base_url>/<org>/<service>.git`)
    pub base_url: String,
    /// 체크아웃할 리비전
    pub revision: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            git: "git".to_owned(),
            base_url: "https://github.com".to_owned(),
            revision: "master".to_owned(),
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
