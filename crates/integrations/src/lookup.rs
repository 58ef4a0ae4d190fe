//! 배포 시점 설정 조회 (게이트웨이 도메인 등)

use std::future::Future;
use std::time::Duration;

use testgate_core::config::ClusterConfig;
use tokio::process::Command;
use tracing::debug;

use crate::error::IntegrationError;
use crate::process::{last_diagnostic_line, run_with_timeout, validate_name};

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

/// 클러스터 ConfigMap 값 조회 trait
pub trait ConfigLookup: Send + Sync + 'static {
    /// `namespace/name`의 `key` 값을 조회합니다. 빈 값은 에러입니다.
    fn lookup(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> impl Future<Output = Result<String, IntegrationError>> + Send;
}

/// 조회할 ConfigMap 위치
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigKey {
    /// 네임스페이스
    pub namespace: String,
    /// ConfigMap 이름
    pub name: String,
    /// 데이터 키
    pub key: String,
}

impl ConfigKey {
    /// 게이트웨이 도메인 위치 (`[cluster] domain_*`)
    pub fn gateway_domain(config: &ClusterConfig) -> Self {
        Self {
            namespace: config.domain_namespace.clone(),
            name: config.domain_configmap.clone(),
            key: config.domain_key.clone(),
        }
    }
}

/// `kubectl get configmap -o jsonpath` 기반 조회
pub struct KubectlConfigLookup {
    kubectl: String,
}

impl KubectlConfigLookup {
    /// 새 조회기를 생성합니다.
    pub fn new(kubectl: impl Into<String>) -> Self {
        Self {
            kubectl: kubectl.into(),
        }
    }

    fn command(&self, namespace: &str, name: &str, key: &str) -> Command {
        let mut cmd = Command::new(&self.kubectl);
        cmd.args(["get", "configmap", name, "-n", namespace, "-o"])
            .arg(format!("jsonpath={{.data.{key}}}"));
        cmd
    }
}

impl ConfigLookup for KubectlConfigLookup {
    async fn lookup(&self, namespace: &str, name: &str, key: &str) -> Result<String, IntegrationError> {
        validate_name("namespace", namespace)?;
        validate_name("configmap", name)?;
        validate_name("key", key)?;

        let failed = |reason: String| IntegrationError::ConfigLookup {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            key: key.to_owned(),
            reason,
        };

        let output = run_with_timeout(self.command(namespace, name, key), LOOKUP_TIMEOUT)
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !output.status.success() {
            return Err(failed(last_diagnostic_line(&output)));
        }

        let value = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if value.is_empty() {
            return Err(failed("empty value".to_owned()));
        }

        debug!(namespace, name, key, value = value.as_str(), "config value resolved");
        Ok(value)
    }
}
