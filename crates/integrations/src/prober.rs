//! 워크로드 준비 상태 확인
//!
//! [`ReadinessProber`]는 배포된 워크로드가 트래픽을 받을 준비가 될 때까지 기다립니다.
//! 프로덕션 구현 [`KubectlReadinessProber`]는 `kubectl rollout status`를 사용합니다.

use std::future::Future;
use std::time::Duration;

use testgate_core::config::ClusterConfig;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::IntegrationError;
use crate::process::{CommandFailure, last_diagnostic_line, run_with_timeout, validate_name};

/// kubectl 자체 타임아웃 이후 프로세스를 강제 종료하기까지의 여유 시간
const KILL_GRACE: Duration = Duration::from_secs(15);

/// 워크로드 준비 상태 확인 trait
///
/// # Errors
///
/// - `IntegrationError::ReadinessTimeout`: 제한 시간 내에 준비되지 않음
/// - `IntegrationError::ReadinessProbe`: 조회 자체가 실패함 (권한, 존재하지 않는 워크로드 등)
pub trait ReadinessProber: Send + Sync + 'static {
    /// 워크로드가 준비될 때까지 기다립니다.
    fn wait_until_ready(
        &self,
        workload: &str,
        namespace: &str,
    ) -> impl Future<Output = Result<(), IntegrationError>> + Send;
}

/// `kubectl rollout status` 기반 준비 상태 확인
pub struct KubectlReadinessProber {
    kubectl: String,
    timeout: Duration,
}

impl KubectlReadinessProber {
    /// 새 prober를 생성합니다.
    pub fn new(kubectl: impl Into<String>, timeout: Duration) -> Self {
        Self {
            kubectl: kubectl.into(),
            timeout,
        }
    }

    /// 클러스터 설정에서 prober를 생성합니다.
    pub fn from_config(config: &ClusterConfig) -> Self {
        Self::new(
            config.kubectl.clone(),
            Duration::from_secs(config.readiness_timeout_secs),
        )
    }

    fn command(&self, workload: &str, namespace: &str) -> Command {
        let mut cmd = Command::new(&self.kubectl);
        cmd.arg("rollout")
            .arg("status")
            .arg(format!("deployment/{workload}"))
            .arg("-n")
            .arg(namespace)
            .arg(format!("--timeout={}s", self.timeout.as_secs()));
        cmd
    }
}

impl ReadinessProber for KubectlReadinessProber {
    async fn wait_until_ready(&self, workload: &str, namespace: &str) -> Result<(), IntegrationError> {
        validate_name("workload", workload)?;
        validate_name("namespace", namespace)?;

        debug!(workload, namespace, "waiting for rollout");
        let cmd = self.command(workload, namespace);

        match run_with_timeout(cmd, self.timeout + KILL_GRACE).await {
            Ok(output) if output.status.success() => {
                info!(workload, namespace, "workload is ready");
                Ok(())
            }
            Ok(output) => {
                let reason = last_diagnostic_line(&output);
                if is_timeout_message(&reason) {
                    Err(IntegrationError::ReadinessTimeout {
                        workload: workload.to_owned(),
                        namespace: namespace.to_owned(),
                        reason,
                    })
                } else {
                    Err(IntegrationError::ReadinessProbe {
                        workload: workload.to_owned(),
                        reason,
                    })
                }
            }
            Err(failure @ CommandFailure::TimedOut(_)) => Err(IntegrationError::ReadinessTimeout {
                workload: workload.to_owned(),
                namespace: namespace.to_owned(),
                reason: failure.to_string(),
            }),
            Err(failure @ CommandFailure::Spawn(_)) => Err(IntegrationError::ReadinessProbe {
                workload: workload.to_owned(),
                reason: format!("{}: {failure}", self.kubectl),
            }),
        }
    }
}

fn is_timeout_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("timed out") || lower.contains("deadline exceeded")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::describe;

    #[test]
    fn command_uses_rollout_status_with_timeout() {
        let prober = KubectlReadinessProber::new("kubectl", Duration::from_secs(120));
        let cmd = prober.command("carts", "sockshop-dev");
        assert_eq!(
            describe(&cmd),
            "kubectl rollout status deployment/carts -n sockshop-dev --timeout=120s"
        );
    }

    #[test]
    fn from_config_uses_cluster_settings() {
        let config = ClusterConfig {
            kubectl: "/usr/local/bin/kubectl".to_owned(),
            readiness_timeout_secs: 42,
            ..ClusterConfig::default()
        };
        let prober = KubectlReadinessProber::from_config(&config);
        assert_eq!(prober.kubectl, "/usr/local/bin/kubectl");
        assert_eq!(prober.timeout, Duration::from_secs(42));
    }

    #[test]
    fn timeout_messages_are_recognized() {
        assert!(is_timeout_message(
            "error: timed out waiting for the condition"
        ));
        assert!(is_timeout_message("Deadline Exceeded"));
        assert!(!is_timeout_message(
            "Error from server (NotFound): deployments.apps \"carts\" not found"
        ));
    }

    #[tokio::test]
    async fn invalid_workload_name_is_rejected_before_spawn() {
        let prober = KubectlReadinessProber::new("/nonexistent/kubectl", Duration::from_secs(1));
        let err = prober
            .wait_until_ready("-carts", "sockshop-dev")
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn missing_kubectl_is_probe_failure() {
        let prober = KubectlReadinessProber::new("/nonexistent/kubectl", Duration::from_secs(1));
        let err = prober
            .wait_until_ready("carts", "sockshop-dev")
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrationError::ReadinessProbe { .. }));
    }
}
