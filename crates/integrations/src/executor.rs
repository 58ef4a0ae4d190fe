//! 테스트 실행기
//!
//! [`TestExecutor`]는 테스트 계획 하나를 실행하고 통과 여부만 반환합니다.
//! 통과/실패 판정 이외의 정책(재시도, 알림)은 호출자의 몫입니다.
//!
//! [`JMeterExecutor`] 판정 규칙:
//! - 프로세스가 성공으로 종료하고
//! - 마지막 `summary =` 줄의 `Err:` 값이 0이면 통과
//! - 요약 줄이 없으면 실패
//!
//! 실행 파일을 시작할 수 없거나 제한 시간을 넘기면 판정 없이 에러를 반환합니다.

use std::future::Future;
use std::time::{Duration, Instant};

use testgate_core::config::ExecutorConfig;
use testgate_core::types::TestParameters;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactPaths;
use crate::error::IntegrationError;
use crate::process::run_with_timeout;
use crate::summary::SummaryParser;

/// 테스트 실행기 trait
pub trait TestExecutor: Send + Sync + 'static {
    /// 테스트를 실행하고 통과 여부를 반환합니다.
    ///
    /// # Errors
    ///
    /// `IntegrationError::Execution`: 실행기를 시작할 수 없거나 제한 시간을 초과함
    fn execute(
        &self,
        params: &TestParameters,
    ) -> impl Future<Output = Result<bool, IntegrationError>> + Send;
}

/// non-GUI 모드 JMeter 실행기
pub struct JMeterExecutor {
    jmeter: String,
    timeout: Duration,
    summary: SummaryParser,
}

impl JMeterExecutor {
    /// 새 실행기를 생성합니다.
    pub fn new(jmeter: impl Into<String>, timeout: Duration) -> Result<Self, IntegrationError> {
        Ok(Self {
            jmeter: jmeter.into(),
            timeout,
            summary: SummaryParser::new()?,
        })
    }

    /// 실행기 설정에서 생성합니다.
    pub fn from_config(config: &ExecutorConfig) -> Result<Self, IntegrationError> {
        Self::new(
            config.jmeter.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn command(&self, params: &TestParameters, paths: &ArtifactPaths) -> Command {
        let mut cmd = Command::new(&self.jmeter);
        cmd.arg("-n")
            .arg("-t")
            .arg(&params.plan_path)
            .arg("-l")
            .arg(&paths.result_file)
            .arg("-j")
            .arg(&paths.log_file);

        if !params.smoke {
            cmd.arg("-e").arg("-o").arg(&paths.report_dir);
        }

        cmd.arg("-JPROTOCOL=http")
            .arg(format!("-JSERVER_URL={}", params.target_host))
            .arg(format!("-JSERVER_PORT={}", params.target_port))
            .arg(format!("-JCHECK_PATH={}", params.probe_path))
            .arg(format!("-JVUCount={}", params.users))
            .arg(format!("-JLoopCount={}", params.loops))
            .arg(format!("-JThinkTime={}", params.think_time_ms))
            .arg(format!("-JRampUp={}", params.ramp_up_secs))
            .arg(format!("-JLTN={}", params.run_label))
            .current_dir(&params.artifact_dir);
        cmd
    }
}

impl TestExecutor for JMeterExecutor {
    async fn execute(&self, params: &TestParameters) -> Result<bool, IntegrationError> {
        if !tokio::fs::try_exists(&params.plan_path).await.unwrap_or(false) {
            return Err(IntegrationError::Execution(format!(
                "test plan not found: {}",
                params.plan_path.display()
            )));
        }

        tokio::fs::create_dir_all(&params.artifact_dir)
            .await
            .map_err(|e| {
                IntegrationError::Execution(format!(
                    "create artifact dir {}: {e}",
                    params.artifact_dir.display()
                ))
            })?;

        let paths = ArtifactPaths::new(&params.artifact_dir, &params.artifact_prefix);
        let started = Instant::now();
        let limit = params.timeout.unwrap_or(self.timeout);
        let output = run_with_timeout(self.command(params, &paths), limit)
            .await
            .map_err(|e| IntegrationError::Execution(format!("{}: {e}", self.jmeter)))?;

        if let Err(e) = tokio::fs::write(&paths.output_file, &output.stdout).await {
            warn!(
                path = %paths.output_file.display(),
                error = %e,
                "failed to persist executor output"
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let summary = self.summary.final_summary(&stdout);
        let passed = output.status.success() && summary.is_some_and(|s| s.is_clean());

        match summary {
            Some(s) => info!(
                kind = %params.kind,
                label = params.run_label.as_str(),
                samples = s.samples,
                errors = s.errors,
                exit_ok = output.status.success(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                passed,
                "test execution finished"
            ),
            None => warn!(
                kind = %params.kind,
                label = params.run_label.as_str(),
                exit_ok = output.status.success(),
                "executor produced no summary, treating as failed"
            ),
        }
        debug!(stderr = %String::from_utf8_lossy(&output.stderr), "executor stderr");

        Ok(passed)
    }
}
