//! 헬스 게이트
//!
//! 전략 테스트에 앞서 반드시 통과해야 하는 단계입니다.
//!
//! 1. 토폴로지에 따라 워크로드 하나(`direct`) 또는 둘(`blue_green_service`)의 준비를 기다림
//!    (blue가 준비된 경우에만 green을 기다림)
//! 2. 스모크 테스트 1회 실행 (`/health`, 사용자 1명, 반복 1회, 짧은 제한 시간)

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use testgate_core::metrics as m;
use testgate_core::types::{DeploymentTopology, RunKind, TestParameters};
use testgate_integrations::{ReadinessProber, TestExecutor};
use tracing::info;

use crate::context::TestRunContext;
use crate::error::RunError;
use crate::runner::TestRunner;

/// 대상 서비스 포트
pub const TARGET_PORT: u16 = 80;
/// 검사 경로
pub const PROBE_PATH: &str = "/health";
/// 요청 간 대기 시간 (밀리초)
pub const THINK_TIME_MS: u32 = 250;

/// 스모크 테스트 제한 시간 (전략 테스트의 실행기 기본값과 별개)
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(120);

/// 스모크 테스트 계획 파일 (체크아웃 기준 상대 경로)
const HEALTH_CHECK_PLAN: &str = "jmeter/basiccheck.jmx";

/// 헬스 게이트
pub struct HealthGate<P: ReadinessProber, E: TestExecutor> {
    prober: Arc<P>,
    runner: TestRunner<E>,
}

impl<P: ReadinessProber, E: TestExecutor> HealthGate<P, E> {
    /// 새 헬스 게이트를 생성합니다.
    pub fn new(prober: Arc<P>, runner: TestRunner<E>) -> Self {
        Self { prober, runner }
    }

    /// 헬스 게이트를 실행하고 통과 여부를 반환합니다.
    ///
    /// 준비 대기나 실행기 실패는 판정 없이 `RunError`로 반환됩니다.
    pub async fn check(
        &self,
        ctx: &TestRunContext,
        topology: DeploymentTopology,
        checkout: &Path,
    ) -> Result<bool, RunError> {
        let namespace = ctx.namespace();
        for workload in topology.rollout_targets(ctx.service()) {
            info!(workload = workload.as_str(), namespace = namespace.as_str(), %topology, "waiting for workload");
            self.prober.wait_until_ready(&workload, &namespace).await?;
        }

        let params = health_check_parameters(ctx, checkout);
        let outcome = self.runner.run(&params).await?;

        let result = if outcome.passed { "passed" } else { "failed" };
        metrics::counter!(m::HEALTH_CHECKS_TOTAL, m::LABEL_RESULT => result).increment(1);
        info!(passed = outcome.passed, "health check finished");

        Ok(outcome.passed)
    }
}

/// 헬스 체크 스모크 테스트 파라미터
pub fn health_check_parameters(ctx: &TestRunContext, checkout: &Path) -> TestParameters {
    let prefix = RunKind::HealthCheck.artifact_name(ctx.service());
    TestParameters {
        kind: RunKind::HealthCheck,
        plan_path: checkout.join(HEALTH_CHECK_PLAN),
        target_host: ctx.notification.data.cluster_host(),
        target_port: TARGET_PORT,
        probe_path: PROBE_PATH.to_owned(),
        users: 1,
        loops: 1,
        ramp_up_secs: 0,
        think_time_ms: THINK_TIME_MS,
        run_label: format!("{prefix}_{}", ctx.run_id),
        artifact_prefix: prefix,
        artifact_dir: ctx.run_dir.clone(),
        smoke: true,
        timeout: Some(HEALTH_CHECK_TIMEOUT),
    }
}
