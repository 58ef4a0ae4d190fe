//! 전략 디스패처
//!
//! 테스트 전략 레이블을 실행할 테스트와 파라미터로 변환합니다.
//! 빈 레이블과 인식하지 못한 레이블은 에러가 아니라 "테스트 없음" 상태입니다.

use std::path::Path;
use std::sync::Arc;

use testgate_core::types::{RunKind, TestParameters, TestStrategy};
use testgate_integrations::{ConfigKey, ConfigLookup};

use crate::context::TestRunContext;
use crate::error::RunError;
use crate::health::{PROBE_PATH, TARGET_PORT, THINK_TIME_MS};

/// 성능 테스트 동시 사용자 수
pub const PERFORMANCE_USERS: u32 = 10;
/// 성능 테스트 반복 횟수
pub const PERFORMANCE_LOOPS: u32 = 500;

/// 디스패치 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagePlan {
    /// 빈 레이블: 테스트 없이 종료
    NoTest,
    /// 인식하지 못한 레이블: 테스트 없이 종료
    UnknownStrategy(String),
    /// 전략 테스트 실행
    Run {
        /// 선택된 전략
        strategy: TestStrategy,
        /// 실행 파라미터
        params: Box<TestParameters>,
    },
}

/// 전략 디스패처
pub struct StrategyDispatcher<L: ConfigLookup> {
    lookup: Arc<L>,
    gateway_domain: ConfigKey,
}

impl<L: ConfigLookup> StrategyDispatcher<L> {
    /// 새 디스패처를 생성합니다.
    pub fn new(lookup: Arc<L>, gateway_domain: ConfigKey) -> Self {
        Self {
            lookup,
            gateway_domain,
        }
    }

    /// 컨텍스트의 전략 레이블로 다음 단계를 결정합니다.
    ///
    /// 성능 테스트는 게이트웨이 도메인을 조회하며, 조회 실패는 `RunError::ConfigLookup`입니다.
    pub async fn plan(&self, ctx: &TestRunContext, checkout: &Path) -> Result<StagePlan, RunError> {
        let strategy = TestStrategy::from_label(&ctx.notification.data.teststrategy);
        let params = match &strategy {
            TestStrategy::None => return Ok(StagePlan::NoTest),
            TestStrategy::Unknown(label) => return Ok(StagePlan::UnknownStrategy(label.clone())),
            TestStrategy::Functional => functional_parameters(ctx, checkout),
            TestStrategy::Performance => {
                let key = &self.gateway_domain;
                let domain = self.lookup.lookup(&key.namespace, &key.name, &key.key).await?;
                performance_parameters(ctx, checkout, &domain)
            }
        };

        Ok(StagePlan::Run {
            strategy,
            params: Box::new(params),
        })
    }
}

fn load_plan(ctx: &TestRunContext, checkout: &Path) -> std::path::PathBuf {
    checkout
        .join("jmeter")
        .join(format!("{}_load.jmx", ctx.service()))
}

fn stage_parameters(
    ctx: &TestRunContext,
    kind: RunKind,
    checkout: &Path,
    target_host: String,
) -> TestParameters {
    let prefix = kind.artifact_name(ctx.service());
    TestParameters {
        kind,
        plan_path: load_plan(ctx, checkout),
        target_host,
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
        timeout: None,
    }
}

/// 기능 테스트 파라미터: 클러스터 내부 호스트, 사용자 1명, 반복 1회
pub fn functional_parameters(ctx: &TestRunContext, checkout: &Path) -> TestParameters {
    stage_parameters(
        ctx,
        RunKind::Functional,
        checkout,
        ctx.notification.data.cluster_host(),
    )
}

/// 성능 테스트 파라미터: 게이트웨이 호스트, 사용자 10명, 반복 500회, 전체 리포트
pub fn performance_parameters(
    ctx: &TestRunContext,
    checkout: &Path,
    gateway_domain: &str,
) -> TestParameters {
    let host = format!("{}.{gateway_domain}", ctx.notification.data.cluster_host());
    TestParameters {
        users: PERFORMANCE_USERS,
        loops: PERFORMANCE_LOOPS,
        smoke: false,
        ..stage_parameters(ctx, RunKind::Performance, checkout, host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use testgate_core::event::{DeploymentFinishedData, DeploymentNotification};

    fn context(teststrategy: &str) -> TestRunContext {
        let notification = DeploymentNotification {
            event_id: "evt".to_owned(),
            correlation_id: "ctx".to_owned(),
            data: DeploymentFinishedData {
                project: "sockshop".to_owned(),
                stage: "staging".to_owned(),
                service: "carts".to_owned(),
                teststrategy: teststrategy.to_owned(),
                ..DeploymentFinishedData::default()
            },
            original: Map::new(),
        };
        TestRunContext::new(notification, Path::new("/work"))
    }

    #[test]
    fn functional_parameters_target_cluster_host() {
        let ctx = context("functional");
        let params = functional_parameters(&ctx, Path::new("/work/r/carts"));

        assert_eq!(params.kind, RunKind::Functional);
        assert_eq!(params.target_host, "carts.sockshop-staging");
        assert_eq!(params.plan_path, Path::new("/work/r/carts/jmeter/carts_load.jmx"));
        assert_eq!((params.users, params.loops), (1, 1));
        assert_eq!(params.artifact_prefix, "FuncCheck_carts");
        assert!(params.smoke);
        assert_eq!(params.timeout, None);
    }

    #[test]
    fn performance_parameters_target_gateway() {
        let ctx = context("performance");
        let params = performance_parameters(&ctx, Path::new("/work/r/carts"), "10.0.0.1.xip.io");

        assert_eq!(params.kind, RunKind::Performance);
        assert_eq!(params.target_host, "carts.sockshop-staging.10.0.0.1.xip.io");
        assert_eq!(params.target_port, 80);
        assert_eq!((params.users, params.loops), (10, 500));
        assert_eq!(params.think_time_ms, 250);
        assert_eq!(params.artifact_prefix, "PerfCheck_carts");
        assert!(params.run_label.starts_with("PerfCheck_carts_"));
        assert!(!params.smoke);
        assert_eq!(params.timeout, None);
    }
}
