//! 테스트 실행 어댑터
//!
//! 실행기 호출 직전에 시작 시각을 기록하고 결과를 [`TestOutcome`]으로 정규화합니다.
//! 통과/실패 판정은 실행기가 내립니다.

use std::sync::Arc;

use chrono::Utc;
use testgate_core::types::{TestOutcome, TestParameters};
use testgate_integrations::{ArtifactPaths, TestExecutor};
use tracing::debug;

use crate::error::RunError;

/// 실행기 어댑터
pub struct TestRunner<E: TestExecutor> {
    executor: Arc<E>,
}

impl<E: TestExecutor> TestRunner<E> {
    /// 새 어댑터를 생성합니다.
    pub fn new(executor: Arc<E>) -> Self {
        Self { executor }
    }

    /// 이전 아티팩트를 정리한 뒤 테스트를 실행합니다.
    pub async fn run(&self, params: &TestParameters) -> Result<TestOutcome, RunError> {
        ArtifactPaths::new(&params.artifact_dir, &params.artifact_prefix)
            .clear()
            .await?;

        let started_at = Utc::now();
        debug!(kind = %params.kind, plan = %params.plan_path.display(), "invoking test executor");
        let passed = self.executor.execute(params).await?;

        Ok(TestOutcome { passed, started_at })
    }
}

impl<E: TestExecutor> Clone for TestRunner<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
        }
    }
}
