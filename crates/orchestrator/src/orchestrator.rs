//! 테스트 오케스트레이터 -- 수신 검증부터 결과 발행까지의 전체 흐름 관리
//!
//! [`TestOrchestrator`]는 수락한 알림마다 백그라운드 태스크를 하나 띄우고
//! [`RunHandle`]을 즉시 반환합니다. 실행 내부 단계는 엄격히 순서대로 진행되며,
//! 실행끼리는 순서 보장이 없습니다.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;
use testgate_core::config::ServiceConfig;
use testgate_core::error::{ConfigError, IngressError, TestgateError};
use testgate_core::event::{CloudEvent, NotificationKind, SOURCE_JMETER_SERVICE};
use testgate_core::metrics as m;
use testgate_core::types::{DeploymentTopology, check_resource_name};
use testgate_integrations::{
    ConfigKey, ConfigLookup, EventBus, GitSourceFetcher, HttpEventBus, JMeterExecutor,
    KubectlConfigLookup, KubectlReadinessProber, ReadinessProber, SourceFetcher, TestExecutor,
};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, error, info, warn};

use crate::context::TestRunContext;
use crate::dispatch::{StagePlan, StrategyDispatcher};
use crate::emitter::OutcomeEmitter;
use crate::error::{PublishError, RunError};
use crate::health::HealthGate;
use crate::ingress;
use crate::run::{RunHandle, RunReport, RunTermination};
use crate::runner::TestRunner;

/// 프로덕션 협력자로 구성된 오케스트레이터
pub type ProductionOrchestrator = TestOrchestrator<
    KubectlReadinessProber,
    KubectlConfigLookup,
    GitSourceFetcher,
    JMeterExecutor,
    HttpEventBus,
>;

/// 실행 카운터 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// 수락된 알림 수
    pub accepted: u64,
    /// 거부된 알림 수
    pub rejected: u64,
    /// 종료된 실행 수
    pub completed: u64,
    /// 진행 중인 실행 수
    pub in_flight: u64,
}

#[derive(Default)]
struct RunCounters {
    accepted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    in_flight: AtomicU64,
}

/// 테스트 오케스트레이터
///
/// # 사용 예시
/// ```ignore
/// let orchestrator = ProductionOrchestrator::from_config(&config)?;
///
/// let handle = orchestrator.accept(&event)?;   // 400 on Err
/// handle.detach();                             // 202
/// ```
pub struct TestOrchestrator<P, L, S, E, B>
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    pipeline: Arc<RunPipeline<P, L, S, E, B>>,
    work_dir: PathBuf,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    counters: Arc<RunCounters>,
}

impl<P, L, S, E, B> TestOrchestrator<P, L, S, E, B>
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    /// 수신 이벤트를 검증하고 실행을 시작합니다.
    ///
    /// 실행 완료를 기다리지 않습니다. 검증 실패 시 실행은 시작되지 않습니다.
    pub fn accept(&self, event: &CloudEvent) -> Result<RunHandle, IngressError> {
        let notification = match ingress::validate(event) {
            Ok(notification) => notification,
            Err(e) => {
                self.note_rejected(&e);
                return Err(e);
            }
        };

        let ctx = TestRunContext::new(notification, &self.work_dir);
        self.counters.accepted.fetch_add(1, Ordering::Relaxed);
        self.counters.in_flight.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::EVENTS_ACCEPTED_TOTAL).increment(1);
        metrics::gauge!(m::RUNS_IN_FLIGHT).increment(1.0);

        let run_id = ctx.run_id.clone();
        let correlation_id = ctx.correlation_id.clone();
        let span = ctx.span.clone();
        let cancel = self.shutdown.child_token();
        let run_cancel = cancel.clone();
        let pipeline = Arc::clone(&self.pipeline);
        let counters = Arc::clone(&self.counters);

        span.in_scope(|| info!(event_id = event.id.as_str(), "deployment-finished accepted"));

        let task = self.tracker.spawn(
            async move {
                let outcome = tokio::select! {
                    biased;
                    () = run_cancel.cancelled() => RunOutcome::silent(RunTermination::Aborted(RunError::Cancelled)),
                    outcome = pipeline.execute(&ctx) => outcome,
                };

                log_termination(&outcome);
                counters.in_flight.fetch_sub(1, Ordering::Relaxed);
                counters.completed.fetch_add(1, Ordering::Relaxed);
                metrics::gauge!(m::RUNS_IN_FLIGHT).decrement(1.0);
                metrics::counter!(
                    m::RUNS_COMPLETED_TOTAL,
                    m::LABEL_TERMINATION => outcome.termination.label()
                )
                .increment(1);

                RunReport {
                    run_id: ctx.run_id,
                    correlation_id: ctx.correlation_id,
                    termination: outcome.termination,
                    notification: outcome.notification,
                    publish_error: outcome.publish_error,
                }
            }
            .instrument(span),
        );

        Ok(RunHandle::new(run_id, correlation_id, cancel, task))
    }

    /// 실행 전에 거부된 이벤트를 기록합니다 (엔벨로프 디코딩 실패 등).
    pub fn note_rejected(&self, err: &IngressError) {
        self.counters.rejected.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::EVENTS_REJECTED_TOTAL, m::LABEL_REASON => ingress::reject_reason(err))
            .increment(1);
        warn!(error = %err, "inbound event rejected");
    }

    /// 현재 카운터 스냅샷
    pub fn stats(&self) -> RunStats {
        RunStats {
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            in_flight: self.counters.in_flight.load(Ordering::Relaxed),
        }
    }

    /// 진행 중인 모든 실행을 취소합니다. 이후 수락되는 실행도 즉시 취소됩니다.
    pub fn shutdown(&self) {
        info!(in_flight = self.stats().in_flight, "cancelling in-flight runs");
        self.shutdown.cancel();
        self.tracker.close();
    }

    /// 모든 실행 태스크가 끝날 때까지 기다립니다. [`shutdown`](Self::shutdown) 이후에 의미가 있습니다.
    pub async fn drained(&self) {
        self.tracker.wait().await;
    }
}

impl ProductionOrchestrator {
    /// 설정으로 프로덕션 협력자를 구성해 오케스트레이터를 만듭니다.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, TestgateError> {
        TestOrchestratorBuilder::new()
            .config(config)
            .prober(Arc::new(KubectlReadinessProber::from_config(&config.cluster)))
            .config_lookup(Arc::new(KubectlConfigLookup::new(config.cluster.kubectl.clone())))
            .source_fetcher(Arc::new(GitSourceFetcher::from_config(&config.source)))
            .executor(Arc::new(JMeterExecutor::from_config(&config.executor)?))
            .event_bus(Arc::new(HttpEventBus::from_config(&config.broker)?))
            .build()
    }
}

fn log_termination(outcome: &RunOutcome) {
    let label = outcome.termination.label();
    match &outcome.termination {
        RunTermination::Aborted(RunError::Cancelled) => {
            warn!(termination = label, "run cancelled, no notification published")
        }
        RunTermination::Aborted(e) => error!(
            termination = label,
            error = %e,
            error_kind = e.kind(),
            "run aborted, no notification published"
        ),
        RunTermination::UnknownStrategy(_) | RunTermination::NoTest => {
            info!(termination = label, "run finished without strategy test")
        }
        RunTermination::HealthCheckFailed | RunTermination::Verdict { .. } => {
            info!(termination = label, "run finished with verdict")
        }
    }
    if let Some(e) = &outcome.publish_error {
        error!(error = %e, "verdict reached but notification was not delivered");
    }
}

/// 실행 한 번의 결과 (보고서 생성 전)
struct RunOutcome {
    termination: RunTermination,
    notification: Option<NotificationKind>,
    publish_error: Option<PublishError>,
}

impl RunOutcome {
    fn silent(termination: RunTermination) -> Self {
        Self {
            termination,
            notification: None,
            publish_error: None,
        }
    }

    fn notified(
        termination: RunTermination,
        kind: NotificationKind,
        published: Result<(), PublishError>,
    ) -> Self {
        Self {
            termination,
            notification: Some(kind),
            publish_error: published.err(),
        }
    }
}

/// 실행 단계 구성 요소 (모든 실행이 공유)
struct RunPipeline<P, L, S, E, B>
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    source: Arc<S>,
    health: HealthGate<P, E>,
    dispatcher: StrategyDispatcher<L>,
    runner: TestRunner<E>,
    emitter: OutcomeEmitter<B>,
}

impl<P, L, S, E, B> RunPipeline<P, L, S, E, B>
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    async fn execute(&self, ctx: &TestRunContext) -> RunOutcome {
        match self.drive(ctx).await {
            Ok(outcome) => outcome,
            Err(e) => RunOutcome::silent(RunTermination::Aborted(e)),
        }
    }

    async fn drive(&self, ctx: &TestRunContext) -> Result<RunOutcome, RunError> {
        let data = &ctx.notification.data;
        info!(summary = data.summary().as_str(), "run started");

        // 이 이름들은 실행 디렉토리, 아티팩트 이름, 네임스페이스로 이어집니다.
        for (field, value) in [
            ("githuborg", &data.githuborg),
            ("project", &data.project),
            ("stage", &data.stage),
            ("service", &data.service),
        ] {
            check_resource_name(field, value)?;
        }

        let topology = DeploymentTopology::parse(&data.deploymentstrategy)?;
        let checkout = self
            .source
            .fetch(&data.githuborg, &data.service, &ctx.run_dir)
            .await?;

        let original = &ctx.notification.original;
        if !self.health.check(ctx, topology, &checkout).await? {
            warn!("health check failed, skipping strategy test");
            let published = self.emitter.emit_failure(&ctx.correlation_id, original).await;
            return Ok(RunOutcome::notified(
                RunTermination::HealthCheckFailed,
                NotificationKind::EvaluationDone,
                published,
            ));
        }

        let (strategy, params) = match self.dispatcher.plan(ctx, &checkout).await? {
            StagePlan::NoTest => {
                info!("no test strategy set");
                return Ok(RunOutcome::silent(RunTermination::NoTest));
            }
            StagePlan::UnknownStrategy(label) => {
                error!(teststrategy = label.as_str(), "unknown test strategy, no test executed");
                return Ok(RunOutcome::silent(RunTermination::UnknownStrategy(label)));
            }
            StagePlan::Run { strategy, params } => (strategy, params),
        };

        info!(%strategy, target = params.target_host.as_str(), "starting strategy test");
        let timer = Instant::now();
        let outcome = self.runner.run(&params).await;
        let result = match &outcome {
            Ok(o) if o.passed => "passed",
            Ok(_) => "failed",
            Err(_) => "error",
        };
        metrics::counter!(
            m::TESTS_EXECUTED_TOTAL,
            m::LABEL_STRATEGY => strategy.metric_label(),
            m::LABEL_RESULT => result
        )
        .increment(1);
        metrics::histogram!(m::TEST_DURATION_SECONDS, m::LABEL_STRATEGY => strategy.metric_label())
            .record(timer.elapsed().as_secs_f64());

        let outcome = outcome?;
        info!(%strategy, passed = outcome.passed, started_at = %outcome.started_at, "strategy test finished");

        if outcome.passed {
            let published = self
                .emitter
                .emit_success(&ctx.correlation_id, original, outcome.started_at)
                .await;
            Ok(RunOutcome::notified(
                RunTermination::Verdict { passed: true },
                NotificationKind::TestsFinished,
                published,
            ))
        } else {
            let published = self.emitter.emit_failure(&ctx.correlation_id, original).await;
            Ok(RunOutcome::notified(
                RunTermination::Verdict { passed: false },
                NotificationKind::EvaluationDone,
                published,
            ))
        }
    }
}

/// 오케스트레이터 빌더
///
/// 협력자 다섯 개는 모두 필수입니다.
pub struct TestOrchestratorBuilder<P, L, S, E, B>
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    work_dir: PathBuf,
    source_name: String,
    gateway_domain: ConfigKey,
    prober: Option<Arc<P>>,
    lookup: Option<Arc<L>>,
    source: Option<Arc<S>>,
    executor: Option<Arc<E>>,
    bus: Option<Arc<B>>,
}

impl<P, L, S, E, B> TestOrchestratorBuilder<P, L, S, E, B>
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    /// 기본 설정으로 새 빌더를 생성합니다.
    pub fn new() -> Self {
        let defaults = ServiceConfig::default();
        Self {
            work_dir: PathBuf::from(&defaults.general.work_dir),
            source_name: SOURCE_JMETER_SERVICE.to_owned(),
            gateway_domain: ConfigKey::gateway_domain(&defaults.cluster),
            prober: None,
            lookup: None,
            source: None,
            executor: None,
            bus: None,
        }
    }

    /// 서비스 설정에서 작업 디렉토리, source 이름, 게이트웨이 도메인 위치를 가져옵니다.
    pub fn config(mut self, config: &ServiceConfig) -> Self {
        self.work_dir = PathBuf::from(&config.general.work_dir);
        self.source_name = config.broker.source.clone();
        self.gateway_domain = ConfigKey::gateway_domain(&config.cluster);
        self
    }

    /// 실행별 디렉토리의 상위 경로를 지정합니다.
    pub fn work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// 준비 상태 확인기를 설정합니다.
    pub fn prober(mut self, prober: Arc<P>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// 설정 조회기를 설정합니다.
    pub fn config_lookup(mut self, lookup: Arc<L>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// 소스 체크아웃 구현을 설정합니다.
    pub fn source_fetcher(mut self, source: Arc<S>) -> Self {
        self.source = Some(source);
        self
    }

    /// 테스트 실행기를 설정합니다.
    pub fn executor(mut self, executor: Arc<E>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// 이벤트 버스를 설정합니다.
    pub fn event_bus(mut self, bus: Arc<B>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// 오케스트레이터를 빌드합니다.
    pub fn build(self) -> Result<TestOrchestrator<P, L, S, E, B>, TestgateError> {
        if self.work_dir.as_os_str().is_empty() {
            return Err(missing("work_dir", "must not be empty"));
        }
        if self.source_name.is_empty() {
            return Err(missing("source_name", "must not be empty"));
        }

        let prober = self.prober.ok_or_else(|| missing("prober", "must be provided"))?;
        let lookup = self
            .lookup
            .ok_or_else(|| missing("config_lookup", "must be provided"))?;
        let source = self
            .source
            .ok_or_else(|| missing("source_fetcher", "must be provided"))?;
        let executor = self
            .executor
            .ok_or_else(|| missing("executor", "must be provided"))?;
        let bus = self.bus.ok_or_else(|| missing("event_bus", "must be provided"))?;

        let runner = TestRunner::new(executor);
        let pipeline = RunPipeline {
            source,
            health: HealthGate::new(prober, runner.clone()),
            dispatcher: StrategyDispatcher::new(lookup, self.gateway_domain),
            runner,
            emitter: OutcomeEmitter::new(bus, self.source_name),
        };

        Ok(TestOrchestrator {
            pipeline: Arc::new(pipeline),
            work_dir: self.work_dir,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            counters: Arc::new(RunCounters::default()),
        })
    }
}

impl<P, L, S, E, B> Default for TestOrchestratorBuilder<P, L, S, E, B>
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    fn default() -> Self {
        Self::new()
    }
}

fn missing(field: &str, reason: &str) -> TestgateError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_orchestrator_builds_from_default_config() {
        let orchestrator = ProductionOrchestrator::from_config(&ServiceConfig::default()).unwrap();
        assert_eq!(orchestrator.stats(), RunStats::default());
        assert_eq!(orchestrator.work_dir, PathBuf::from("/tmp/testgate"));
    }

    #[test]
    fn builder_rejects_missing_collaborator() {
        let result = TestOrchestratorBuilder::<
            KubectlReadinessProber,
            KubectlConfigLookup,
            GitSourceFetcher,
            JMeterExecutor,
            HttpEventBus,
        >::new()
        .build();
        let err = result.err().unwrap();
        assert!(err.to_string().contains("prober"));
    }
}
