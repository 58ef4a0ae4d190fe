//! Daemon lifecycle -- assembly, serving, and graceful shutdown.
//!
//! # Startup
//!
//! 1. Install the metrics recorder (when enabled)
//! 2. Build the production orchestrator from configuration
//! 3. Create the work directory and bind the receiver socket
//! 4. Serve until SIGTERM or SIGINT
//!
//! # Shutdown
//!
//! 1. Stop accepting connections; new notifications get `503`
//! 2. Cancel every in-flight run (child processes are killed)
//! 3. Wait up to [`DRAIN_TIMEOUT`] for run tasks to finish

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use testgate_core::config::ServiceConfig;
use testgate_integrations::{ConfigLookup, EventBus, ReadinessProber, SourceFetcher, TestExecutor};
use testgate_orchestrator::{ProductionOrchestrator, TestOrchestrator};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::metrics_server;
use crate::server::{self, AppState};

/// Upper bound on waiting for cancelled runs to wind down.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Run the daemon with the production collaborators until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if:
/// - The metrics recorder cannot be installed
/// - A collaborator cannot be constructed from configuration
/// - The work directory cannot be created or the receiver socket cannot be bound
/// - Signal handlers cannot be installed
pub async fn run(config: ServiceConfig) -> Result<()> {
    let start_time = Instant::now();
    let shutdown = CancellationToken::new();

    let uptime_task = if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
        Some(metrics_server::spawn_uptime_updater(start_time, shutdown.clone()))
    } else {
        None
    };

    let orchestrator = Arc::new(
        ProductionOrchestrator::from_config(&config)
            .map_err(|e| anyhow::anyhow!("failed to build orchestrator: {}", e))?,
    );

    tokio::fs::create_dir_all(&config.general.work_dir)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "failed to create work dir '{}': {}",
                config.general.work_dir,
                e
            )
        })?;

    let addr = format!("{}:{}", config.receiver.listen_addr, config.receiver.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind receiver on {}: {}", addr, e))?;

    let signals = ShutdownSignals::install()?;
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        let signal = signals.recv().await;
        tracing::info!(signal = signal, "shutdown signal received");
        trigger.cancel();
    });

    tracing::info!(
        listen_addr = %addr,
        path = config.receiver.path.as_str(),
        broker = config.broker.url.as_str(),
        "receiver listening"
    );

    serve(
        listener,
        orchestrator,
        &config.receiver.path,
        start_time,
        shutdown,
        DRAIN_TIMEOUT,
    )
    .await?;

    if let Some(task) = uptime_task {
        let _ = task.await;
    }
    Ok(())
}

/// Serve the receiver on `listener` until `shutdown` fires, then drain runs.
///
/// Returns once every run task has finished or `drain_timeout` elapsed.
pub async fn serve<P, L, S, E, B>(
    listener: TcpListener,
    orchestrator: Arc<TestOrchestrator<P, L, S, E, B>>,
    receiver_path: &str,
    start_time: Instant,
    shutdown: CancellationToken,
    drain_timeout: Duration,
) -> Result<()>
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    let state = AppState::new(Arc::clone(&orchestrator), start_time, shutdown.clone());
    let app = server::router(state, receiver_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await
        .map_err(|e| anyhow::anyhow!("receiver server error: {}", e))?;

    tracing::info!("receiver stopped, cancelling in-flight runs");
    orchestrator.shutdown();

    if tokio::time::timeout(drain_timeout, orchestrator.drained())
        .await
        .is_err()
    {
        tracing::warn!(
            in_flight = orchestrator.stats().in_flight,
            timeout_secs = drain_timeout.as_secs(),
            "runs did not finish within drain timeout"
        );
    }

    let stats = orchestrator.stats();
    tracing::info!(
        accepted = stats.accepted,
        rejected = stats.rejected,
        completed = stats.completed,
        "daemon drained"
    );
    Ok(())
}

/// SIGTERM and SIGINT listeners, installed up front so failures surface at startup.
struct ShutdownSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    fn install() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;
        Ok(Self { sigterm, sigint })
    }

    /// Wait for the first signal and return its name.
    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}
