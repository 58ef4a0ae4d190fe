//! Liveness reporting for `GET /healthz`.
//!
//! The daemon is healthy while it accepts work. After shutdown begins
//! the status flips to `draining` so load balancers stop routing.

use std::time::Instant;

use serde::Serialize;
use testgate_orchestrator::RunStats;

/// Daemon status as seen by probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonStatus {
    /// Accepting notifications.
    Ok,
    /// Shutdown requested, in-flight runs are being cancelled.
    Draining,
}

/// Health report body.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Overall status.
    pub status: DaemonStatus,
    /// Daemon version.
    pub version: &'static str,
    /// Seconds since the daemon started.
    pub uptime_secs: u64,
    /// Run counters from the orchestrator.
    pub runs: RunStats,
}

impl DaemonHealth {
    /// Build a report from the start time and current counters.
    pub fn new(start_time: Instant, draining: bool, runs: RunStats) -> Self {
        Self {
            status: if draining {
                DaemonStatus::Draining
            } else {
                DaemonStatus::Ok
            },
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: start_time.elapsed().as_secs(),
            runs,
        }
    }

    /// Whether probes should treat the daemon as live.
    pub fn is_ok(&self) -> bool {
        self.status == DaemonStatus::Ok
    }
}
