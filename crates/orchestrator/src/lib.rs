#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Run abort and publish error types (`RunError`, `PublishError`)
//! - [`ingress`]: Inbound event validation
//! - [`context`]: Immutable per-run context (`TestRunContext`)
//! - [`health`]: Mandatory readiness + smoke check (`HealthGate`)
//! - [`dispatch`]: Test strategy to parameters (`StrategyDispatcher`, `StagePlan`)
//! - [`runner`]: Executor adapter recording start time (`TestRunner`)
//! - [`emitter`]: Outgoing notifications (`OutcomeEmitter`)
//! - [`run`]: Background run handle and report (`RunHandle`, `RunReport`)
//! - [`orchestrator`]: Entry point (`TestOrchestrator`, `TestOrchestratorBuilder`)

pub mod context;
pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod health;
pub mod ingress;
pub mod orchestrator;
pub mod run;
pub mod runner;

// --- Public API Re-exports ---

pub use orchestrator::{ProductionOrchestrator, RunStats, TestOrchestrator, TestOrchestratorBuilder};

pub use context::TestRunContext;
pub use dispatch::{StagePlan, StrategyDispatcher};
pub use emitter::OutcomeEmitter;
pub use error::{PublishError, RunError};
pub use health::HealthGate;
pub use run::{RunHandle, RunReport, RunTermination};
pub use runner::TestRunner;
