#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`IntegrationError`)
//! - [`prober`]: Workload readiness (`ReadinessProber`, `KubectlReadinessProber`)
//! - [`lookup`]: Cluster config lookup (`ConfigLookup`, `KubectlConfigLookup`)
//! - [`source`]: Test plan checkout (`SourceFetcher`, `GitSourceFetcher`)
//! - [`executor`]: Test execution (`TestExecutor`, `JMeterExecutor`)
//! - [`summary`]: JMeter summary line parsing
//! - [`artifacts`]: Run-scoped artifact paths and cleanup
//! - [`bus`]: Outgoing event transport (`EventBus`, `HttpEventBus`)

pub mod artifacts;
pub mod bus;
pub mod error;
pub mod executor;
pub mod lookup;
pub mod prober;
mod process;
pub mod source;
pub mod summary;

// --- Public API Re-exports ---

pub use error::IntegrationError;

pub use artifacts::{ArtifactPaths, run_dir};
pub use bus::{EventBus, HttpEventBus};
pub use executor::{JMeterExecutor, TestExecutor};
pub use lookup::{ConfigKey, ConfigLookup, KubectlConfigLookup};
pub use prober::{KubectlReadinessProber, ReadinessProber};
pub use source::{GitSourceFetcher, SourceFetcher};
pub use summary::{RunSummary, SummaryParser};
