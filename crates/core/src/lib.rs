#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{CollaboratorError, ConfigError, IngressError, TestgateError};

// 설정
pub use config::ServiceConfig;

// 이벤트
pub use event::{
    CloudEvent, DeploymentFinishedData, DeploymentNotification, EvaluationDoneData,
    NotificationKind, OutgoingNotification, TestsFinishedData,
};

// 도메인 타입
pub use types::{
    DeploymentTopology, InvalidResourceName, RunKind, TestOutcome, TestParameters, TestStrategy,
    UnknownDeploymentStrategy, check_resource_name,
};
