//! 수신 검증
//!
//! 타입을 먼저 확인하고, 일치할 때만 페이로드를 디코딩합니다.

use testgate_core::error::IngressError;
use testgate_core::event::{CloudEvent, DeploymentNotification, EVENT_TYPE_DEPLOYMENT_FINISHED};

/// 수신 이벤트를 검증하고 deployment-finished 알림으로 디코딩합니다.
pub fn validate(event: &CloudEvent) -> Result<DeploymentNotification, IngressError> {
    if event.event_type != EVENT_TYPE_DEPLOYMENT_FINISHED {
        return Err(IngressError::UnexpectedEventType {
            expected: EVENT_TYPE_DEPLOYMENT_FINISHED.to_owned(),
            actual: event.event_type.clone(),
        });
    }
    DeploymentNotification::decode(event)
}

/// 거부 사유 메트릭 레이블
pub fn reject_reason(err: &IngressError) -> &'static str {
    match err {
        IngressError::UnexpectedEventType { .. } => "unexpected_type",
        IngressError::PayloadDecode(_) => "payload_decode",
        IngressError::MalformedEnvelope(_) => "malformed",
    }
}
