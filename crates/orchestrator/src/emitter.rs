//! 결과 발행기
//!
//! 판정을 발신 알림으로 만들어 이벤트 버스에 넘깁니다.
//! 모든 알림은 새 ID를 받고 수신 알림의 상관관계 ID를 그대로 싣습니다.
//! 전달 실패는 재시도하지 않습니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use testgate_core::event::{EvaluationDoneData, OutgoingNotification, TestsFinishedData};
use testgate_core::metrics as m;
use testgate_integrations::EventBus;
use tracing::info;

use crate::error::PublishError;

/// 결과 발행기
pub struct OutcomeEmitter<B: EventBus> {
    bus: Arc<B>,
    source: String,
}

impl<B: EventBus> OutcomeEmitter<B> {
    /// 새 발행기를 생성합니다. `source`는 발신 이벤트의 source 속성입니다.
    pub fn new(bus: Arc<B>, source: impl Into<String>) -> Self {
        Self {
            bus,
            source: source.into(),
        }
    }

    /// 테스트 통과 알림 (`tests-finished`, 원본 + `startedat`)
    pub async fn emit_success(
        &self,
        correlation_id: &str,
        original: &Map<String, Value>,
        started_at: DateTime<Utc>,
    ) -> Result<(), PublishError> {
        let notification =
            OutgoingNotification::TestsFinished(TestsFinishedData::new(original, started_at));
        self.emit(correlation_id, notification).await
    }

    /// 평가 실패 알림 (`evaluation-done`, 원본 + `evaluationpassed=false`)
    pub async fn emit_failure(
        &self,
        correlation_id: &str,
        original: &Map<String, Value>,
    ) -> Result<(), PublishError> {
        let notification = OutgoingNotification::EvaluationDone(EvaluationDoneData::failed(original));
        self.emit(correlation_id, notification).await
    }

    async fn emit(
        &self,
        correlation_id: &str,
        notification: OutgoingNotification,
    ) -> Result<(), PublishError> {
        let kind = notification.kind();
        let result = async {
            let event = notification
                .into_event(&self.source, correlation_id)
                .map_err(|e| format!("failed to encode payload: {e}"))?;
            self.bus.publish(&event).await.map_err(|e| e.to_string())?;
            Ok::<_, String>(event.id)
        }
        .await;

        let label = if result.is_ok() { "delivered" } else { "failed" };
        metrics::counter!(
            m::NOTIFICATIONS_PUBLISHED_TOTAL,
            m::LABEL_NOTIFICATION => kind.metric_label(),
            m::LABEL_RESULT => label
        )
        .increment(1);

        match result {
            Ok(id) => {
                info!(notification = %kind, id = id.as_str(), "notification published");
                Ok(())
            }
            Err(reason) => Err(PublishError { kind, reason }),
        }
    }
}
