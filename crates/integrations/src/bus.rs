//! 이벤트 버스 클라이언트
//!
//! 오케스트레이터는 메시지 내용과 상관관계 메타데이터만 구성하고,
//! 전송은 [`EventBus`] 구현이 담당합니다.

use std::future::Future;
use std::time::Duration;

use testgate_core::config::BrokerConfig;
use testgate_core::event::{CONTENT_TYPE_CLOUDEVENTS_JSON, CloudEvent};
use tracing::debug;

use crate::error::IntegrationError;

/// 발신 이벤트 전송 trait
///
/// 재시도는 하지 않습니다. 실패는 `IntegrationError::Publish`로 보고됩니다.
pub trait EventBus: Send + Sync + 'static {
    /// 이벤트 하나를 발행합니다.
    fn publish(&self, event: &CloudEvent) -> impl Future<Output = Result<(), IntegrationError>> + Send;
}

/// 브로커에 structured 모드로 POST하는 이벤트 버스
pub struct HttpEventBus {
    client: reqwest::Client,
    url: String,
}

impl HttpEventBus {
    /// 새 이벤트 버스를 생성합니다.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, IntegrationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntegrationError::Publish(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// 브로커 설정에서 생성합니다.
    pub fn from_config(config: &BrokerConfig) -> Result<Self, IntegrationError> {
        Self::new(config.url.clone(), Duration::from_secs(config.timeout_secs))
    }
}

impl EventBus for HttpEventBus {
    async fn publish(&self, event: &CloudEvent) -> Result<(), IntegrationError> {
        let body = serde_json::to_vec(event)
            .map_err(|e| IntegrationError::Publish(format!("failed to encode event: {e}")))?;

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_CLOUDEVENTS_JSON)
            .body(body)
            .send()
            .await
            .map_err(|e| IntegrationError::Publish(format!("request to {} failed: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Publish(format!(
                "broker returned {status}: {body}"
            )));
        }

        debug!(%event, %status, "event delivered");
        Ok(())
    }
}
