//! HTTP receiver -- CloudEvents ingress and liveness endpoint.
//!
//! The receiver route accepts both CloudEvents HTTP content modes:
//!
//! - **structured**: `Content-Type: application/cloudevents+json`, envelope in the body
//! - **binary**: envelope attributes in `ce-*` headers, body is the data
//!
//! A body without `ce-*` headers is treated as a structured envelope.
//! Accepted notifications get `202 Accepted` immediately; the run continues
//! in the background. Ingress failures get `400 Bad Request`.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::Serialize;
use testgate_core::error::IngressError;
use testgate_core::event::CloudEvent;
use testgate_integrations::{ConfigLookup, EventBus, ReadinessProber, SourceFetcher, TestExecutor};
use testgate_orchestrator::TestOrchestrator;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::health::DaemonHealth;

/// Liveness endpoint path.
pub const HEALTH_PATH: &str = "/healthz";

/// Shared handler state.
pub struct AppState<P, L, S, E, B>
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    orchestrator: Arc<TestOrchestrator<P, L, S, E, B>>,
    start_time: Instant,
    shutdown: CancellationToken,
}

impl<P, L, S, E, B> AppState<P, L, S, E, B>
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    /// Create handler state. New notifications are refused once `shutdown` fires.
    pub fn new(
        orchestrator: Arc<TestOrchestrator<P, L, S, E, B>>,
        start_time: Instant,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            orchestrator,
            start_time,
            shutdown,
        }
    }
}

impl<P, L, S, E, B> Clone for AppState<P, L, S, E, B>
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            start_time: self.start_time,
            shutdown: self.shutdown.clone(),
        }
    }
}

/// Build the daemon router with the receiver mounted at `receiver_path`.
pub fn router<P, L, S, E, B>(state: AppState<P, L, S, E, B>, receiver_path: &str) -> Router
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    Router::new()
        .route(HEALTH_PATH, get(healthz::<P, L, S, E, B>))
        .route(receiver_path, post(receive::<P, L, S, E, B>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Body of a `202 Accepted` response.
#[derive(Debug, Serialize)]
struct Accepted {
    run_id: String,
    shkeptncontext: String,
}

async fn receive<P, L, S, E, B>(
    State(state): State<AppState<P, L, S, E, B>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Accepted>), ApiError>
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    if state.shutdown.is_cancelled() {
        return Err(ApiError::ShuttingDown);
    }

    let event = decode_envelope(&headers, &body).inspect_err(|e| {
        state.orchestrator.note_rejected(e);
    })?;

    let handle = state.orchestrator.accept(&event)?;
    let accepted = Accepted {
        run_id: handle.run_id().to_owned(),
        shkeptncontext: handle.correlation_id().to_owned(),
    };
    handle.detach();

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

async fn healthz<P, L, S, E, B>(State(state): State<AppState<P, L, S, E, B>>) -> Response
where
    P: ReadinessProber,
    L: ConfigLookup,
    S: SourceFetcher,
    E: TestExecutor,
    B: EventBus,
{
    let health = DaemonHealth::new(
        state.start_time,
        state.shutdown.is_cancelled(),
        state.orchestrator.stats(),
    );
    let status = if health.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health)).into_response()
}

/// Decode a CloudEvents HTTP request in structured or binary mode.
pub fn decode_envelope(headers: &HeaderMap, body: &[u8]) -> Result<CloudEvent, IngressError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/cloudevents") {
        return CloudEvent::from_structured(body);
    }

    let binary = headers.keys().any(|name| name.as_str().starts_with("ce-"));
    if binary {
        let pairs = headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)));
        return CloudEvent::from_binary(pairs, body);
    }

    CloudEvent::from_structured(body)
}

/// Handler error mapped to an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// Notification failed ingress validation.
    Ingress(IngressError),
    /// Daemon is draining.
    ShuttingDown,
}

impl From<IngressError> for ApiError {
    fn from(value: IngressError) -> Self {
        Self::Ingress(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            Self::Ingress(e) => {
                let kind = match &e {
                    IngressError::UnexpectedEventType { .. } => "unexpected_event_type",
                    IngressError::PayloadDecode(_) => "payload_decode",
                    IngressError::MalformedEnvelope(_) => "malformed_envelope",
                };
                (StatusCode::BAD_REQUEST, kind, e.to_string())
            }
            Self::ShuttingDown => (
                StatusCode::SERVICE_UNAVAILABLE,
                "shutting_down",
                "daemon is shutting down".to_owned(),
            ),
        };
        let body = Json(serde_json::json!({
            "error": kind,
            "message": message,
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn structured_body() -> Vec<u8> {
        serde_json::json!({
            "specversion": "0.2",
            "id": "1",
            "type": "sh.keptn.events.deployment-finished",
            "source": "helm-service",
            "shkeptncontext": "ctx",
            "data": {"service": "carts"}
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn cloudevents_content_type_selects_structured_mode() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/cloudevents+json; charset=utf-8"),
        );
        // ce- headers are ignored in structured mode
        headers.insert("ce-type", HeaderValue::from_static("ignored"));

        let event = decode_envelope(&headers, &structured_body()).unwrap();
        assert_eq!(event.event_type, "sh.keptn.events.deployment-finished");
        assert_eq!(event.keptn_context(), "ctx");
    }

    #[test]
    fn ce_headers_select_binary_mode() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("ce-specversion", HeaderValue::from_static("0.2"));
        headers.insert("ce-id", HeaderValue::from_static("42"));
        headers.insert("ce-type", HeaderValue::from_static("sh.keptn.events.deployment-finished"));
        headers.insert("ce-source", HeaderValue::from_static("helm-service"));
        headers.insert("ce-shkeptncontext", HeaderValue::from_static("ctx-bin"));

        let event = decode_envelope(&headers, br#"{"service":"carts"}"#).unwrap();
        assert_eq!(event.id, "42");
        assert_eq!(event.keptn_context(), "ctx-bin");
        assert_eq!(event.data.unwrap()["service"], "carts");
    }

    #[test]
    fn plain_json_without_ce_headers_is_structured() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let event = decode_envelope(&headers, &structured_body()).unwrap();
        assert_eq!(event.id, "1");
    }

    #[test]
    fn garbage_body_is_malformed() {
        let err = decode_envelope(&HeaderMap::new(), b"not json").unwrap_err();
        assert!(matches!(err, IngressError::MalformedEnvelope(_)));
    }

    #[test]
    fn binary_mode_missing_type_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert("ce-specversion", HeaderValue::from_static("0.2"));
        headers.insert("ce-id", HeaderValue::from_static("42"));
        headers.insert("ce-source", HeaderValue::from_static("helm-service"));
        let err = decode_envelope(&headers, b"{}").unwrap_err();
        assert!(matches!(err, IngressError::MalformedEnvelope(_)));
    }
}
