//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST /v1/ask`: ask a tenant's model a question, receive an SSE stream
//!
//! Each SSE frame is `data: <StreamEvent JSON>\n\n`. Errors found before the
//! stream opens come back as `{"error": "..."}` with a 4xx/5xx status; errors
//! after `start` arrive in-band as an `error` event.

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Json, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use streamgate_core::{Error, ErrorKind, StreamEvent};

use crate::relay::{RelayRequest, RelayStream, StreamingRelay};

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiV1State {
    pub relay: StreamingRelay,
}

pub type SharedApiState = Arc<ApiV1State>;

/// Build the v1 router (mounted under `/v1`).
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/ask", post(ask_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub tenant_id: String,
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A synchronous failure, rendered as a status code plus JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match e.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::ConfigNotFound => StatusCode::NOT_FOUND,
            ErrorKind::UpstreamFailure => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// `POST /v1/ask`: open the relay and stream its events.
async fn ask_handler(
    State(state): State<SharedApiState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    info!(
        tenant_id = %payload.tenant_id,
        session = payload.session_id.is_some(),
        question_len = payload.question.len(),
        "v1/ask SSE request"
    );

    let request = RelayRequest {
        tenant_id: payload.tenant_id,
        question: payload.question,
        session_id: payload.session_id,
    };

    let RelayStream { events, handle } = state.relay.open(request).await.map_err(|e| {
        warn!(error = %e, "Ask rejected before streaming");
        ApiError::from(e)
    })?;

    // The producer logs its own outcome; detach it so the client's
    // disconnect is what ends the request.
    drop(handle);

    let stream = ReceiverStream::new(events).map(|event: StreamEvent| {
        debug!(event = event.event_type(), "SSE event");
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok::<_, Infallible>(SseEvent::default().data(data))
    });

    Ok((
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        Sse::new(stream),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use streamgate_config::StaticTenantStore;
    use streamgate_core::error::ProviderError;
    use streamgate_core::{
        Adapter, ProviderKind, ProviderParams, TenantProviderConfig, TokenStream,
    };
    use streamgate_memory::ConversationStore;
    use streamgate_providers::ProviderSet;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    /// Lightweight mock adapter for gateway tests.
    struct MockAdapter {
        tokens: Vec<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl Adapter for MockAdapter {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn open_stream(
            &self,
            _config: &TenantProviderConfig,
            _question: &str,
            _previous_summary: &str,
        ) -> Result<TokenStream, ProviderError> {
            if self.fail {
                return Err(ProviderError::RateLimited {
                    retry_after_secs: 5,
                });
            }
            let (tx, rx) = mpsc::channel(16);
            for token in &self.tokens {
                tx.try_send(Ok(token.to_string())).unwrap();
            }
            Ok(rx)
        }
    }

    fn test_state(fail: bool) -> SharedApiState {
        let adapter = Arc::new(MockAdapter {
            tokens: vec![r#"{"answer":"#, r#""Five dollars"}"#],
            fail,
        });
        let store = StaticTenantStore::new([TenantProviderConfig {
            tenant_id: "acme".into(),
            provider: ProviderKind::Completion,
            api_key: "sk-acme".into(),
            api_url: None,
            base_prompt: String::new(),
            params: ProviderParams::new("model"),
        }]);
        Arc::new(ApiV1State {
            relay: StreamingRelay::new(
                Arc::new(store),
                ProviderSet::new(adapter.clone(), adapter),
                Arc::new(ConversationStore::new(9, Duration::from_secs(3600))),
            ),
        })
    }

    fn ask(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/ask")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Split an SSE body into its JSON payloads.
    fn sse_payloads(body: &str) -> Vec<serde_json::Value> {
        body.split("\n\n")
            .filter_map(|frame| frame.strip_prefix("data: "))
            .map(|data| serde_json::from_str(data).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn ask_streams_sse_events() {
        let app = v1_router(test_state(false));

        let response = app
            .oneshot(ask(r#"{"tenant_id":"acme","question":"Price?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers["content-type"], "text/event-stream");
        assert_eq!(headers["cache-control"], "no-cache");
        assert_eq!(headers["x-accel-buffering"], "no");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let events = sse_payloads(std::str::from_utf8(&body).unwrap());
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], serde_json::json!({"type":"start","question":"Price?"}));
        assert_eq!(events[1], serde_json::json!({"type":"stream","content":"{\"answer\":"}));
        assert_eq!(events[3], serde_json::json!({"type":"end"}));
    }

    #[tokio::test]
    async fn greeting_streams_structured_answer() {
        let app = v1_router(test_state(false));

        let response = app
            .oneshot(ask(r#"{"tenant_id":"acme","question":"Hi"}"#))
            .await
            .unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let events = sse_payloads(std::str::from_utf8(&body).unwrap());

        assert_eq!(events.len(), 3);
        assert_eq!(events[1]["type"], "stream");
        assert!(events[1]["content"]["answer"].is_string());
        assert_eq!(events[1]["content"]["questions"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn upstream_failure_is_in_band() {
        let app = v1_router(test_state(true));

        let response = app
            .oneshot(ask(r#"{"tenant_id":"acme","question":"Price?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let events = sse_payloads(std::str::from_utf8(&body).unwrap());
        assert_eq!(events.len(), 2);
        assert_eq!(events[1]["type"], "error");
        assert!(events[1]["error"].as_str().unwrap().contains("Rate limited"));
    }

    #[tokio::test]
    async fn unknown_tenant_is_404() {
        let app = v1_router(test_state(false));

        let response = app
            .oneshot(ask(r#"{"tenant_id":"initech","question":"Price?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(json.error.contains("initech"));
    }

    #[tokio::test]
    async fn empty_question_is_400() {
        let app = v1_router(test_state(false));

        let response = app
            .oneshot(ask(r#"{"tenant_id":"acme","question":"  "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_body_is_400_json() {
        let app = v1_router(test_state(false));

        let response = app.oneshot(ask(r#"{"tenant_id":"acme"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(!json.error.is_empty());
    }
}
