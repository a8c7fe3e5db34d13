//! HTTP gateway for Streamgate.
//!
//! Exposes the streaming ask endpoint and a health probe, and owns server
//! start-up: it wires the tenant store, provider adapters, conversation
//! memory, and the cache keepalive scheduler together.
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;
pub mod extract;
pub mod relay;

use axum::extract::DefaultBodyLimit;
use axum::{Router, http::HeaderValue, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use streamgate_config::{AppConfig, StaticTenantStore};
use streamgate_core::TenantStore;
use streamgate_keepalive::KeepaliveScheduler;
use streamgate_memory::ConversationStore;

pub use extract::{DEFAULT_FOLLOW_UPS, ExtractedPayload, build_answer, extract};
pub use relay::{RelayOutcome, RelayRequest, RelayStream, StreamingRelay};

/// Request bodies above this are rejected.
const BODY_LIMIT: usize = 64 * 1024;

/// How often idle conversations are reaped.
const REAPER_INTERVAL: Duration = Duration::from_secs(60);

/// Build the full router.
///
/// Layers applied:
/// - Request body size limit (64 KiB)
/// - CORS for the configured browser origins
/// - HTTP trace logging
pub fn build_router(api_state: api_v1::SharedApiState, cors_origins: &[String]) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(api_state))
        .layer(DefaultBodyLimit::max(BODY_LIMIT));

    let router = if cors_origins.is_empty() {
        router
    } else {
        router.layer(cors_layer(cors_origins))
    };

    router.layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
///
/// Builds providers, memory and the tenant store once, starts the keepalive
/// scheduler and memory reaper, and serves until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    // === Build shared subsystems ONCE ===
    let providers = streamgate_providers::build_from_config(&config)?;
    let store: Arc<dyn TenantStore> = Arc::new(StaticTenantStore::from_config(&config));
    let memory = Arc::new(ConversationStore::new(
        config.memory.capacity,
        config.memory.idle_timeout(),
    ));

    let reaper = streamgate_memory::spawn_reaper(memory.clone(), REAPER_INTERVAL);

    let keepalive = if config.keepalive.enabled {
        let scheduler = Arc::new(KeepaliveScheduler::new(
            store.clone(),
            providers.renewer.clone(),
            config.keepalive.interval(),
            config.keepalive.cache_ttl(),
        ));
        Some(scheduler.start())
    } else {
        info!("Cache keepalive disabled");
        None
    };

    let api_state = Arc::new(api_v1::ApiV1State {
        relay: StreamingRelay::new(store, providers.set, memory),
    });

    let app = build_router(api_state, &config.gateway.cors_origins);

    info!(
        addr = %addr,
        tenants = config.tenants.len(),
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.abort();
    if let Some(handle) = keepalive {
        handle.abort();
    }
    info!("Gateway stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> api_v1::SharedApiState {
        let config = AppConfig::default();
        let providers = streamgate_providers::build_from_config(&config).unwrap();
        Arc::new(api_v1::ApiV1State {
            relay: StreamingRelay::new(
                Arc::new(StaticTenantStore::from_config(&config)),
                providers.set,
                Arc::new(ConversationStore::new(9, Duration::from_secs(3600))),
            ),
        })
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(), &[]);

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn ask_is_mounted_under_v1() {
        let app = build_router(test_state(), &[]);

        let req = Request::builder()
            .method("POST")
            .uri("/v1/ask")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"tenant_id":"nobody","question":"hi"}"#))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let app = build_router(test_state(), &[]);

        let question = "x".repeat(BODY_LIMIT + 1);
        let body = serde_json::json!({"tenant_id": "acme", "question": question}).to_string();
        let req = Request::builder()
            .method("POST")
            .uri("/v1/ask")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert!(response.status().is_client_error());
        assert_ne!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let app = build_router(test_state(), &["https://shop.example".to_string()]);

        let req = Request::builder()
            .method("OPTIONS")
            .uri("/v1/ask")
            .header("origin", "https://shop.example")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://shop.example"
        );
    }
}
