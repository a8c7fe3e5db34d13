//! Chat-streaming adapter with upstream context caching.
//!
//! Sends a system/user message pair to `POST {api_url}/chat/completions` and
//! yields `delta.content` fragments. Tenants may pin their system prompt in a
//! provider-side context cache; [`ChatAdapter`] also implements
//! [`CacheRenewer`] so the keepalive scheduler can extend that cache's TTL via
//! `PATCH {cache_api_url}/cachedContents/{id}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use streamgate_core::error::ProviderError;
use streamgate_core::provider::{Adapter, CacheRenewer, TenantProviderConfig, TokenStream};
use tracing::{debug, info};

use crate::completion::UpstreamError;
use crate::sse::{self, Piece};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_CACHE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const SUMMARY_MARKER: &str = "Previous Conversation Summary:";

/// Streams chat completions for tenants on the chat-streaming provider.
pub struct ChatAdapter {
    base_url: String,
    cache_base_url: String,
    client: reqwest::Client,
}

impl ChatAdapter {
    /// Create a new adapter. `base_url` serves chat completions,
    /// `cache_base_url` serves cache management.
    pub fn new(
        base_url: impl Into<String>,
        cache_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_base_url: cache_base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// The system/user exchange sent upstream.
    fn build_messages(base_prompt: &str, question: &str, previous_summary: &str) -> Vec<ApiMessage> {
        vec![
            ApiMessage {
                role: "system".into(),
                content: base_prompt.to_string(),
            },
            ApiMessage {
                role: "user".into(),
                content: format!("{question}{SUMMARY_MARKER}{previous_summary}"),
            },
        ]
    }

    fn request_body(
        config: &TenantProviderConfig,
        question: &str,
        previous_summary: &str,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": config.params.adapter_id,
            "messages": Self::build_messages(&config.base_prompt, question, previous_summary),
            "max_tokens": config.params.max_tokens,
            "temperature": config.params.temperature,
            "top_p": config.params.top_p,
            "stream": true,
        });

        if let Some(cache_id) = config.renewable_cache_id() {
            body["extra_body"] = serde_json::json!({
                "google": { "cached_content": cache_id }
            });
        }

        body
    }

    fn endpoint(&self, config: &TenantProviderConfig) -> String {
        let base = config
            .api_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .unwrap_or(&self.base_url);
        format!("{base}/chat/completions")
    }

    /// Cache ids come either bare (`abc`) or resource-qualified (`cachedContents/abc`).
    fn cache_url(&self, cache_id: &str) -> String {
        let id = cache_id.trim().trim_start_matches("cachedContents/");
        format!("{}/cachedContents/{id}", self.cache_base_url)
    }

    fn parse_chunk(data: &str) -> Result<Piece, serde_json::Error> {
        let chunk: ChatChunk = serde_json::from_str(data)?;
        if let Some(error) = chunk.error {
            return Ok(Piece::Failed(error.message));
        }
        Ok(chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .map_or(Piece::Skip, Piece::Token))
    }
}

#[async_trait]
impl Adapter for ChatAdapter {
    fn name(&self) -> &str {
        "chat"
    }

    async fn open_stream(
        &self,
        config: &TenantProviderConfig,
        question: &str,
        previous_summary: &str,
    ) -> Result<TokenStream, ProviderError> {
        let url = self.endpoint(config);
        let body = Self::request_body(config, question, previous_summary);

        debug!(
            tenant_id = %config.tenant_id,
            model = %config.params.adapter_id,
            cached = config.renewable_cache_id().is_some(),
            "Sending streaming chat request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&config.api_key)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(sse::send_error)?;

        let response = sse::check_status(response).await?;
        Ok(sse::spawn_reader(response, "chat", Self::parse_chunk))
    }
}

#[async_trait]
impl CacheRenewer for ChatAdapter {
    async fn renew_cache(
        &self,
        config: &TenantProviderConfig,
        cache_id: &str,
        ttl: Duration,
    ) -> Result<(), ProviderError> {
        let url = self.cache_url(cache_id);
        let body = serde_json::json!({ "ttl": format!("{}s", ttl.as_secs()) });

        let response = self
            .client
            .patch(&url)
            .header("x-goog-api-key", &config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(sse::send_error)?;

        sse::check_status(response).await?;
        info!(
            tenant_id = %config.tenant_id,
            cache_id,
            ttl_secs = ttl.as_secs(),
            "Upstream cache renewed"
        );
        Ok(())
    }
}

// --- Chat API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<UpstreamError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    delta: ChatDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}
