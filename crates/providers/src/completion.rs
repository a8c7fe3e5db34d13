//! Completion-style adapter.
//!
//! Flattens the base prompt, question and conversation summary into a single
//! prompt and streams `POST {api_url}/completions`. Works with any
//! OpenAI-compatible text-completion endpoint (Together AI, vLLM, Fireworks).

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use streamgate_core::error::ProviderError;
use streamgate_core::provider::{Adapter, TenantProviderConfig, TokenStream};
use tracing::debug;

use crate::sse::{self, Piece};

pub const DEFAULT_BASE_URL: &str = "https://api.together.xyz/v1";

const SUMMARY_MARKER: &str = "Previous Conversation Summary:";
const ANSWER_MARKER: &str = "Sales Expert's JSON Answer:";

/// Streams text completions for tenants on the completion-style provider.
pub struct CompletionAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl CompletionAdapter {
    /// Create a new adapter against `base_url` (tenants may override it).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// The single flattened prompt sent upstream.
    pub fn build_prompt(base_prompt: &str, question: &str, previous_summary: &str) -> String {
        format!("{base_prompt}{question}{SUMMARY_MARKER}{previous_summary}{ANSWER_MARKER}")
    }

    fn request_body(
        config: &TenantProviderConfig,
        question: &str,
        previous_summary: &str,
    ) -> serde_json::Value {
        serde_json::json!({
            "model": config.params.adapter_id,
            "prompt": Self::build_prompt(&config.base_prompt, question, previous_summary),
            "max_tokens": config.params.max_tokens,
            "temperature": config.params.temperature,
            "top_p": config.params.top_p,
            "stream": true,
        })
    }

    fn endpoint(&self, config: &TenantProviderConfig) -> String {
        let base = config
            .api_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .unwrap_or(&self.base_url);
        format!("{base}/completions")
    }

    fn parse_chunk(data: &str) -> Result<Piece, serde_json::Error> {
        let chunk: CompletionChunk = serde_json::from_str(data)?;
        if let Some(error) = chunk.error {
            return Ok(Piece::Failed(error.message));
        }
        Ok(chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.text)
            .map_or(Piece::Skip, Piece::Token))
    }
}

#[async_trait]
impl Adapter for CompletionAdapter {
    fn name(&self) -> &str {
        "completion"
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
            "Sending streaming completion request"
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
        Ok(sse::spawn_reader(response, "completion", Self::parse_chunk))
    }
}

// --- Completion API types (internal) ---

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    error: Option<UpstreamError>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpstreamError {
    #[serde(default)]
    pub(crate) message: String,
}
