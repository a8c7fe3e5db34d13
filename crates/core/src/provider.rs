//! Provider abstraction: the seam between the relay and upstream LLM APIs.
//!
//! An [`Adapter`] turns a tenant configuration plus a question into a lazy
//! sequence of raw token strings. A [`CacheRenewer`] extends the lifetime of
//! an upstream context cache.
//!
//! Implementations: completion-style and chat-streaming (`streamgate-providers`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ProviderError;

/// Upstream provider family. Closed set: adding a variant forces every
/// dispatch `match` to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Text-completion API with a single flattened prompt.
    Completion,
    /// Chat-completion API with system/user messages and an optional context cache.
    Chat,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Completion => "completion",
            ProviderKind::Chat => "chat",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-specific knobs stored with each tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderParams {
    /// Upstream model / fine-tuned adapter identifier
    pub adapter_id: String,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Upstream context cache (chat provider only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_id: Option<String>,
}

pub fn default_max_tokens() -> u32 {
    1024
}
pub fn default_temperature() -> f32 {
    0.2
}
pub fn default_top_p() -> f32 {
    0.1
}

impl ProviderParams {
    pub fn new(adapter_id: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            cache_id: None,
        }
    }
}

/// Per-tenant provider configuration. Owned by the configuration store;
/// the gateway reads it once per request.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantProviderConfig {
    pub tenant_id: String,

    pub provider: ProviderKind,

    pub api_key: String,

    /// Overrides the provider's default base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// System prompt / prompt prefix
    #[serde(default)]
    pub base_prompt: String,

    pub params: ProviderParams,
}

impl TenantProviderConfig {
    /// The cache id, if this tenant has one worth keeping alive.
    pub fn renewable_cache_id(&self) -> Option<&str> {
        match self.provider {
            ProviderKind::Chat => self
                .params
                .cache_id
                .as_deref()
                .filter(|id| !id.trim().is_empty()),
            ProviderKind::Completion => None,
        }
    }
}

impl std::fmt::Debug for TenantProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantProviderConfig")
            .field("tenant_id", &self.tenant_id)
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("base_prompt_len", &self.base_prompt.len())
            .field("params", &self.params)
            .finish()
    }
}

/// Raw token fragments from one upstream call. Finite and not restartable.
pub type TokenStream = tokio::sync::mpsc::Receiver<std::result::Result<String, ProviderError>>;

/// The core Adapter trait.
///
/// Each upstream family normalizes request construction and token extraction
/// for its wire format. Adapters hold no per-call state, so one instance
/// serves every concurrent request.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// A human-readable name for this adapter (e.g., "completion", "chat").
    fn name(&self) -> &str;

    /// Open the upstream stream.
    ///
    /// Errors returned here happen before any token; errors inside the
    /// stream happen mid-answer. Dropping the receiver stops the reader.
    async fn open_stream(
        &self,
        config: &TenantProviderConfig,
        question: &str,
        previous_summary: &str,
    ) -> std::result::Result<TokenStream, ProviderError>;
}

/// Renews an upstream context cache before its TTL lapses.
#[async_trait]
pub trait CacheRenewer: Send + Sync {
    async fn renew_cache(
        &self,
        config: &TenantProviderConfig,
        cache_id: &str,
        ttl: Duration,
    ) -> std::result::Result<(), ProviderError>;
}
