//! Provider router: maps a tenant's provider family to its adapter.
//!
//! The set of families is closed, so dispatch is an exhaustive `match` on
//! [`ProviderKind`] rather than a name lookup.

use std::sync::Arc;
use streamgate_config::AppConfig;
use streamgate_core::error::ProviderError;
use streamgate_core::provider::{Adapter, CacheRenewer, ProviderKind};
use tracing::debug;

use crate::chat::{self, ChatAdapter};
use crate::completion::{self, CompletionAdapter};

/// One adapter per provider family, plus per-family routing policy.
#[derive(Clone)]
pub struct ProviderSet {
    completion: Arc<dyn Adapter>,
    chat: Arc<dyn Adapter>,
    completion_greets: bool,
    chat_greets: bool,
}

impl ProviderSet {
    /// Build a set from explicit adapters. Greeting shortcuts default to
    /// completion-only.
    pub fn new(completion: Arc<dyn Adapter>, chat: Arc<dyn Adapter>) -> Self {
        Self {
            completion,
            chat,
            completion_greets: true,
            chat_greets: false,
        }
    }

    /// Override whether greetings are answered locally for `kind`.
    pub fn with_greeting_shortcut(mut self, kind: ProviderKind, enabled: bool) -> Self {
        match kind {
            ProviderKind::Completion => self.completion_greets = enabled,
            ProviderKind::Chat => self.chat_greets = enabled,
        }
        self
    }

    pub fn adapter(&self, kind: ProviderKind) -> Arc<dyn Adapter> {
        match kind {
            ProviderKind::Completion => self.completion.clone(),
            ProviderKind::Chat => self.chat.clone(),
        }
    }

    pub fn greeting_shortcut(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::Completion => self.completion_greets,
            ProviderKind::Chat => self.chat_greets,
        }
    }
}

/// The live adapters built from configuration.
pub struct Providers {
    pub set: ProviderSet,
    /// Renews chat-provider context caches.
    pub renewer: Arc<dyn CacheRenewer>,
}

/// Build providers from configuration.
pub fn build_from_config(config: &AppConfig) -> Result<Providers, ProviderError> {
    let timeout = config.providers.request_timeout();

    let completion_url = config
        .providers
        .completion
        .api_url
        .clone()
        .unwrap_or_else(|| completion::DEFAULT_BASE_URL.to_string());
    let chat_url = config
        .providers
        .chat
        .api_url
        .clone()
        .unwrap_or_else(|| chat::DEFAULT_BASE_URL.to_string());
    let cache_url = config
        .providers
        .chat
        .cache_api_url
        .clone()
        .unwrap_or_else(|| chat::DEFAULT_CACHE_BASE_URL.to_string());

    debug!(%completion_url, %chat_url, %cache_url, "Building provider adapters");

    let completion = Arc::new(CompletionAdapter::new(completion_url, timeout)?);
    let chat = Arc::new(ChatAdapter::new(chat_url, cache_url, timeout)?);

    let set = ProviderSet::new(completion, chat.clone())
        .with_greeting_shortcut(
            ProviderKind::Completion,
            config.providers.greeting_shortcut(ProviderKind::Completion),
        )
        .with_greeting_shortcut(
            ProviderKind::Chat,
            config.providers.greeting_shortcut(ProviderKind::Chat),
        );

    Ok(Providers { set, renewer: chat })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_by_kind() {
        let providers = build_from_config(&AppConfig::default()).unwrap();
        assert_eq!(providers.set.adapter(ProviderKind::Completion).name(), "completion");
        assert_eq!(providers.set.adapter(ProviderKind::Chat).name(), "chat");
    }

    #[test]
    fn greeting_defaults_are_asymmetric() {
        let providers = build_from_config(&AppConfig::default()).unwrap();
        assert!(providers.set.greeting_shortcut(ProviderKind::Completion));
        assert!(!providers.set.greeting_shortcut(ProviderKind::Chat));
    }

    #[test]
    fn greeting_shortcut_follows_config() {
        let mut config = AppConfig::default();
        config.providers.chat.greeting_shortcut = Some(true);
        config.providers.completion.greeting_shortcut = Some(false);
        let providers = build_from_config(&config).unwrap();
        assert!(!providers.set.greeting_shortcut(ProviderKind::Completion));
        assert!(providers.set.greeting_shortcut(ProviderKind::Chat));
    }
}
