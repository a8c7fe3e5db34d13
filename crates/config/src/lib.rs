//! Configuration loading, validation, and management for Streamgate.
//!
//! Loads configuration from `~/.streamgate/config.toml` (or the path in
//! `STREAMGATE_CONFIG`) with environment variable overrides. Validates all
//! settings at startup.

pub mod tenants;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use streamgate_core::{ProviderKind, TenantProviderConfig};

pub use tenants::StaticTenantStore;

/// The root configuration structure.
///
/// Maps directly to `~/.streamgate/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Conversation memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Upstream cache keepalive configuration
    #[serde(default)]
    pub keepalive: KeepaliveConfig,

    /// Provider endpoint configuration
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Tenant provider configurations served by the static store
    #[serde(default)]
    pub tenants: Vec<TenantProviderConfig>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Browser origins allowed to call the API. Empty = same-origin only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Answers kept per conversation before FIFO eviction
    #[serde(default = "default_memory_capacity")]
    pub capacity: usize,

    /// Conversations untouched for this long are dropped
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_minutes: u64,
}

fn default_memory_capacity() -> usize {
    9
}
fn default_idle_timeout() -> u64 {
    60
}

impl MemoryConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_minutes * 60)
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_memory_capacity(),
            idle_timeout_minutes: default_idle_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepaliveConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minutes between sweeps; must be shorter than the cache TTL
    #[serde(default = "default_keepalive_interval")]
    pub interval_minutes: u64,

    /// TTL requested on every renewal
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_minutes: u64,
}

fn default_keepalive_interval() -> u64 {
    55
}
fn default_cache_ttl() -> u64 {
    60
}

impl KeepaliveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * 60)
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: default_keepalive_interval(),
            cache_ttl_minutes: default_cache_ttl(),
        }
    }
}

/// Endpoint settings shared by every tenant of one provider family.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderEndpointConfig {
    /// Base URL for the streaming API (tenants may override)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Base URL for the cache-management API (chat provider only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_api_url: Option<String>,

    /// Answer greetings locally without calling upstream.
    /// Unset = the provider family's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting_shortcut: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub completion: ProviderEndpointConfig,

    #[serde(default)]
    pub chat: ProviderEndpointConfig,

    /// Upstream HTTP request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            completion: ProviderEndpointConfig::default(),
            chat: ProviderEndpointConfig::default(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ProvidersConfig {
    pub fn endpoint(&self, kind: ProviderKind) -> &ProviderEndpointConfig {
        match kind {
            ProviderKind::Completion => &self.completion,
            ProviderKind::Chat => &self.chat,
        }
    }

    /// Whether greetings short-circuit for this provider family.
    ///
    /// Defaults: completion answers greetings locally, chat sends them upstream.
    pub fn greeting_shortcut(&self, kind: ProviderKind) -> bool {
        self.endpoint(kind)
            .greeting_shortcut
            .unwrap_or(matches!(kind, ProviderKind::Completion))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from the default path.
    ///
    /// Environment overrides:
    /// - `STREAMGATE_CONFIG`: alternate config file path
    /// - `STREAMGATE_HOST` / `STREAMGATE_PORT`: listen address
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("STREAMGATE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            tenants = config.tenants.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Apply `STREAMGATE_HOST` / `STREAMGATE_PORT` from `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("STREAMGATE_HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = lookup("STREAMGATE_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("STREAMGATE_PORT is not a port: {port}"))
            })?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".streamgate")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "memory.capacity must be > 0".into(),
            ));
        }

        if self.keepalive.interval_minutes == 0
            || self.keepalive.interval_minutes >= self.keepalive.cache_ttl_minutes
        {
            return Err(ConfigError::ValidationError(format!(
                "keepalive.interval_minutes ({}) must be > 0 and shorter than cache_ttl_minutes ({})",
                self.keepalive.interval_minutes, self.keepalive.cache_ttl_minutes
            )));
        }

        let mut seen = HashSet::new();
        for tenant in &self.tenants {
            if tenant.tenant_id.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "tenant_id must not be empty".into(),
                ));
            }
            if !seen.insert(tenant.tenant_id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate tenant_id '{}'",
                    tenant.tenant_id
                )));
            }
            let params = &tenant.params;
            if !(0.0..=2.0).contains(&params.temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "tenant '{}': temperature must be between 0.0 and 2.0",
                    tenant.tenant_id
                )));
            }
            if params.top_p <= 0.0 || params.top_p > 1.0 {
                return Err(ConfigError::ValidationError(format!(
                    "tenant '{}': top_p must be in (0.0, 1.0]",
                    tenant.tenant_id
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            memory: MemoryConfig::default(),
            keepalive: KeepaliveConfig::default(),
            providers: ProvidersConfig::default(),
            tenants: vec![],
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
