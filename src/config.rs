use crate::error::{GatewayError, Result};
use crate::keys::KeySet;
use crate::media::MediaResolver;
use crate::translate::streaming::StreamSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub gateway: AccessConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_upstream_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_anthropic_version")]
    pub anthropic_version: String,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

/// Who may call the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default = "default_gateway_key_env")]
    pub api_key_env: String,
    /// JSON file of the form `{"keys": ["..."]}`, read once at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,
}

fn default_port() -> u16 {
    8383
}

fn default_base_url() -> String {
    "http://127.0.0.1:8484".to_string()
}

fn default_upstream_key_env() -> String {
    "CLEWDR_API_KEY".to_string()
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

fn default_upstream_timeout() -> u64 {
    300
}

fn default_gateway_key_env() -> String {
    "GATEWAY_API_KEY".to_string()
}

fn default_media_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("chat-gateway/{}", env!("CARGO_PKG_VERSION"))
}

fn default_chunk_chars() -> usize {
    crate::translate::streaming::DEFAULT_CHUNK_CHARS
}

fn default_chunk_delay_ms() -> u64 {
    10
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            upstream: UpstreamConfig::default(),
            gateway: AccessConfig::default(),
            media: MediaConfig::default(),
            streaming: StreamingConfig::default(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_upstream_key_env(),
            anthropic_version: default_anthropic_version(),
            timeout_secs: default_upstream_timeout(),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            api_key_env: default_gateway_key_env(),
            keys_file: None,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_media_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_chars: default_chunk_chars(),
            chunk_delay_ms: default_chunk_delay_ms(),
        }
    }
}

/// Everything the gateway needs to talk to the upstream, resolved once at startup.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    /// `None` when the configured environment variable is unset or blank.
    pub api_key: Option<String>,
    /// Name of the variable the key was read from, for error messages.
    pub api_key_env: String,
    pub anthropic_version: String,
}

impl GatewayConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir > built-in defaults
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::warn!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.upstream.base_url).map_err(|e| {
            GatewayError::config(format!(
                "Invalid upstream.base_url '{}': {}",
                self.upstream.base_url, e
            ))
        })?;

        if self.streaming.chunk_chars == 0 {
            return Err(GatewayError::config(
                "streaming.chunk_chars must be at least 1",
            ));
        }

        if self.upstream.timeout_secs == 0 || self.media.timeout_secs == 0 {
            return Err(GatewayError::config(
                "upstream.timeout_secs and media.timeout_secs must be positive",
            ));
        }

        Ok(())
    }

    /// Read the upstream credential from its environment variable and freeze the rest.
    pub fn upstream_settings(&self) -> UpstreamSettings {
        let api_key = std::env::var(&self.upstream.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        UpstreamSettings {
            base_url: self.upstream.base_url.trim_end_matches('/').to_string(),
            api_key,
            api_key_env: self.upstream.api_key_env.clone(),
            anthropic_version: self.upstream.anthropic_version.clone(),
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            chunk_chars: self.streaming.chunk_chars,
            chunk_delay: Duration::from_millis(self.streaming.chunk_delay_ms),
        }
    }

    pub fn media_resolver(&self, client: reqwest::Client) -> MediaResolver {
        MediaResolver::new(
            client,
            Duration::from_secs(self.media.timeout_secs),
            self.media.user_agent.clone(),
        )
    }

    /// Gather gateway keys from the inline list, the keys file and the environment.
    pub fn key_set(&self) -> Result<KeySet> {
        let mut keys = KeySet::from_keys(&self.gateway.api_keys);

        if let Some(ref path) = self.gateway.keys_file {
            if path.exists() {
                keys.extend(KeySet::load_file(path)?);
            }
        }

        if let Ok(from_env) = std::env::var(&self.gateway.api_key_env) {
            keys.insert(&from_env);
        }

        Ok(keys)
    }
}

/// Locations searched for a config file, in priority order.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("chat-gateway.toml"));

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("chat-gateway").join("config.toml"));
    }
    if let Some(home) = home_dir() {
        paths.push(home.join(".config").join("chat-gateway").join("config.toml"));
        paths.push(home.join(".chat-gateway.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
