//! Configuration management for the relay
//!
//! Configuration is an immutable snapshot loaded at startup from a YAML file,
//! with `${VAR}` references expanded from the environment so credentials stay
//! out of the file itself. Hot reload is out of scope here; a reloader only
//! needs to build a new snapshot and hand it to
//! [`ProviderDirectory::replace_all`](crate::core::directory::ProviderDirectory::replace_all).

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::core::health::DEFAULT_FAILURE_THRESHOLD;
use crate::utils::error::{GatewayError, Result};

/// Config file used when `GATEWAY_CONFIG` is not set
pub const DEFAULT_CONFIG_PATH: &str = "config/gateway.yaml";

/// Main configuration snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Routing and health behavior
    #[serde(default)]
    pub gateway: GatewaySettings,
    /// Upstream providers
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Routing and health behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Consecutive failures before a provider is skipped at lookup
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds between background health probes
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            probe_interval_secs: default_probe_interval_secs(),
        }
    }
}

impl GatewaySettings {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }
}

/// One upstream provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Stable identifier, used in model bindings and usage events
    pub name: String,
    /// Human-readable name for status output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// OpenAI-compatible API base, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Bearer credential; usually an `${ENV_VAR}` reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-call timeout; also the relay deadline for streamed sessions
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry budget surfaced to outer layers; the relay itself never retries
    #[serde(default)]
    pub max_retries: u32,
    /// Disabled providers keep their bindings but refuse lookups
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Models this provider serves
    #[serde(default)]
    pub models: Vec<String>,
}

impl ProviderConfig {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_failure_threshold() -> u32 {
    DEFAULT_FAILURE_THRESHOLD
}

fn default_probe_interval_secs() -> u64 {
    60
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_enabled() -> bool {
    true
}

impl Config {
    /// Load and validate a configuration file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        let content = tokio::fs::read_to_string(path).await.map_err(|err| {
            GatewayError::config(format!("failed to read {}: {err}", path.display()))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate YAML content, expanding `${VAR}` references first
    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = serde_yaml::from_str(&expanded)
            .map_err(|err| GatewayError::config(format!("failed to parse config: {err}")))?;

        config.validate()?;
        debug!(providers = config.providers.len(), "configuration parsed");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            if provider.name.is_empty() {
                return Err(GatewayError::config("provider name must not be empty"));
            }
            if !seen.insert(provider.name.as_str()) {
                return Err(GatewayError::config(format!(
                    "duplicate provider name '{}'",
                    provider.name
                )));
            }
            let url = Url::parse(&provider.base_url).map_err(|err| {
                GatewayError::config(format!(
                    "provider '{}' has invalid base_url: {err}",
                    provider.name
                ))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(GatewayError::config(format!(
                    "provider '{}' base_url must be http or https",
                    provider.name
                )));
            }
            if provider.timeout_secs == 0 {
                return Err(GatewayError::config(format!(
                    "provider '{}' timeout_secs must be at least 1",
                    provider.name
                )));
            }
        }
        Ok(())
    }
}

/// Expand environment variables in configuration strings.
///
/// Supports both `${VAR_NAME}` and `$VAR_NAME` forms; unset variables are
/// left in place so validation can point at them.
pub fn expand_env_vars(input: &str) -> String {
    let mut result = input.to_string();

    for (key, value) in env::vars() {
        let patterns = [format!("${{{}}}", key), format!("${}", key)];
        for pattern in &patterns {
            result = result.replace(pattern, &value);
        }
    }

    result
}
