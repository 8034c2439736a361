//! Configuration loading, validation, and management for RelayCRM.
//!
//! Loads configuration from `~/.relaycrm/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! Both trust-boundary secrets (the webhook signing secret and the
//! credential master secret) live here and nowhere else: they are loaded
//! once, injected into the gateway and cipher, and never re-read from the
//! environment at request time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.relaycrm/config.toml`.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Inbound webhook verification settings
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Credential encryption settings
    #[serde(default)]
    pub secrets: SecretsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8419
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Inbound webhook verification settings.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct WebhookConfig {
    /// Shared secret the sender signs request bodies with.
    /// Unset = every delivery is rejected as a server config defect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_secret: Option<String>,
}

/// Credential encryption settings.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct SecretsConfig {
    /// Master secret the 32-byte encryption key is derived from.
    /// Required: startup fails if unset — there is no fallback value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_secret: Option<String>,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("gateway", &self.gateway)
            .field("webhook", &self.webhook)
            .field("secrets", &self.secrets)
            .finish()
    }
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("signing_secret", &redact(&self.signing_secret))
            .finish()
    }
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsConfig")
            .field("master_secret", &redact(&self.master_secret))
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.relaycrm/config.toml),
    /// apply environment overrides, and validate.
    ///
    /// Environment variables take priority over the file:
    /// - `RELAYCRM_WEBHOOK_SECRET` — webhook signing secret
    /// - `RELAYCRM_ENCRYPTION_KEY` — credential master secret
    /// - `RELAYCRM_HOST` / `RELAYCRM_PORT` — gateway bind address
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path. Does not apply
    /// environment overrides or validate — `load()` does both.
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

        Ok(config)
    }

    /// Apply environment variable overrides (highest priority).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("RELAYCRM_WEBHOOK_SECRET") {
            self.webhook.signing_secret = Some(secret);
        }
        if let Ok(secret) = std::env::var("RELAYCRM_ENCRYPTION_KEY") {
            self.secrets.master_secret = Some(secret);
        }
        if let Ok(host) = std::env::var("RELAYCRM_HOST") {
            self.gateway.host = host;
        }
        if let Ok(port) = std::env::var("RELAYCRM_PORT")
            && let Ok(port) = port.parse()
        {
            self.gateway.port = port;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".relaycrm")
    }

    /// Validate the configuration.
    ///
    /// The master secret is mandatory: there is no fallback value, and
    /// startup fails without one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.secrets.master_secret {
            None => {
                return Err(ConfigError::ValidationError(
                    "secrets.master_secret is required — set it in config.toml \
                     or via RELAYCRM_ENCRYPTION_KEY"
                        .into(),
                ));
            }
            Some(s) if s.is_empty() => {
                return Err(ConfigError::ValidationError(
                    "secrets.master_secret must not be empty".into(),
                ));
            }
            Some(_) => {}
        }

        if let Some(secret) = &self.webhook.signing_secret
            && secret.is_empty()
        {
            return Err(ConfigError::ValidationError(
                "webhook.signing_secret must not be empty when set".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for first-run setup).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    }
}

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
