//! Gateway configuration, loaded from TOML.
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [permission]
//! disabled = false
//! cache_expiration_minutes = 5
//!
//! [permission.verification]
//! protocol = "http"
//! host = "http://auth.internal:8080"
//! uri = "/permissions/verify"
//! method = "POST"
//!
//! [echo]
//! enabled = true
//! ```
//!
//! Every section and key is optional.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub logging: LoggingConfig,
    pub permission: PermissionConfig,
    pub echo: EchoConfig,
}

impl GatewayConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    pub disabled: bool,
    pub cache_expiration_minutes: u64,
    pub verification: Option<VerificationConfig>,
}

impl PermissionConfig {
    pub fn cache_expiration(&self) -> Duration {
        Duration::from_secs(self.cache_expiration_minutes.saturating_mul(60))
    }
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self { disabled: false, cache_expiration_minutes: 5, verification: None }
    }
}

/// The backend service asked to verify permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub protocol: String,
    pub host: String,
    pub uri: String,
    pub method: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn empty_config_uses_defaults() {
        let config = GatewayConfig::from_toml_str("").unwrap();

        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.logging.level, "info");
        assert!(!config.permission.disabled);
        assert_eq!(config.permission.cache_expiration(), Duration::from_secs(300));
        assert!(config.permission.verification.is_none());
        assert!(!config.echo.enabled);
    }

    #[test]
    fn full_config() {
        let config = GatewayConfig::from_toml_str(indoc! {r#"
            [logging]
            level = "debug"

            [permission]
            disabled = true
            cache_expiration_minutes = 1

            [permission.verification]
            protocol = "http"
            host = "http://auth.internal:8080"
            uri = "/permissions/verify"
            method = "POST"

            [echo]
            enabled = true
        "#})
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert!(config.permission.disabled);
        assert_eq!(config.permission.cache_expiration(), Duration::from_secs(60));
        assert_eq!(
            config.permission.verification,
            Some(VerificationConfig {
                protocol: "http".into(),
                host: "http://auth.internal:8080".into(),
                uri: "/permissions/verify".into(),
                method: "POST".into(),
            })
        );
        assert!(config.echo.enabled);
    }

    #[test]
    fn invalid_config() {
        let err = GatewayConfig::from_toml_str("[permission]\ndisabled = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file() {
        let err = GatewayConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
