//! YourMembership social authentication
//!
//! A social-auth backend for the YourMembership membership-management API:
//! - XML session API envelopes (`auth::envelope`)
//! - Login flow: session creation, provider redirect, profile fetch (`auth::yourmembership`)
//! - Narrow host contract: session storage and authenticate callback (`auth::strategy`)
//! - Closed error taxonomy shared with the host (`error`)

pub mod auth;
pub mod error;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::Path;

pub use auth::yourmembership::YMAPI_ENDPOINT;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub yourmembership: YourMembershipYamlConfig,
}

/// `yourmembership` section. Every field may also come from the environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YourMembershipYamlConfig {
    pub api_key: Option<String>,
    pub private_key: Option<String>,
    /// URI the provider redirects back to (e.g. "https://app.example.com/complete/yourmembership/")
    pub redirect_uri: Option<String>,
    /// API endpoint override (default: production endpoint)
    pub endpoint: Option<String>,
}

// ============================================================================
// Runtime config (what the backend actually uses)
// ============================================================================

/// Credentials and endpoints for the YourMembership backend.
#[derive(Debug, Clone)]
pub struct YourMembershipConfig {
    pub api_key: String,
    pub private_key: String,
    pub redirect_uri: String,
    pub endpoint: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub yourmembership: YourMembershipConfig,
}

impl Config {
    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env vars / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path).yourmembership;

        let api_key = std::env::var("YM_API_KEY").ok().or(yaml.api_key);
        let private_key = std::env::var("YM_PRIVATE_KEY").ok().or(yaml.private_key);
        let redirect_uri = std::env::var("YM_REDIRECT_URI").ok().or(yaml.redirect_uri);
        let endpoint = std::env::var("YM_API_ENDPOINT")
            .ok()
            .or(yaml.endpoint)
            .unwrap_or_else(|| YMAPI_ENDPOINT.to_string());

        let Some(api_key) = api_key.filter(|k| !k.is_empty()) else {
            bail!("YourMembership api_key is required (yourmembership.api_key or YM_API_KEY)");
        };
        let Some(redirect_uri) = redirect_uri.filter(|u| !u.is_empty()) else {
            bail!(
                "YourMembership redirect_uri is required (yourmembership.redirect_uri or YM_REDIRECT_URI)"
            );
        };

        Ok(Self {
            yourmembership: YourMembershipConfig {
                api_key,
                private_key: private_key.unwrap_or_default(),
                redirect_uri,
                endpoint,
            },
        })
    }

    /// Read the `yourmembership` section from a YAML file.
    ///
    /// A missing file is normal (credentials may come from the environment
    /// alone). An unreadable or invalid file is logged and ignored.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let path = yaml_path.unwrap_or_else(|| Path::new("config.yaml"));

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no YourMembership config file");
                return YamlConfig::default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read config file, ignoring it");
                return YamlConfig::default();
            }
        };

        match serde_yaml::from_str::<YamlConfig>(&contents) {
            Ok(config) => {
                tracing::info!(
                    path = %path.display(),
                    has_api_key = config.yourmembership.api_key.is_some(),
                    "loaded YourMembership config"
                );
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid config file, ignoring it");
                YamlConfig::default()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
