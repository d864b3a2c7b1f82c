//! Configuration loading and management.
//!
//! All tunables live in a single [`ShepherdConfig`] that is built exactly
//! once at startup (from a TOML file, the environment, or both) and passed
//! to the constructors of the GitHub gateway and the git executor. No
//! component reads process-wide environment state after initialization.

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

/// Environment variables consulted for the credential, in priority order.
const TOKEN_ENV_VARS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

/// Default GitHub REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShepherdConfig {
    /// Base URL of the GitHub REST API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// User-Agent header sent on every API request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Name (or path) of the git binary to drive.
    #[serde(default = "default_git_binary")]
    pub git_binary: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Overall clone budget in seconds.
    #[serde(default = "default_clone_timeout_secs")]
    pub clone_timeout_secs: u64,

    /// Budget for quick git sub-calls (status, rev-parse) in seconds.
    #[serde(default = "default_quick_timeout_secs")]
    pub quick_timeout_secs: u64,

    /// Personal access token. Not read from the config file; populated from
    /// the environment or an explicit caller override at startup.
    #[serde(skip)]
    pub token: Option<SecretString>,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_user_agent() -> String {
    concat!("issue-shepherd/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_git_binary() -> String {
    "git".to_string()
}

const fn default_http_timeout_secs() -> u64 {
    30
}

const fn default_clone_timeout_secs() -> u64 {
    300
}

const fn default_quick_timeout_secs() -> u64 {
    5
}

impl Default for ShepherdConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            git_binary: default_git_binary(),
            http_timeout_secs: default_http_timeout_secs(),
            clone_timeout_secs: default_clone_timeout_secs(),
            quick_timeout_secs: default_quick_timeout_secs(),
            token: None,
        }
    }
}

impl ShepherdConfig {
    /// Builds the default configuration with the credential taken from the
    /// environment (`GITHUB_TOKEN`, then `GH_TOKEN`).
    ///
    /// This is the one place the process environment is consulted; call it
    /// once at startup.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            token: token_from_env(),
            ..Self::default()
        }
    }

    /// Loads configuration from a TOML file, then applies the environment
    /// credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let mut config = Self::from_toml(&content)?;
        config.token = token_from_env();
        Ok(config)
    }

    /// Parses configuration from a TOML string. The credential is never part
    /// of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or contains unknown fields.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Replaces the credential with an explicit value.
    #[must_use]
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Per-request HTTP timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Overall clone budget.
    #[must_use]
    pub const fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    /// Budget for quick git sub-calls.
    #[must_use]
    pub const fn quick_timeout(&self) -> Duration {
        Duration::from_secs(self.quick_timeout_secs)
    }
}

fn token_from_env() -> Option<SecretString> {
    TOKEN_ENV_VARS.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(SecretString::from)
    })
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[source] std::io::Error),

    /// Config file could not be parsed.
    #[error("failed to parse config file: {0}")]
    Parse(#[source] toml::de::Error),
}
