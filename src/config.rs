//! Configuration module for hostingde-webhook
//!
//! This module handles loading and validating configuration from files and environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};

use crate::client::ClientSettings;
use crate::constants::{
    DEFAULT_LISTEN_ADDR, DEFAULT_SECRETS_DIR, DEFAULT_TIMEOUT_SECS,
    DEFAULT_ZONE_POLL_INTERVAL_SECS, ENV_API_BASE, ENV_GROUP_NAME, ENV_LISTEN_ADDR,
    ENV_SECRETS_DIR, ENV_TIMEOUT, ENV_VERBOSE, ENV_ZONE_POLL_INTERVAL, HOSTINGDE_API_BASE,
    MAX_TIMEOUT_SECS, MAX_ZONE_POLL_INTERVAL_SECS, MIN_TIMEOUT_SECS, MIN_ZONE_POLL_INTERVAL_SECS,
};
use crate::retry::RetryPolicy;

//==============================================================================
// Config
//==============================================================================

/// Configuration for the webhook process
///
/// Credentials are not part of it: each challenge names the secret holding
/// its API key, which is read when the challenge is handled.
///
/// # Configuration Loading Priority
///
/// Configuration is loaded from multiple sources in order of precedence:
/// 1. Environment variables (highest priority)
/// 2. Config file (`/etc/hostingde-webhook/config.toml` or custom path)
/// 3. Defaults (lowest priority)
#[derive(Debug, Clone)]
pub struct Config {
    /// API group the webhook registers under
    ///
    /// Required. Usually provided through the `GROUP_NAME` environment variable.
    pub group_name: String,
    /// Address the webhook server listens on
    ///
    /// Default: `0.0.0.0:8443`
    pub listen_addr: SocketAddr,
    /// hosting.de API base URL
    pub api_base: String,
    /// HTTP request timeout
    ///
    /// Default: 30 seconds
    pub timeout: Duration,
    /// Initial interval of the zone activation wait
    ///
    /// Default: 3 seconds. The wait gives up after 100 times this interval.
    pub zone_poll_interval: Duration,
    /// Directory holding mounted credential secrets
    pub secrets_dir: PathBuf,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Config {
    /// Loads configuration from file and environment variables
    ///
    /// This method loads configuration in the following order:
    /// 1. Loads from the specified config file (if provided and exists)
    /// 2. Overrides with environment variables (if set)
    /// 3. Validates the final configuration
    ///
    /// # Environment Variables
    ///
    /// - `GROUP_NAME` - API group name (required)
    /// - `HOSTINGDE_LISTEN_ADDR` - listen address
    /// - `HOSTINGDE_API_BASE` - API base URL
    /// - `HOSTINGDE_TIMEOUT` - HTTP timeout in seconds
    /// - `HOSTINGDE_ZONE_POLL_INTERVAL` - initial zone poll interval in seconds
    /// - `HOSTINGDE_SECRETS_DIR` - mounted secrets directory
    /// - `HOSTINGDE_VERBOSE` - verbose logging
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::load_from_file(config_path)?;
        Self::override_with_env(&mut config)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Loads configuration from a TOML file, falling back to defaults for
    /// anything the file does not set
    fn load_from_file(config_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config: {}", path.display()))?;
                let toml_config: TomlConfig =
                    toml::from_str(&content).with_context(|| "Failed to parse config file")?;

                if let Some(v) = toml_config.group_name {
                    config.group_name = v;
                }
                if let Some(v) = toml_config.listen_addr.as_deref() {
                    config.listen_addr = parse_listen_addr(v)?;
                }
                if let Some(v) = toml_config.api_base {
                    config.api_base = v;
                }
                if let Some(v) = toml_config.timeout {
                    config.timeout = Duration::from_secs(v);
                }
                if let Some(v) = toml_config.zone_poll_interval {
                    config.zone_poll_interval = Duration::from_secs(v);
                }
                if let Some(v) = toml_config.secrets_dir {
                    config.secrets_dir = v;
                }
                if let Some(v) = toml_config.verbose {
                    config.verbose = v;
                }
            }
        }

        Ok(config)
    }

    /// Overrides configuration values with environment variables that are
    /// set and non-empty
    fn override_with_env(config: &mut Self) -> Result<()> {
        if let Some(v) = non_empty_env(ENV_GROUP_NAME) {
            config.group_name = v;
        }
        if let Some(v) = non_empty_env(ENV_LISTEN_ADDR) {
            config.listen_addr = parse_listen_addr(&v)?;
        }
        if let Some(v) = non_empty_env(ENV_API_BASE) {
            config.api_base = v;
        }
        if let Some(v) = non_empty_env(ENV_TIMEOUT) {
            let secs: u64 = v.parse().context("Invalid HOSTINGDE_TIMEOUT value")?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(v) = non_empty_env(ENV_ZONE_POLL_INTERVAL) {
            let secs: u64 = v
                .parse()
                .context("Invalid HOSTINGDE_ZONE_POLL_INTERVAL value")?;
            config.zone_poll_interval = Duration::from_secs(secs);
        }
        if let Some(v) = non_empty_env(ENV_SECRETS_DIR) {
            config.secrets_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty_env(ENV_VERBOSE) {
            config.verbose = parse_bool_env(&v).context("Invalid HOSTINGDE_VERBOSE value")?;
        }
        Ok(())
    }

    /// Validates the configuration
    ///
    /// Returns an error if:
    /// - The group name is missing
    /// - The API base is not an http(s) URL
    /// - Timeout or poll interval is out of valid range
    fn validate(&self) -> Result<()> {
        if self.group_name.trim().is_empty() {
            return Err(anyhow::anyhow!("Missing {}", ENV_GROUP_NAME));
        }

        if !(self.api_base.starts_with("https://") || self.api_base.starts_with("http://")) {
            return Err(anyhow::anyhow!(
                "{} must be an http(s) URL, got: {}",
                ENV_API_BASE,
                self.api_base
            ));
        }

        let timeout_secs = self.timeout.as_secs();
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(anyhow::anyhow!(
                "timeout must be between {} and {} seconds, got {}",
                MIN_TIMEOUT_SECS,
                MAX_TIMEOUT_SECS,
                timeout_secs
            ));
        }

        let poll_secs = self.zone_poll_interval.as_secs();
        if !(MIN_ZONE_POLL_INTERVAL_SECS..=MAX_ZONE_POLL_INTERVAL_SECS).contains(&poll_secs) {
            return Err(anyhow::anyhow!(
                "zone_poll_interval must be between {} and {} seconds, got {}",
                MIN_ZONE_POLL_INTERVAL_SECS,
                MAX_ZONE_POLL_INTERVAL_SECS,
                poll_secs
            ));
        }

        Ok(())
    }

    /// Settings for the hosting.de client derived from this config
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            api_base: self.api_base.clone(),
            timeout: self.timeout,
            zone_poll: RetryPolicy::from_initial(self.zone_poll_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            group_name: String::new(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8443)),
            api_base: HOSTINGDE_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            zone_poll_interval: Duration::from_secs(DEFAULT_ZONE_POLL_INTERVAL_SECS),
            secrets_dir: PathBuf::from(DEFAULT_SECRETS_DIR),
            verbose: false,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_listen_addr(value: &str) -> Result<SocketAddr> {
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid listen address: {} (expected e.g. {})", value, DEFAULT_LISTEN_ADDR))
}

/// Parses a boolean value from an environment variable
///
/// This function accepts multiple string representations of boolean values:
/// - `true`: "1", "true", "yes", "on"
/// - `false`: "0", "false", "no", "off"
fn parse_bool_env(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "expected boolean (true/false/1/0/yes/no/on/off)"
        )),
    }
}

/// TOML configuration file structure
#[derive(Debug, serde::Deserialize)]
struct TomlConfig {
    group_name: Option<String>,
    listen_addr: Option<String>,
    api_base: Option<String>,
    timeout: Option<u64>,
    zone_poll_interval: Option<u64>,
    secrets_dir: Option<PathBuf>,
    verbose: Option<bool>,
}

//==============================================================================
// Tests
//==============================================================================
