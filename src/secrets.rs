//! Per-challenge solver configuration and credential lookup
//!
//! Each challenge carries a small JSON blob naming the zone, the TTL and the
//! secret holding the hosting.de API key. The secret itself is looked up in a
//! [`SecretStore`] under the challenge's namespace.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::constants::SECRET_API_KEY;
use crate::model::ApiKey;

/// Key/value contents of a secret
pub type SecretData = HashMap<String, Vec<u8>>;

//==============================================================================
// Config
//==============================================================================

/// Solver configuration as written in the issuer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverConfig {
    pub zone_name: String,
    #[serde(rename = "TTL")]
    pub ttl: u32,
    pub secret_name: String,
}

impl SolverConfig {
    /// Decodes the challenge's config blob; an absent blob yields defaults
    pub fn from_json(raw: Option<&serde_json::Value>) -> Result<Self> {
        match raw {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value) => Self::deserialize(value).context("error decoding solver config"),
        }
    }
}

/// Configuration with the API key resolved
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_key: ApiKey,
    pub zone_name: String,
    pub ttl: u32,
}

//==============================================================================
// Stores
//==============================================================================

/// Source of credential secrets, addressed by namespace and name
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns the secret's data, or `None` if no such secret exists
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretData>>;
}

/// Secrets mounted as files: `<root>/<namespace>/<name>/<key>`
#[derive(Debug, Clone)]
pub struct DirSecretStore {
    root: PathBuf,
}

impl DirSecretStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

/// Namespaces and secret names become path segments
fn check_segment(kind: &str, value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_');
    if !valid {
        bail!("invalid {} name: {:?}", kind, value);
    }
    Ok(())
}

#[async_trait]
impl SecretStore for DirSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretData>> {
        check_segment("namespace", namespace)?;
        check_segment("secret", name)?;

        let dir = self.root.join(namespace).join(name);
        let exists = tokio::fs::try_exists(&dir)
            .await
            .with_context(|| format!("Failed to access secret dir: {}", dir.display()))?;
        if !exists {
            return Ok(None);
        }

        let mut data = SecretData::new();
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read secret dir: {}", dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let key = entry.file_name().to_string_lossy().into_owned();
            // Mounted volumes keep their bookkeeping in dot entries (..data).
            if key.starts_with('.') {
                continue;
            }
            let path = entry.path();
            if !tokio::fs::metadata(&path).await?.is_file() {
                continue;
            }
            let value = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read secret key: {}", path.display()))?;
            data.insert(key, value);
        }

        debug!("Loaded secret {}/{} ({} keys)", namespace, name, data.len());
        Ok(Some(data))
    }
}

/// Secrets held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<(String, String), SecretData>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one key to the secret `namespace/name`
    pub fn with_key(mut self, namespace: &str, name: &str, key: &str, value: &str) -> Self {
        self.secrets
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .insert(key.to_string(), value.as_bytes().to_vec());
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretData>> {
        Ok(self
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}

//==============================================================================
// Resolution
//==============================================================================

/// Resolves the solver config of a challenge, including its API key
///
/// Errors name the namespace, secret and key involved, never the key's value.
pub async fn resolve_config(
    store: &dyn SecretStore,
    namespace: &str,
    raw: Option<&serde_json::Value>,
) -> Result<ResolvedConfig> {
    let cfg = SolverConfig::from_json(raw)?;
    if cfg.zone_name.is_empty() {
        bail!("solver config is missing zoneName");
    }
    if cfg.secret_name.is_empty() {
        bail!("solver config is missing secretName");
    }

    let data = store
        .get(namespace, &cfg.secret_name)
        .await
        .with_context(|| format!("unable to get secret `{}/{}`", cfg.secret_name, namespace))?
        .ok_or_else(|| anyhow!("secret `{}/{}` not found", cfg.secret_name, namespace))?;

    let raw_key = data.get(SECRET_API_KEY).ok_or_else(|| {
        anyhow!(
            "unable to get {} from secret `{}/{}`: key {:?} not found in secret data",
            SECRET_API_KEY,
            cfg.secret_name,
            namespace,
            SECRET_API_KEY
        )
    })?;
    let api_key = std::str::from_utf8(raw_key)
        .map_err(|_| {
            anyhow!(
                "{} in secret `{}/{}` is not valid UTF-8",
                SECRET_API_KEY,
                cfg.secret_name,
                namespace
            )
        })?
        .trim();
    if api_key.is_empty() {
        bail!(
            "{} in secret `{}/{}` is empty",
            SECRET_API_KEY,
            cfg.secret_name,
            namespace
        );
    }

    Ok(ResolvedConfig {
        api_key: ApiKey::new(api_key),
        zone_name: cfg.zone_name,
        ttl: cfg.ttl,
    })
}

//==============================================================================
// Tests
//==============================================================================
