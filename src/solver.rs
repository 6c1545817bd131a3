//! ACME DNS-01 challenge solver for hosting.de
//!
//! Present creates the challenge TXT record, CleanUp deletes it again. Both
//! first locate the configured zone and wait until it is active.

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::{ClientSettings, HostingDeClient};
use crate::constants::{DNS_RECORD_TYPE_TXT, SOLVER_NAME};
use crate::metrics;
use crate::model::{DnsRecord, ZoneConfig, ZoneConfigsFindRequest, ZoneUpdateRequest};
use crate::registry::RecordRegistry;
use crate::secrets::{resolve_config, ResolvedConfig, SecretStore};
use crate::validation::{un_fqdn, validate_domain_name};

//==============================================================================
// Types
//==============================================================================

/// A challenge as handed over by the host runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChallengeRequest {
    pub uid: String,
    /// `Present` or `CleanUp`
    pub action: String,
    #[serde(rename = "type")]
    pub challenge_type: String,
    pub dns_name: String,
    /// Value the TXT record must carry
    pub key: String,
    pub resource_namespace: String,
    #[serde(rename = "resolvedFQDN")]
    pub resolved_fqdn: String,
    pub resolved_zone: String,
    pub allow_ambient_credentials: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

/// Operations the host runtime invokes on a DNS-01 solver
#[async_trait]
pub trait Solver: Send + Sync {
    /// Name the solver is registered under
    fn name(&self) -> &str;

    /// Creates the challenge record
    async fn present(&self, challenge: &ChallengeRequest) -> Result<()>;

    /// Removes the challenge record
    async fn clean_up(&self, challenge: &ChallengeRequest) -> Result<()>;
}

/// TXT contents come back from hosting.de wrapped in double quotes
fn quote_txt(value: &str) -> String {
    format!("\"{}\"", value)
}

//==============================================================================
// Solver
//==============================================================================

pub struct HostingDeSolver {
    client: HostingDeClient,
    secrets: Arc<dyn SecretStore>,
    records: Arc<RecordRegistry>,
    stop: CancellationToken,
}

impl HostingDeSolver {
    /// Prepares the HTTP client; `stop` cancels any zone activation wait
    pub fn initialize(
        settings: &ClientSettings,
        secrets: Arc<dyn SecretStore>,
        records: Arc<RecordRegistry>,
        stop: CancellationToken,
    ) -> Result<Self> {
        let client = HostingDeClient::new(settings).context("hosting.de client failed")?;
        Ok(Self {
            client,
            secrets,
            records,
            stop,
        })
    }

    async fn resolve(&self, challenge: &ChallengeRequest) -> Result<ResolvedConfig> {
        validate_domain_name(&challenge.resolved_fqdn)
            .with_context(|| format!("invalid FQDN {:?}", challenge.resolved_fqdn))?;
        resolve_config(
            self.secrets.as_ref(),
            &challenge.resource_namespace,
            challenge.config.as_ref(),
        )
        .await
        .with_context(|| format!("unable to get secret `{}`", challenge.resource_namespace))
    }

    async fn find_zone(&self, config: &ResolvedConfig) -> Result<ZoneConfig> {
        let request = ZoneConfigsFindRequest::by_zone_name(config.api_key.clone(), &config.zone_name);
        let mut zone = self
            .client
            .get_zone(&request, &self.stop)
            .await
            .context(SOLVER_NAME)?;
        zone.name = config.zone_name.clone();
        Ok(zone)
    }

    async fn present_record(&self, challenge: &ChallengeRequest) -> Result<()> {
        debug!(
            "Present: namespace={}, zone={}, fqdn={}",
            challenge.resource_namespace, challenge.resolved_zone, challenge.resolved_fqdn
        );
        let config = self.resolve(challenge).await?;
        let fqdn = challenge.resolved_fqdn.as_str();
        let name = un_fqdn(fqdn);

        let zone = self.find_zone(&config).await?;
        let request = ZoneUpdateRequest {
            auth_token: config.api_key.clone(),
            zone_config: zone,
            records_to_add: vec![DnsRecord {
                record_type: DNS_RECORD_TYPE_TXT.to_string(),
                name: name.to_string(),
                content: challenge.key.clone(),
                ttl: config.ttl,
                ..Default::default()
            }],
            records_to_delete: Vec::new(),
        };
        let response = self
            .client
            .update_zone(&request)
            .await
            .context(SOLVER_NAME)?;

        let expected_name = name.to_lowercase();
        let expected_content = quote_txt(&challenge.key);
        let created = response
            .response
            .records
            .iter()
            .find(|r| r.name == expected_name && r.content == expected_content && !r.id.is_empty());

        let Some(record) = created else {
            bail!(
                "{}: error getting ID of just created record, for domain {}",
                SOLVER_NAME,
                fqdn
            );
        };
        self.records.insert(fqdn, record.id.clone());
        metrics::set_registered_records(self.records.len());

        info!("Presented txt record {} ({})", fqdn, record);
        Ok(())
    }

    async fn clean_up_record(&self, challenge: &ChallengeRequest) -> Result<()> {
        debug!(
            "CleanUp: namespace={}, zone={}, fqdn={}",
            challenge.resource_namespace, challenge.resolved_zone, challenge.resolved_fqdn
        );
        let config = self.resolve(challenge).await?;
        let fqdn = challenge.resolved_fqdn.as_str();

        let zone = self.find_zone(&config).await?;
        let request = ZoneUpdateRequest {
            auth_token: config.api_key.clone(),
            zone_config: zone,
            records_to_add: Vec::new(),
            records_to_delete: vec![DnsRecord {
                record_type: DNS_RECORD_TYPE_TXT.to_string(),
                name: un_fqdn(fqdn).to_string(),
                content: quote_txt(&challenge.key),
                ..Default::default()
            }],
        };
        self.client
            .update_zone(&request)
            .await
            .context(SOLVER_NAME)?;

        // Only forget the record once the provider confirmed the delete.
        if let Some(id) = self.records.remove(fqdn) {
            debug!("Forgot record {} for {}", id, fqdn);
        }
        metrics::set_registered_records(self.records.len());

        info!("Cleaned up txt record {}", fqdn);
        Ok(())
    }
}

#[async_trait]
impl Solver for HostingDeSolver {
    fn name(&self) -> &str {
        SOLVER_NAME
    }

    async fn present(&self, challenge: &ChallengeRequest) -> Result<()> {
        let result = self.present_record(challenge).await;
        metrics::record_challenge("present", if result.is_ok() { "ok" } else { "error" });
        result
    }

    async fn clean_up(&self, challenge: &ChallengeRequest) -> Result<()> {
        let result = self.clean_up_record(challenge).await;
        metrics::record_challenge("cleanup", if result.is_ok() { "ok" } else { "error" });
        result
    }
}

//==============================================================================
// Tests
//==============================================================================
