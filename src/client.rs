//! hosting.de DNS API client
//!
//! Uses reqwest with rustls for HTTP requests. All calls are JSON POSTs
//! carrying the API key in the request body.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::{
    DEFAULT_TIMEOUT_SECS, ENDPOINT_ZONE_CONFIGS_FIND, ENDPOINT_ZONE_UPDATE, HOSTINGDE_API_BASE,
    HOSTINGDE_USER_AGENT, ZONE_STATUS_ACTIVE,
};
use crate::error::ClientError;
use crate::metrics;
use crate::model::{
    unreadable_body_message, ZoneConfig, ZoneConfigsFindRequest, ZoneConfigsFindResponse,
    ZoneUpdateRequest, ZoneUpdateResponse,
};
use crate::retry::{retry, RetryError, RetryPolicy};

//==============================================================================
// Settings
//==============================================================================

/// Everything needed to build a client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// API base URL, without the endpoint name
    pub api_base: String,
    /// Timeout of a single HTTP attempt
    pub timeout: Duration,
    /// Backoff used while waiting for a zone to become active
    pub zone_poll: RetryPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: HOSTINGDE_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            zone_poll: RetryPolicy::default(),
        }
    }
}

//==============================================================================
// Client
//==============================================================================

pub struct HostingDeClient {
    client: reqwest::Client,
    api_base: String,
    zone_poll: RetryPolicy,
}

impl HostingDeClient {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.timeout)
            .timeout(settings.timeout)
            .user_agent(HOSTINGDE_USER_AGENT)
            .build()
            .context("build reqwest client")?;

        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            zone_poll: settings.zone_poll,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.api_base, name)
    }

    /// POSTs `request` as JSON and decodes the body into `R`
    ///
    /// The HTTP status code is not inspected: the provider reports failures
    /// through the envelope, which the callers classify.
    async fn post<Q, R>(&self, uri: &str, request: &Q) -> Result<R, ClientError>
    where
        Q: Serialize,
        R: DeserializeOwned,
    {
        let body = serde_json::to_vec(request).map_err(|source| ClientError::Encode {
            uri: uri.to_string(),
            source,
        })?;

        debug!("POST {}", uri);
        let resp = self
            .client
            .post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                uri: uri.to_string(),
                source,
            })?;
        let status = resp.status();
        let content = resp.bytes().await.map_err(|source| ClientError::Transport {
            uri: uri.to_string(),
            source,
        })?;
        debug!("{} answered {} ({} bytes)", uri, status.as_u16(), content.len());

        serde_json::from_slice(&content).map_err(|source| ClientError::Decode {
            message: unreadable_body_message(uri, &content),
            source,
        })
    }

    /// Looks up zone configurations
    ///
    /// An empty result is an error whatever the envelope status says.
    pub async fn list_zone_configs(
        &self,
        request: &ZoneConfigsFindRequest,
    ) -> Result<ZoneConfigsFindResponse, ClientError> {
        let uri = self.endpoint(ENDPOINT_ZONE_CONFIGS_FIND);
        let _timer = metrics::start_api_request_timer(ENDPOINT_ZONE_CONFIGS_FIND);

        let result = self
            .post::<_, ZoneConfigsFindResponse>(&uri, request)
            .await
            .and_then(|resp| {
                if resp.response.data.is_empty() {
                    let annotated = resp.with_warning("empty result");
                    return Err(ClientError::EmptyResult {
                        message: unreadable_body_message(&uri, annotated.to_string().as_bytes()),
                    });
                }
                if !resp.status.is_accepted() {
                    let annotated = resp.with_warning("invalid zoneConfigsFindResponse status");
                    return Err(ClientError::Status {
                        message: unreadable_body_message(&uri, annotated.to_string().as_bytes()),
                    });
                }
                Ok(resp)
            });

        observe(ENDPOINT_ZONE_CONFIGS_FIND, &result);
        result
    }

    /// Adds and deletes records in a zone
    pub async fn update_zone(
        &self,
        request: &ZoneUpdateRequest,
    ) -> Result<ZoneUpdateResponse, ClientError> {
        let uri = self.endpoint(ENDPOINT_ZONE_UPDATE);
        let _timer = metrics::start_api_request_timer(ENDPOINT_ZONE_UPDATE);

        let result = self
            .post::<_, ZoneUpdateResponse>(&uri, request)
            .await
            .and_then(|resp| {
                if !resp.status.is_accepted() {
                    let annotated = resp.with_warning("invalid updateResponse status");
                    return Err(ClientError::Status {
                        message: unreadable_body_message(&uri, annotated.to_string().as_bytes()),
                    });
                }
                Ok(resp)
            });

        observe(ENDPOINT_ZONE_UPDATE, &result);
        result
    }

    /// Finds the zone and waits until it is active
    ///
    /// A recently edited zone passes through transient states before it is
    /// served again; those are polled out with backoff. Any other failure of
    /// the lookup ends the wait immediately.
    pub async fn get_zone(
        &self,
        request: &ZoneConfigsFindRequest,
        cancel: &CancellationToken,
    ) -> Result<ZoneConfig, ClientError> {
        let zone_name = request.filter.value.as_str();
        let result = retry(
            &self.zone_poll,
            cancel,
            ClientError::is_retryable,
            move || async move {
                metrics::record_zone_poll();
                let resp = self.list_zone_configs(request).await?;
                let zone = resp.response.data.into_iter().next().ok_or_else(|| {
                    ClientError::EmptyResult {
                        message: format!("no zone config returned for {}", zone_name),
                    }
                })?;

                if zone.status != ZONE_STATUS_ACTIVE {
                    info!("Zone {} is {:?}, waiting for it to become active", zone_name, zone.status);
                    return Err(ClientError::ZoneNotActive {
                        status: zone.status,
                    });
                }
                Ok::<_, ClientError>(zone)
            },
        )
        .await;

        result.map_err(|e| match e {
            RetryError::Permanent(e) => e,
            RetryError::Exhausted {
                attempts,
                elapsed,
                last,
            } => {
                warn!("Zone {} did not become active in {:?}", zone_name, elapsed);
                ClientError::Exhausted {
                    attempts,
                    elapsed,
                    last: Box::new(last),
                }
            }
            RetryError::Cancelled => ClientError::Cancelled,
        })
    }
}

fn observe<T>(endpoint: &str, result: &Result<T, ClientError>) {
    match result {
        Ok(_) => metrics::record_api_request(endpoint, "ok"),
        Err(e) => {
            warn!("{} failed ({}): {}", endpoint, e.kind(), e);
            metrics::record_api_request(endpoint, e.kind());
        }
    }
}

//==============================================================================
// Tests
//==============================================================================
