//! Prometheus metrics collection for hostingde-webhook
//!
//! This module provides metrics collection for monitoring challenge handling
//! and the traffic sent to the hosting.de API.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram_vec, Counter,
    CounterVec, Gauge, HistogramVec,
};

//==============================================================================
// Metrics
//==============================================================================

lazy_static! {
    /// Total number of handled challenges
    pub static ref CHALLENGES_TOTAL: CounterVec = register_counter_vec!(
        "hostingde_webhook_challenges_total",
        "Total number of handled ACME challenges",
        &["action", "outcome"]
    )
    .unwrap();

    /// Total number of hosting.de API requests
    pub static ref API_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "hostingde_webhook_api_requests_total",
        "Total number of hosting.de API requests",
        &["endpoint", "outcome"]
    )
    .unwrap();

    /// API request duration histogram
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "hostingde_webhook_api_request_duration_seconds",
        "hosting.de API request duration in seconds",
        &["endpoint"]
    )
    .unwrap();

    /// Zone lookups made while waiting for a zone to become active
    pub static ref ZONE_POLL_ATTEMPTS_TOTAL: Counter = register_counter!(
        "hostingde_webhook_zone_poll_attempts_total",
        "Zone lookups made while waiting for zone activation"
    )
    .unwrap();

    /// Number of record IDs currently tracked
    pub static ref REGISTERED_RECORDS: Gauge = register_gauge!(
        "hostingde_webhook_registered_records",
        "Number of presented challenge records currently tracked"
    )
    .unwrap();
}

//==============================================================================
// Public Functions
//==============================================================================

/// Records the outcome of a Present or CleanUp call
///
/// # Arguments
///
/// * `action` - "present" or "cleanup"
/// * `outcome` - "ok" or "error"
pub fn record_challenge(action: &str, outcome: &str) {
    CHALLENGES_TOTAL.with_label_values(&[action, outcome]).inc();
}

/// Records an API request and its outcome (`ok` or an error kind)
pub fn record_api_request(endpoint: &str, outcome: &str) {
    API_REQUESTS_TOTAL
        .with_label_values(&[endpoint, outcome])
        .inc();
}

/// Starts a timer for an API request
pub fn start_api_request_timer(endpoint: &str) -> HistogramTimer {
    API_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint])
        .start_timer()
}

/// Records one zone lookup made while waiting for activation
pub fn record_zone_poll() {
    ZONE_POLL_ATTEMPTS_TOTAL.inc();
}

/// Sets the number of tracked record IDs
pub fn set_registered_records(count: usize) {
    REGISTERED_RECORDS.set(count as f64);
}

/// Collects all metrics and returns them as text
///
/// # Returns
///
/// Returns the metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

//==============================================================================
// Types
//==============================================================================

/// Histogram timer for measuring duration
pub type HistogramTimer = prometheus::HistogramTimer;

//==============================================================================
// Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_challenge() {
        record_challenge("present", "ok");
        assert!(CHALLENGES_TOTAL
            .get_metric_with_label_values(&["present", "ok"])
            .is_ok());
    }

    #[test]
    fn test_record_api_request() {
        record_api_request("zoneUpdate", "status");
        assert!(API_REQUESTS_TOTAL
            .get_metric_with_label_values(&["zoneUpdate", "status"])
            .is_ok());
    }

    #[test]
    fn test_zone_poll_counter_increases() {
        let before = ZONE_POLL_ATTEMPTS_TOTAL.get();
        record_zone_poll();
        assert!(ZONE_POLL_ATTEMPTS_TOTAL.get() >= before + 1.0);
    }

    #[test]
    fn test_gather_metrics() {
        record_challenge("cleanup", "ok");
        record_api_request("zoneConfigsFind", "ok");
        set_registered_records(0);
        let metrics = gather_metrics();
        assert!(metrics.contains("hostingde_webhook_challenges_total"));
        assert!(metrics.contains("hostingde_webhook_api_requests_total"));
        assert!(metrics.contains("hostingde_webhook_registered_records"));
    }
}
