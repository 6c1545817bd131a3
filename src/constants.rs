//! Common constants used throughout the hostingde-webhook application

//==============================================================================
// hosting.de API Constants
//==============================================================================

/// hosting.de DNS API base URL
pub const HOSTINGDE_API_BASE: &str = "https://secure.hosting.de/api/dns/v1/json";

/// Endpoint used to look up zone configurations
pub const ENDPOINT_ZONE_CONFIGS_FIND: &str = "zoneConfigsFind";

/// Endpoint used to add and delete records in a zone
pub const ENDPOINT_ZONE_UPDATE: &str = "zoneUpdate";

/// User agent string for hosting.de API requests
pub const HOSTINGDE_USER_AGENT: &str = "hostingde-webhook/1.0";

/// DNS record type for ACME challenges
pub const DNS_RECORD_TYPE_TXT: &str = "TXT";

/// Zone status required before records can be changed
pub const ZONE_STATUS_ACTIVE: &str = "active";

/// Filter field used to locate a zone by name
pub const ZONE_FILTER_FIELD: &str = "zoneName";

//==============================================================================
// Solver Constants
//==============================================================================

/// Name the solver registers under with the host runtime
pub const SOLVER_NAME: &str = "hostingde";

/// Key inside the credentials secret holding the API key
pub const SECRET_API_KEY: &str = "api-key";

/// API version of the challenge payload exchanged with the host runtime
pub const CHALLENGE_API_VERSION: &str = "acme.cert-manager.io/v1alpha1";

/// Kind of the challenge payload exchanged with the host runtime
pub const CHALLENGE_KIND: &str = "ChallengePayload";

//==============================================================================
// Timeout and Interval Constants
//==============================================================================

/// Default HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Minimum HTTP request timeout in seconds
pub const MIN_TIMEOUT_SECS: u64 = 1;

/// Maximum HTTP request timeout in seconds
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Default initial interval of the zone activation wait in seconds
pub const DEFAULT_ZONE_POLL_INTERVAL_SECS: u64 = 3;

/// Minimum initial interval of the zone activation wait in seconds
pub const MIN_ZONE_POLL_INTERVAL_SECS: u64 = 1;

/// Maximum initial interval of the zone activation wait in seconds
pub const MAX_ZONE_POLL_INTERVAL_SECS: u64 = 60;

//==============================================================================
// Backoff Constants
//==============================================================================

/// Maximum retry interval as a multiple of the initial interval
pub const BACKOFF_MAX_INTERVAL_FACTOR: u32 = 10;

/// Elapsed-time budget as a multiple of the initial interval
pub const BACKOFF_MAX_ELAPSED_FACTOR: u32 = 100;

/// Growth factor applied to the retry interval after each attempt
pub const BACKOFF_MULTIPLIER: f64 = 1.5;

//==============================================================================
// Server Defaults
//==============================================================================

/// Default listen address of the webhook server
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8443";

/// Default directory holding mounted credential secrets
pub const DEFAULT_SECRETS_DIR: &str = "/var/run/secrets/hostingde";

/// Default config file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hostingde-webhook/config.toml";

//==============================================================================
// Validation Constants
//==============================================================================

/// Maximum DNS name length in characters
pub const MAX_DOMAIN_NAME_LENGTH: usize = 253;

/// Maximum DNS label length in characters
pub const MAX_LABEL_LENGTH: usize = 63;

//==============================================================================
// Environment Variable Names
//==============================================================================

/// Environment variable selecting the API group the webhook registers under
pub const ENV_GROUP_NAME: &str = "GROUP_NAME";

/// Environment variable for the listen address
pub const ENV_LISTEN_ADDR: &str = "HOSTINGDE_LISTEN_ADDR";

/// Environment variable overriding the API base URL
pub const ENV_API_BASE: &str = "HOSTINGDE_API_BASE";

/// Environment variable for the HTTP timeout in seconds
pub const ENV_TIMEOUT: &str = "HOSTINGDE_TIMEOUT";

/// Environment variable for the zone activation poll interval in seconds
pub const ENV_ZONE_POLL_INTERVAL: &str = "HOSTINGDE_ZONE_POLL_INTERVAL";

/// Environment variable for the mounted secrets directory
pub const ENV_SECRETS_DIR: &str = "HOSTINGDE_SECRETS_DIR";

/// Environment variable enabling verbose logging
pub const ENV_VERBOSE: &str = "HOSTINGDE_VERBOSE";
