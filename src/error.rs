//! Error types of the hosting.de API client

use std::time::Duration;

use thiserror::Error;

/// Failures of a call against the hosting.de API
///
/// Transport and decode failures are kept apart: a body that no longer
/// decodes usually means the provider changed its API, which retrying
/// will not fix.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP exchange itself failed
    #[error("error querying API {uri}: {source}")]
    Transport {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request could not be serialized
    #[error("failed to encode request for {uri}: {source}")]
    Encode {
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    /// The body did not match the expected response shape
    #[error("{source}: {message}")]
    Decode {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// A lookup returned no entries
    #[error("{message}")]
    EmptyResult { message: String },

    /// The response status was neither `success` nor `pending`
    #[error("{message}")]
    Status { message: String },

    /// The zone exists but is not serving yet
    #[error("unexpected zone status: {status:?}")]
    ZoneNotActive { status: String },

    /// The zone never became active within the polling budget
    #[error("zone not active after {attempts} attempts in {elapsed:?}: {last}")]
    Exhausted {
        attempts: u32,
        elapsed: Duration,
        last: Box<ClientError>,
    },

    /// Polling was stopped by shutdown
    #[error("zone lookup cancelled")]
    Cancelled,
}

impl ClientError {
    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Transport { .. } => "transport",
            ClientError::Encode { .. } => "encode",
            ClientError::Decode { .. } => "decode",
            ClientError::EmptyResult { .. } => "empty_result",
            ClientError::Status { .. } => "status",
            ClientError::ZoneNotActive { .. } => "zone_not_active",
            ClientError::Exhausted { .. } => "exhausted",
            ClientError::Cancelled => "cancelled",
        }
    }

    /// Only a zone that is still settling is worth polling again
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::ZoneNotActive { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_inactive_zone_is_retryable() {
        let inactive = ClientError::ZoneNotActive {
            status: "edited".to_string(),
        };
        assert!(inactive.is_retryable());
        assert!(!ClientError::Status {
            message: "bad".to_string()
        }
        .is_retryable());
        assert!(!ClientError::Cancelled.is_retryable());
    }

    #[test]
    fn test_exhausted_message_includes_last_error() {
        let err = ClientError::Exhausted {
            attempts: 4,
            elapsed: Duration::from_secs(300),
            last: Box::new(ClientError::ZoneNotActive {
                status: "blocked".to_string(),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("4 attempts"));
        assert!(msg.contains("\"blocked\""));
        assert_eq!(err.kind(), "exhausted");
    }

    #[test]
    fn test_decode_message_carries_body() {
        let source = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        let err = ClientError::Decode {
            message: "the request u sent a response with a body which is an invalid format: \"nope\""
                .to_string(),
            source,
        };
        assert!(err.to_string().contains("\"nope\""));
        assert_eq!(err.kind(), "decode");
    }
}
