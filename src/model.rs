//! Wire shapes of the hosting.de DNS JSON API
//!
//! Only the two calls the solver needs are modelled: `zoneConfigsFind` and
//! `zoneUpdate`. Every response shares the same envelope (errors, warnings,
//! status, metadata). The `Display` rendering of a response drops the
//! metadata block so that two identical provider errors render byte-identical
//! diagnostics regardless of their transaction identifiers.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::constants::ZONE_FILTER_FIELD;

//==============================================================================
// Credentials
//==============================================================================

/// hosting.de API key, sent as `authToken` on every request
///
/// The key is wiped from memory on drop and never shows up in `Debug` output.
#[derive(Clone)]
pub struct ApiKey(Zeroizing<String>);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Zeroizing::new(key.into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***REDACTED***)")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

//==============================================================================
// Envelope
//==============================================================================

/// Outcome reported in the `status` field of every response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResponseStatus {
    Success,
    Pending,
    /// Anything else, including `error` and an absent status
    Other(String),
}

impl ResponseStatus {
    /// Whether the call went through (`success` or `pending`)
    pub fn is_accepted(&self) -> bool {
        matches!(self, ResponseStatus::Success | ResponseStatus::Pending)
    }
}

impl Default for ResponseStatus {
    fn default() -> Self {
        ResponseStatus::Other(String::new())
    }
}

impl From<String> for ResponseStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "success" => ResponseStatus::Success,
            "pending" => ResponseStatus::Pending,
            _ => ResponseStatus::Other(value),
        }
    }
}

impl From<ResponseStatus> for String {
    fn from(value: ResponseStatus) -> Self {
        match value {
            ResponseStatus::Success => "success".to_string(),
            ResponseStatus::Pending => "pending".to_string(),
            ResponseStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Success => f.write_str("success"),
            ResponseStatus::Pending => f.write_str("pending"),
            ResponseStatus::Other(s) => f.write_str(s),
        }
    }
}

/// Structured error entry of a response envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiError {
    #[serde(deserialize_with = "nullable")]
    pub code: i64,
    #[serde(deserialize_with = "nullable")]
    pub context_object: String,
    #[serde(deserialize_with = "nullable")]
    pub context_path: String,
    #[serde(deserialize_with = "nullable")]
    pub text: String,
    #[serde(deserialize_with = "nullable")]
    pub value: String,
    #[serde(deserialize_with = "nullable")]
    pub details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiErrorDetail {
    #[serde(deserialize_with = "nullable")]
    pub key: String,
    pub value: serde_json::Value,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.text)
    }
}

/// Transaction identifiers; decoded but never rendered
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    #[serde(deserialize_with = "nullable")]
    pub client_transaction_id: String,
    #[serde(deserialize_with = "nullable")]
    pub server_transaction_id: String,
}

/// The envelope alone, used when a body does not fit its expected shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseResponse {
    #[serde(deserialize_with = "nullable")]
    pub errors: Vec<ApiError>,
    #[serde(deserialize_with = "nullable", skip_serializing)]
    pub metadata: Metadata,
    #[serde(deserialize_with = "nullable")]
    pub warnings: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub status: ResponseStatus,
}

/// A full response: the envelope plus the call specific payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiResponse<T> {
    #[serde(deserialize_with = "nullable")]
    pub errors: Vec<ApiError>,
    #[serde(deserialize_with = "nullable", skip_serializing)]
    pub metadata: Metadata,
    #[serde(deserialize_with = "nullable")]
    pub warnings: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub status: ResponseStatus,
    #[serde(
        deserialize_with = "nullable",
        bound(deserialize = "T: Deserialize<'de> + Default")
    )]
    pub response: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Copy of the response carrying one more warning, used to annotate
    /// diagnostics without touching the original
    pub fn with_warning(&self, warning: &str) -> Self
    where
        T: Clone,
    {
        let mut annotated = self.clone();
        annotated.warnings.push(warning.to_string());
        annotated
    }
}

impl<T: Serialize> fmt::Display for ApiResponse<T> {
    /// JSON of `{errors, warnings, status, response}`; metadata is skipped
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Treats an explicit JSON `null` like a missing field
///
/// hosting.de sends `null` for unset scalars (`priority`, `recordTemplateId`)
/// as well as for the payload of some error responses.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Renders a diagnostic for a body that could not be used as-is
///
/// If the body still decodes as an envelope carrying errors, that envelope is
/// rendered. Otherwise the raw body is quoted verbatim.
pub fn unreadable_body_message(uri: &str, raw_body: &[u8]) -> String {
    if let Ok(base) = serde_json::from_slice::<BaseResponse>(raw_body) {
        if !base.errors.is_empty() {
            if let Ok(clean) = serde_json::to_string(&base) {
                return format!("the request {} sent a response with errors: {:?}", uri, clean);
            }
        }
    }

    format!(
        "the request {} sent a response with a body which is an invalid format: {:?}",
        uri,
        String::from_utf8_lossy(raw_body)
    )
}

//==============================================================================
// Zones and records
//==============================================================================

/// Field/value filter of a find request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sort {
    pub field: String,
    pub order: String,
}

/// SOA timings of a zone, in seconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoaValues {
    #[serde(deserialize_with = "nullable")]
    pub refresh: u32,
    #[serde(deserialize_with = "nullable")]
    pub retry: u32,
    #[serde(deserialize_with = "nullable")]
    pub expire: u32,
    #[serde(deserialize_with = "nullable")]
    pub ttl: u32,
    #[serde(deserialize_with = "nullable")]
    pub negative_ttl: u32,
}

/// Zone configuration as returned by `zoneConfigsFind`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoneConfig {
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub account_id: String,
    #[serde(deserialize_with = "nullable")]
    pub status: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub name_unicode: String,
    #[serde(deserialize_with = "nullable")]
    pub master_ip: String,
    #[serde(deserialize_with = "nullable", rename = "type")]
    pub zone_type: String,
    #[serde(deserialize_with = "nullable")]
    pub email_address: String,
    #[serde(deserialize_with = "nullable")]
    pub zone_transfer_whitelist: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub last_change_date: String,
    #[serde(deserialize_with = "nullable")]
    pub dns_server_group_id: String,
    #[serde(deserialize_with = "nullable")]
    pub dns_sec_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soa_values: Option<SoaValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_values: Option<serde_json::Value>,
}

/// DNS resource record; `id` stays empty until the provider assigns one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsRecord {
    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub zone_id: String,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub record_template_id: String,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(
        deserialize_with = "nullable",
        rename = "type",
        skip_serializing_if = "String::is_empty"
    )]
    pub record_type: String,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "is_zero")]
    pub ttl: u32,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "is_zero")]
    pub priority: u32,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub last_change_date: String,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DNS {} {} -> {} (TTL: {}, ID: {})",
            self.record_type,
            self.name,
            self.content,
            self.ttl,
            if self.id.is_empty() { "-" } else { &self.id }
        )
    }
}

/// A zone with its records, as returned by `zoneUpdate`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Zone {
    #[serde(deserialize_with = "nullable")]
    pub records: Vec<DnsRecord>,
    #[serde(deserialize_with = "nullable")]
    pub zone_config: ZoneConfig,
}

/// One page of `zoneConfigsFind` results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoneConfigsPage {
    #[serde(deserialize_with = "nullable")]
    pub limit: u32,
    #[serde(deserialize_with = "nullable")]
    pub page: u32,
    #[serde(deserialize_with = "nullable")]
    pub total_entries: u32,
    #[serde(deserialize_with = "nullable")]
    pub total_pages: u32,
    #[serde(deserialize_with = "nullable", rename = "type")]
    pub page_type: String,
    #[serde(deserialize_with = "nullable")]
    pub data: Vec<ZoneConfig>,
}

//==============================================================================
// Requests and responses
//==============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneConfigsFindRequest {
    pub auth_token: ApiKey,
    pub filter: Filter,
    pub limit: u32,
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
}

impl ZoneConfigsFindRequest {
    /// Request for the first zone whose name equals `zone_name`
    pub fn by_zone_name(auth_token: ApiKey, zone_name: &str) -> Self {
        Self {
            auth_token,
            filter: Filter {
                field: ZONE_FILTER_FIELD.to_string(),
                value: zone_name.to_string(),
            },
            limit: 1,
            page: 1,
            sort: None,
        }
    }
}

pub type ZoneConfigsFindResponse = ApiResponse<ZoneConfigsPage>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneUpdateRequest {
    pub auth_token: ApiKey,
    pub zone_config: ZoneConfig,
    pub records_to_add: Vec<DnsRecord>,
    pub records_to_delete: Vec<DnsRecord>,
}

pub type ZoneUpdateResponse = ApiResponse<Zone>;

//==============================================================================
// Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FIND_RESPONSE: &str = r#"{
        "errors": [],
        "metadata": {"clientTransactionId": "", "serverTransactionId": "srv-1"},
        "warnings": [],
        "status": "success",
        "response": {
            "limit": 1, "page": 1, "totalEntries": 1, "totalPages": 1,
            "type": "FindZoneConfigsResult",
            "data": [{
                "id": "zone-id", "accountId": "acc-id", "status": "active",
                "name": "example.com", "nameUnicode": "example.com",
                "masterIp": "", "type": "NATIVE", "emailAddress": "",
                "zoneTransferWhitelist": [], "lastChangeDate": "2024-01-01T00:00:00Z",
                "dnsServerGroupId": "1", "dnsSecMode": "off",
                "soaValues": {"refresh": 86400, "retry": 7200, "expire": 3600000, "ttl": 172800, "negativeTtl": 3600},
                "templateValues": null
            }]
        }
    }"#;

    #[test]
    fn test_find_response_parsing() {
        let resp: ZoneConfigsFindResponse = serde_json::from_str(FIND_RESPONSE).unwrap();
        assert_eq!(resp.status, ResponseStatus::Success);
        assert_eq!(resp.metadata.server_transaction_id, "srv-1");
        assert_eq!(resp.response.data.len(), 1);
        let zone = &resp.response.data[0];
        assert_eq!(zone.id, "zone-id");
        assert_eq!(zone.status, "active");
        assert_eq!(zone.soa_values.as_ref().map(|s| s.negative_ttl), Some(3600));
    }

    #[test]
    fn test_status_classification() {
        assert!(ResponseStatus::from("success".to_string()).is_accepted());
        assert!(ResponseStatus::from("pending".to_string()).is_accepted());
        assert!(!ResponseStatus::from("error".to_string()).is_accepted());
        assert!(!ResponseStatus::default().is_accepted());
        assert_eq!(String::from(ResponseStatus::from("error".to_string())), "error");
    }

    #[test]
    fn test_display_skips_transaction_ids() {
        let a = r#"{"errors":[{"code":10205,"text":"Zone not found"}],
            "metadata":{"clientTransactionId":"c-1","serverTransactionId":"s-1"},
            "warnings":["w"],"status":"error","response":{"records":[],"zoneConfig":{}}}"#;
        let b = r#"{"errors":[{"code":10205,"text":"Zone not found"}],
            "metadata":{"clientTransactionId":"c-2","serverTransactionId":"s-2"},
            "warnings":["w"],"status":"error","response":{"records":[],"zoneConfig":{}}}"#;

        let a: ZoneUpdateResponse = serde_json::from_str(a).unwrap();
        let b: ZoneUpdateResponse = serde_json::from_str(b).unwrap();
        assert_ne!(a.metadata, b.metadata);

        let rendered = a.to_string();
        assert_eq!(rendered, b.to_string());
        assert_eq!(rendered, a.to_string());
        assert!(!rendered.contains("metadata"));
        assert!(!rendered.contains("s-1"));
        assert!(rendered.contains("Zone not found"));
    }

    #[test]
    fn test_with_warning_leaves_original() {
        let resp: ZoneConfigsFindResponse = serde_json::from_str(FIND_RESPONSE).unwrap();
        let annotated = resp.with_warning("empty result");
        assert!(resp.warnings.is_empty());
        assert_eq!(annotated.warnings, vec!["empty result".to_string()]);
    }

    #[test]
    fn test_null_lists_decode_as_empty() {
        let json = r#"{"errors":null,"warnings":null,"status":"success",
            "response":{"records":null,"zoneConfig":{"zoneTransferWhitelist":null}}}"#;
        let resp: ZoneUpdateResponse = serde_json::from_str(json).unwrap();
        assert!(resp.errors.is_empty());
        assert!(resp.response.records.is_empty());
    }

    #[test]
    fn test_null_scalars_decode_as_zero_values() {
        let json = r#"{"errors":[],"metadata":{"clientTransactionId":null,"serverTransactionId":"s-1"},
            "warnings":[],"status":"success",
            "response":{"records":[{"id":"rec-1","zoneId":"zone-1","recordTemplateId":null,
                "name":"_acme-challenge.example.com","type":"TXT","content":"\"abc123\"",
                "ttl":120,"priority":null,"lastChangeDate":null}],
            "zoneConfig":{"id":"zone-1","masterIp":null,"soaValues":{"refresh":null,"ttl":3600}}}}"#;
        let resp: ZoneUpdateResponse = serde_json::from_str(json).unwrap();

        let record = &resp.response.records[0];
        assert_eq!(record.id, "rec-1");
        assert_eq!(record.record_template_id, "");
        assert_eq!(record.priority, 0);
        assert_eq!(record.last_change_date, "");
        assert_eq!(resp.response.zone_config.master_ip, "");
        assert_eq!(
            resp.response.zone_config.soa_values,
            Some(SoaValues {
                ttl: 3600,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_null_response_and_status_in_error_envelope() {
        let json = r#"{"errors":[{"code":10205,"contextObject":null,"text":"Zone is blocked","value":null,"details":null}],
            "metadata":null,"warnings":[],"status":"error","response":null}"#;
        let resp: ZoneUpdateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.status, ResponseStatus::Other("error".to_string()));
        assert_eq!(resp.errors[0].to_string(), "[10205] Zone is blocked");
        assert_eq!(resp.response, Zone::default());

        let resp: ZoneConfigsFindResponse =
            serde_json::from_str(r#"{"errors":null,"status":null,"response":null}"#).unwrap();
        assert!(!resp.status.is_accepted());
        assert!(resp.response.data.is_empty());
    }

    #[test]
    fn test_unreadable_body_with_errors_renders_envelope() {
        let body = br#"{"errors":[{"code":10100,"text":"Authentication failed"}],
            "metadata":{"serverTransactionId":"s-9"},"status":"error","response":"bogus"}"#;
        let msg = unreadable_body_message("https://api/zoneUpdate", body);
        assert!(msg.starts_with("the request https://api/zoneUpdate sent a response with errors:"));
        assert!(msg.contains("Authentication failed"));
        assert!(!msg.contains("s-9"));
    }

    #[test]
    fn test_unreadable_body_falls_back_to_raw() {
        let msg = unreadable_body_message("https://api/zoneUpdate", b"<html>Bad Gateway</html>");
        assert_eq!(
            msg,
            "the request https://api/zoneUpdate sent a response with a body which is an invalid format: \"<html>Bad Gateway</html>\""
        );

        let msg = unreadable_body_message("u", br#"{"errors":[],"status":"error"}"#);
        assert!(msg.contains("invalid format"));
    }

    #[test]
    fn test_record_serialization_omits_empty_fields() {
        let record = DnsRecord {
            name: "_acme-challenge.example.com".to_string(),
            record_type: "TXT".to_string(),
            content: "\"abc123\"".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "_acme-challenge.example.com",
                "type": "TXT",
                "content": "\"abc123\""
            })
        );
    }

    #[test]
    fn test_find_request_shape() {
        let req = ZoneConfigsFindRequest::by_zone_name(ApiKey::new("secret-key"), "example.com");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["authToken"], "secret-key");
        assert_eq!(json["filter"]["field"], "zoneName");
        assert_eq!(json["filter"]["value"], "example.com");
        assert_eq!(json["limit"], 1);
        assert_eq!(json["page"], 1);
        assert!(json.get("sort").is_none());
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("super-secret");
        let s = format!("{:?}", key);
        assert!(!s.contains("super-secret"));
        assert!(s.contains("REDACTED"));
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError {
            code: 10205,
            text: "Zone not found".to_string(),
            ..Default::default()
        };
        assert_eq!(format!("{}", err), "[10205] Zone not found");
    }
}
