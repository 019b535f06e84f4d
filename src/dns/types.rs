/// Parameter types for DNS zone operations.
use serde::{Deserialize, Serialize};

/// Parameters for creating a zone.
///
/// Used by [`DnsTools::create_zone`](crate::dns::DnsTools::create_zone).
///
/// # Examples
///
/// ```
/// use vpsctl::dns::types::CreateZoneArgs;
///
/// let args = CreateZoneArgs {
///     domain: "example.com".to_string(),
///     ip: "203.0.113.10".to_string(),
/// };
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateZoneArgs {
    /// Zone apex
    pub domain: String,
    /// Address for the apex, `www`, `ns1`, `ns2` and `mail` records
    pub ip: String,
}

/// Parameters for adding a record to an existing zone.
///
/// # Examples
///
/// ```
/// use vpsctl::dns::types::AddRecordArgs;
///
/// let args = AddRecordArgs {
///     name: "www2".to_string(),
///     ttl: None,
///     record_type: "A".to_string(),
///     value: "198.51.100.7".to_string(),
/// };
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AddRecordArgs {
    pub name: String,
    /// Defaults to 3600
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
}

/// Parameters for deleting records by structure.
///
/// Without `value`, every record with the given name and type is removed.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteRecordArgs {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneSummary {
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordChange {
    pub domain: String,
    pub serial: u64,
    /// Lines added or removed
    pub affected: usize,
}
