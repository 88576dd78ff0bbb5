use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::{AbuseType, RiskLevel};

/// One abuse submission as returned by the API.
///
/// The list and detail endpoints omit `reporter_source` and `confidence_score`,
/// so both decode as optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub report_id: i64,
    pub domain_name: String,
    pub abuse_type: AbuseType,
    pub risk_level: RiskLevel,
    #[serde(with = "crate::core::timestamp::instant")]
    pub reported_timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<u8>,
}

/// Body of `POST /report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReport {
    pub domain_name: String,
    pub reporter_source: String,
    pub abuse_type: AbuseType,
    #[serde(serialize_with = "crate::core::timestamp::instant::serialize")]
    pub timestamp: OffsetDateTime,
    pub confidence_score: u8,
}
