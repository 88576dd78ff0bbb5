use serde::{Deserialize, Serialize};

use crate::core::{Report, StatusHistoryEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<i64>,
    pub domain_name: String,
    pub current_status: String,
}

/// Aggregate returned by `GET /report/{domain_name}`. Always replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDetail {
    pub domain: Domain,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub status_history: Vec<StatusHistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
