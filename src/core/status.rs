use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Status a reviewer may move a domain into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewStatus {
    #[default]
    Reviewed,
    Escalated,
    Suspended,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 3] = [
        ReviewStatus::Reviewed,
        ReviewStatus::Escalated,
        ReviewStatus::Suspended,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Reviewed => "REVIEWED",
            ReviewStatus::Escalated => "ESCALATED",
            ReviewStatus::Suspended => "SUSPENDED",
        }
    }

    pub fn next(self) -> Self {
        match self {
            ReviewStatus::Reviewed => ReviewStatus::Escalated,
            ReviewStatus::Escalated => ReviewStatus::Suspended,
            ReviewStatus::Suspended => ReviewStatus::Reviewed,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ReviewStatus::Reviewed => ReviewStatus::Suspended,
            ReviewStatus::Escalated => ReviewStatus::Reviewed,
            ReviewStatus::Suspended => ReviewStatus::Escalated,
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_uppercase().as_str() {
            "REVIEWED" => Ok(ReviewStatus::Reviewed),
            "ESCALATED" => Ok(ReviewStatus::Escalated),
            "SUSPENDED" => Ok(ReviewStatus::Suspended),
            _ => Err(format!(
                "invalid status: {s} (expected REVIEWED|ESCALATED|SUSPENDED)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status_id: i64,
    pub new_status: ReviewStatus,
    pub reviewer_initials: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(with = "crate::core::timestamp::instant")]
    pub created_at: OffsetDateTime,
}

/// Body of `POST /domains/{domain_name}/status`. `notes` is sent as `null` when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub new_status: ReviewStatus,
    pub reviewer_initials: String,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_notes_serialize_as_null() {
        let body = StatusUpdate {
            new_status: ReviewStatus::Escalated,
            reviewer_initials: "SD".to_string(),
            notes: None,
        };
        let v = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            v,
            serde_json::json!({
                "new_status": "ESCALATED",
                "reviewer_initials": "SD",
                "notes": null
            })
        );
    }

    #[test]
    fn history_entry_accepts_missing_notes() {
        let entry: StatusHistoryEntry = serde_json::from_value(serde_json::json!({
            "status_id": 3,
            "new_status": "SUSPENDED",
            "reviewer_initials": "AB",
            "created_at": "2025-09-19T08:40:00Z"
        }))
        .expect("deserialize");
        assert_eq!(entry.notes, None);
        assert_eq!(entry.new_status, ReviewStatus::Suspended);
    }
}
