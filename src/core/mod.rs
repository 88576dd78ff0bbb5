mod abuse;
mod domain;
mod report;
mod risk;
mod status;
pub mod timestamp;

pub use abuse::AbuseType;
pub use domain::{Domain, DomainDetail, HealthStatus};
pub use report::{NewReport, Report};
pub use risk::RiskLevel;
pub use status::{ReviewStatus, StatusHistoryEntry, StatusUpdate};
