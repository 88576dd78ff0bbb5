use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use time::Date;

use crate::api::{ApiClient, ApiError};
use crate::core::timestamp::{day_end, day_start};
use crate::core::{Report, RiskLevel};

pub const LOAD_FAILED: &str = "Failed to load reports";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionState {
    Loading,
    Loaded(Vec<Report>),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiskFilter {
    #[default]
    All,
    Only(RiskLevel),
}

impl RiskFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskFilter::All => "ALL",
            RiskFilter::Only(level) => level.as_str(),
        }
    }

    /// ALL -> HIGH -> MEDIUM -> LOW -> ALL.
    pub fn next(self) -> Self {
        match self {
            RiskFilter::All => RiskFilter::Only(RiskLevel::High),
            RiskFilter::Only(RiskLevel::High) => RiskFilter::Only(RiskLevel::Medium),
            RiskFilter::Only(RiskLevel::Medium) => RiskFilter::Only(RiskLevel::Low),
            RiskFilter::Only(RiskLevel::Low) => RiskFilter::All,
        }
    }

    fn matches(self, level: RiskLevel) -> bool {
        match self {
            RiskFilter::All => true,
            RiskFilter::Only(wanted) => wanted == level,
        }
    }
}

impl fmt::Display for RiskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(RiskFilter::All);
        }
        s.parse::<RiskLevel>()
            .map(RiskFilter::Only)
            .map_err(|_| format!("invalid risk filter: {} (expected ALL|HIGH|MEDIUM|LOW)", s.trim()))
    }
}

/// Conjunctive filter set. Defaults match every row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportFilters {
    pub domain: String,
    pub risk: RiskFilter,
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl ReportFilters {
    pub fn is_active(&self) -> bool {
        !self.domain.trim().is_empty()
            || self.risk != RiskFilter::All
            || self.from.is_some()
            || self.to.is_some()
    }

    pub fn matches(&self, report: &Report) -> bool {
        let needle = self.domain.trim().to_lowercase();
        if !needle.is_empty() && !report.domain_name.to_lowercase().contains(&needle) {
            return false;
        }
        if !self.risk.matches(report.risk_level) {
            return false;
        }
        if let Some(from) = self.from {
            if report.reported_timestamp < day_start(from) {
                return false;
            }
        }
        if let Some(to) = self.to {
            if report.reported_timestamp > day_end(to) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    DomainName,
    AbuseType,
    RiskLevel,
    ReportedTimestamp,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::DomainName,
        SortKey::AbuseType,
        SortKey::RiskLevel,
        SortKey::ReportedTimestamp,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            SortKey::DomainName => "domain_name",
            SortKey::AbuseType => "abuse_type",
            SortKey::RiskLevel => "risk_level",
            SortKey::ReportedTimestamp => "reported_timestamp",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SortKey::DomainName => "Domain",
            SortKey::AbuseType => "Abuse",
            SortKey::RiskLevel => "Risk",
            SortKey::ReportedTimestamp => "Reported At (UTC)",
        }
    }

    fn compare(self, a: &Report, b: &Report) -> Ordering {
        match self {
            SortKey::DomainName => a
                .domain_name
                .to_lowercase()
                .cmp(&b.domain_name.to_lowercase()),
            SortKey::AbuseType => a.abuse_type.as_str().cmp(b.abuse_type.as_str()),
            SortKey::RiskLevel => a.risk_level.as_str().cmp(b.risk_level.as_str()),
            SortKey::ReportedTimestamp => a.reported_timestamp.cmp(&b.reported_timestamp),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "domain_name" | "domain" => Ok(SortKey::DomainName),
            "abuse_type" | "abuse" => Ok(SortKey::AbuseType),
            "risk_level" | "risk" => Ok(SortKey::RiskLevel),
            "reported_timestamp" | "reported" | "timestamp" => Ok(SortKey::ReportedTimestamp),
            _ => Err(format!(
                "invalid sort key: {s} (expected domain_name|abuse_type|risk_level|reported_timestamp)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub const fn arrow(self) -> &'static str {
        match self {
            SortDirection::Asc => "↑",
            SortDirection::Desc => "↓",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::ReportedTimestamp,
            direction: SortDirection::Desc,
        }
    }
}

impl SortState {
    /// Same key flips direction; a new key starts ascending.
    pub fn toggle(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.flipped();
        } else {
            self.key = key;
            self.direction = SortDirection::Asc;
        }
    }

    pub fn compare(&self, a: &Report, b: &Report) -> Ordering {
        let ord = self.key.compare(a, b);
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Filtered, sorted view over `rows`. Stable; equal keys keep their fetched order.
pub fn project<'a>(rows: &'a [Report], filters: &ReportFilters, sort: &SortState) -> Vec<&'a Report> {
    let mut out: Vec<&Report> = rows.iter().filter(|r| filters.matches(r)).collect();
    out.sort_by(|a, b| sort.compare(a, b));
    out
}

/// The report table: one fetch on activation, then local filtering and sorting only.
#[derive(Debug, Clone)]
pub struct ReportCollection {
    state: CollectionState,
    pub filters: ReportFilters,
    pub sort: SortState,
}

impl Default for ReportCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportCollection {
    pub fn new() -> Self {
        Self {
            state: CollectionState::Loading,
            filters: ReportFilters::default(),
            sort: SortState::default(),
        }
    }

    pub fn state(&self) -> &CollectionState {
        &self.state
    }

    pub fn begin_load(&mut self) {
        self.state = CollectionState::Loading;
    }

    pub fn finish_load(&mut self, result: Result<Vec<Report>, ApiError>) {
        self.state = match result {
            Ok(rows) => {
                tracing::debug!(rows = rows.len(), "reports loaded");
                CollectionState::Loaded(rows)
            }
            Err(err) => {
                tracing::warn!(error = %err, "listing reports failed");
                CollectionState::Error(LOAD_FAILED.to_string())
            }
        };
    }

    pub async fn load(&mut self, client: &ApiClient) {
        self.begin_load();
        let result = client.list_reports().await;
        self.finish_load(result);
    }

    pub fn rows(&self) -> &[Report] {
        match &self.state {
            CollectionState::Loaded(rows) => rows,
            _ => &[],
        }
    }

    pub fn visible(&self) -> Vec<&Report> {
        project(self.rows(), &self.filters, &self.sort)
    }

    pub fn toggle_sort(&mut self, key: SortKey) {
        self.sort.toggle(key);
    }

    pub fn clear_filters(&mut self) {
        self.filters = ReportFilters::default();
    }
}
