use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::{NewReport, StatusUpdate};

const MAX_ERROR_BYTES: usize = 4 * 1024;

/// A write against the API that leaves an audit record.
#[derive(Debug, Clone, Copy)]
pub enum Mutation<'a> {
    CreateReport(&'a NewReport),
    UpdateStatus {
        domain: &'a str,
        update: &'a StatusUpdate,
    },
}

impl Mutation<'_> {
    fn command(&self) -> &'static str {
        match self {
            Mutation::CreateReport(_) => "create-report",
            Mutation::UpdateStatus { .. } => "update-status",
        }
    }

    fn domain(&self) -> &str {
        match self {
            Mutation::CreateReport(r) => &r.domain_name,
            Mutation::UpdateStatus { domain, .. } => domain,
        }
    }

    fn payload(&self) -> serde_json::Value {
        let value = match self {
            Mutation::CreateReport(r) => serde_json::to_value(r),
            Mutation::UpdateStatus { update, .. } => serde_json::to_value(update),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Serialize)]
struct MutationLog {
    schema_version: &'static str,
    tool_version: String,
    command: &'static str,
    api_base_url: String,
    started_at: String,
    finished_at: String,
    status: &'static str,
    domain: String,
    payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    report_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Result of the attempt as far as the audit record cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok { report_id: Option<i64> },
    Error(String),
}

pub fn logs_dir(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/abusedash/logs")
}

pub fn write_mutation_log(
    home_dir: &Path,
    api_base_url: &str,
    started_at: OffsetDateTime,
    finished_at: OffsetDateTime,
    mutation: Mutation<'_>,
    outcome: &Outcome,
) -> Result<PathBuf> {
    let dir = logs_dir(home_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let pid = std::process::id();
    let ts = finished_at.unix_timestamp_nanos();
    let path = dir.join(format!("{}-{pid}-{ts}.json", mutation.command()));

    let (status, report_id, error) = match outcome {
        Outcome::Ok { report_id } => ("ok", *report_id, None),
        Outcome::Error(e) => ("error", None, Some(truncate_string(e, MAX_ERROR_BYTES))),
    };

    let log = MutationLog {
        schema_version: "1.0",
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        command: mutation.command(),
        api_base_url: api_base_url.to_string(),
        started_at: rfc3339(started_at),
        finished_at: rfc3339(finished_at),
        status,
        domain: mutation.domain().to_string(),
        payload: mutation.payload(),
        report_id,
        error,
    };

    let buf = serde_json::to_vec_pretty(&log).context("failed to serialize audit log")?;
    std::fs::write(&path, buf)
        .with_context(|| format!("failed to write audit log: {}", path.display()))?;
    Ok(path)
}

/// Writes the record and swallows the failure; the API result matters more.
pub fn record_mutation(
    home_dir: &Path,
    api_base_url: &str,
    started_at: OffsetDateTime,
    mutation: Mutation<'_>,
    outcome: &Outcome,
) {
    let finished_at = OffsetDateTime::now_utc();
    match write_mutation_log(
        home_dir,
        api_base_url,
        started_at,
        finished_at,
        mutation,
        outcome,
    ) {
        Ok(path) => tracing::debug!(path = %path.display(), "audit log written"),
        Err(err) => tracing::warn!(error = %format!("{err:#}"), "audit log not written"),
    }
}

fn rfc3339(dt: OffsetDateTime) -> String {
    dt.format(&Rfc3339).unwrap_or_else(|_| "unknown".to_string())
}

fn truncate_string(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut idx = max_bytes;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx = idx.saturating_sub(1);
    }
    let head = &s[..idx];
    format!("{head}...(truncated, total={} bytes)", s.len())
}
