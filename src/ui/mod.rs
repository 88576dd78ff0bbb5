use anyhow::Error;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

use crate::core::timestamp::format_display;
use crate::core::{DomainDetail, Report, RiskLevel, StatusHistoryEntry};
use crate::views::{ReportFilters, SortState};

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub stdin_is_tty: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub max_table_rows: usize,
    pub quiet: bool,
    pub verbose: bool,
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let api_err = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<crate::api::ApiError>());

    let _ = writeln!(stderr, "hint:");
    match api_err {
        Some(e) if e.is_timeout() => {
            let _ = writeln!(stderr, "  - the API did not answer in time; raise `--timeout`");
        }
        Some(crate::api::ApiError::Network { .. }) => {
            let _ = writeln!(
                stderr,
                "  - check `--base-url` or `[api] base_url` (see `abusedash config --show`)"
            );
        }
        _ => {}
    }
    let _ = writeln!(stderr, "  - re-run with `--verbose` for request logs");
    let _ = writeln!(stderr, "  - see `abusedash --help` for commands and options");
}

pub fn print_reports(
    rows: &[&Report],
    total: usize,
    filters: &ReportFilters,
    sort: SortState,
    cfg: &UiConfig,
) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    let shown = rows.len().min(cfg.max_table_rows.max(1));

    let _ = writeln!(
        out,
        "Reports: {} matching / {total} loaded  (sort: {} {})",
        rows.len(),
        sort.key.label(),
        sort.direction.arrow()
    );
    if filters.is_active() {
        let _ = writeln!(out, "Filters: {}", describe_filters(filters));
    }
    let _ = writeln!(out);

    if rows.is_empty() {
        let _ = writeln!(out, "No reports match the current filters.");
        return;
    }
    write_reports_table(&mut out, &rows[..shown], cfg.color);
    if rows.len() > shown {
        let _ = writeln!(out, "... ({} more)", rows.len() - shown);
    }
}

pub fn print_domain_detail(detail: &DomainDetail, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    let domain = &detail.domain;
    let _ = writeln!(out, "Domain:  {}", domain.domain_name);
    let _ = writeln!(out, "Status:  {}", domain.current_status);
    if let Some(id) = domain.domain_id {
        let _ = writeln!(out, "ID:      {id}");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Reports ({}):", detail.reports.len());
    if detail.reports.is_empty() {
        let _ = writeln!(out, "  (none)");
    } else {
        let rows: Vec<&Report> = detail.reports.iter().collect();
        write_reports_table(&mut out, &rows, cfg.color);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Status history ({}):", detail.status_history.len());
    if detail.status_history.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for entry in &detail.status_history {
        let _ = writeln!(out, "- {}", history_line(entry));
    }
}

pub fn history_line(entry: &StatusHistoryEntry) -> String {
    let mut line = format!(
        "{}  {}  by {}",
        format_display(entry.created_at),
        entry.new_status,
        entry.reviewer_initials
    );
    if let Some(notes) = entry.notes.as_deref().filter(|n| !n.is_empty()) {
        line.push_str(" - ");
        line.push_str(notes);
    }
    line
}

pub fn describe_filters(filters: &ReportFilters) -> String {
    let mut parts = Vec::new();
    let domain = filters.domain.trim();
    if !domain.is_empty() {
        parts.push(format!("domain~{domain:?}"));
    }
    parts.push(format!("risk={}", filters.risk));
    if let Some(from) = filters.from {
        parts.push(format!("from={}", crate::core::timestamp::format_day(from)));
    }
    if let Some(to) = filters.to {
        parts.push(format!("to={}", crate::core::timestamp::format_day(to)));
    }
    parts.join("  ")
}

fn write_reports_table(out: &mut dyn Write, rows: &[&Report], color: bool) {
    let label_domain = "DOMAIN";
    let label_abuse = "ABUSE TYPE";
    let label_risk = "RISK";
    let label_time = "REPORTED (UTC)";

    let domain_w = rows
        .iter()
        .map(|r| visible_width_ansi(&truncate_middle(&r.domain_name, 48)))
        .max()
        .unwrap_or(0)
        .max(visible_width_ansi(label_domain));
    let abuse_w = rows
        .iter()
        .map(|r| r.abuse_type.as_str().len())
        .max()
        .unwrap_or(0)
        .max(label_abuse.len());
    let risk_w = label_risk.len().max("MEDIUM".len());

    let _ = writeln!(
        out,
        "{}  {}  {}  {}",
        pad_end_display(label_domain, domain_w),
        pad_end_display(label_abuse, abuse_w),
        pad_end_display(label_risk, risk_w),
        label_time
    );
    let _ = writeln!(
        out,
        "{}  {}  {}  {}",
        "-".repeat(domain_w),
        "-".repeat(abuse_w),
        "-".repeat(risk_w),
        "-".repeat(19)
    );
    for report in rows {
        let domain = pad_end_display(&truncate_middle(&report.domain_name, 48), domain_w);
        let abuse = pad_end_display(report.abuse_type.as_str(), abuse_w);
        let risk = pad_end_ansi(&format_risk(report.risk_level, color), risk_w);
        let _ = writeln!(
            out,
            "{domain}  {abuse}  {risk}  {}",
            format_display(report.reported_timestamp)
        );
    }
}

pub fn format_risk(risk: RiskLevel, color: bool) -> String {
    let s = risk.as_str();
    if !color {
        return s.to_string();
    }
    let code = match risk {
        RiskLevel::High => "31",
        RiskLevel::Medium => "33",
        RiskLevel::Low => "32",
    };
    format!("\x1b[{code}m{s}\x1b[0m")
}

pub fn truncate_middle(s: &str, max_chars: usize) -> String {
    let len = s.chars().count();
    if len <= max_chars {
        return s.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let left = keep / 2;
    let right = keep.saturating_sub(left);

    let prefix: String = s.chars().take(left).collect();
    let suffix: String = s.chars().skip(len - right).collect();
    format!("{prefix}...{suffix}")
}

fn pad_end_ansi(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn pad_end_display(s: &str, width: usize) -> String {
    pad_end_ansi(s, width)
}

fn visible_width_ansi(s: &str) -> usize {
    let mut width: usize = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            let _ = chars.next();
            for ch2 in chars.by_ref() {
                if ch2 == 'm' {
                    break;
                }
            }
            continue;
        }
        width = width.saturating_add(UnicodeWidthChar::width(ch).unwrap_or(0));
    }
    width
}
