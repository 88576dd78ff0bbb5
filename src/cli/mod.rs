use std::io;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::api::ApiClient;
use crate::core::timestamp::parse_day;
use crate::core::{AbuseType, DomainDetail, ReviewStatus};
use crate::logs::{Mutation, Outcome};
use crate::ui::UiConfig;
use crate::views::detail::{LOOKUP_FAILED, STATUS_FAILED, prepare_query};
use crate::views::report_form::CREATE_FAILED;
use crate::views::{
    ReportCollection, ReportForm, RiskFilter, SortDirection, SortKey, SortState, StatusForm,
};

#[derive(Debug, Parser)]
#[command(
    name = "abusedash",
    version,
    about = "Review abuse reports: browse, file new reports, and record reviewer decisions per domain"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// API base URL, e.g. http://127.0.0.1:8000
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List reports with optional filters and sorting.
    Reports(ReportsArgs),
    /// Show a domain with its reports and status history.
    Detail(DetailArgs),
    /// Submit a new abuse report.
    Create(CreateArgs),
    /// Record a reviewer status for a domain.
    Status(StatusArgs),
    /// Check that the API is reachable.
    Health,
    /// Interactive dashboard.
    Ui,
    Completion(CompletionArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct ReportsArgs {
    /// Case-insensitive substring of the domain name.
    #[arg(long)]
    pub domain: Option<String>,
    #[arg(long, default_value = "ALL")]
    pub risk: RiskFilter,
    /// First day to include (YYYY-MM-DD, UTC).
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<Date>,
    /// Last day to include (YYYY-MM-DD, UTC).
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<Date>,
    #[arg(long)]
    pub sort: Option<SortKey>,
    #[arg(long, conflicts_with = "desc")]
    pub asc: bool,
    #[arg(long)]
    pub desc: bool,
}

#[derive(Debug, Args)]
pub struct DetailArgs {
    pub domain: String,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub domain: String,
    #[arg(long)]
    pub source: String,
    #[arg(long, default_value = "PHISHING")]
    pub abuse_type: AbuseType,
    /// 0-100.
    #[arg(long, default_value = "80", allow_hyphen_values = true)]
    pub confidence: String,
    /// When the abuse was observed. Without an offset the value is UTC. Defaults to now.
    #[arg(long)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    pub domain: String,
    #[arg(long)]
    pub status: ReviewStatus,
    /// Defaults to `[reviewer] initials` from the config.
    #[arg(long)]
    pub initials: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let stdin_is_tty = io::stdin().is_terminal();
    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    let home_dir = crate::config::home_dir()?;

    let mut cfg = crate::config::load(cli.config.as_deref(), &home_dir)
        .map_err(crate::exit::invalid_args_err)?;
    if let Some(base_url) = &cli.base_url {
        cfg.api.base_url = base_url.clone();
    }
    if let Some(timeout) = cli.timeout {
        cfg.api.timeout_secs = timeout;
    }

    let is_ui_mode = matches!(&cli.command, Commands::Ui);
    let log_sink = if is_ui_mode {
        crate::logging::Sink::File(crate::logging::dashboard_log_path(&home_dir))
    } else {
        crate::logging::Sink::Stderr {
            ansi: stderr_is_tty && !cli.no_color,
        }
    };
    crate::logging::init(crate::logging::filter(&cfg.log.level, cli.verbose), log_sink)?;

    let color = stdout_is_tty && cfg.ui.color && !cli.no_color;
    let ui_cfg = UiConfig {
        color,
        stdin_is_tty,
        stdout_is_tty,
        stderr_is_tty,
        max_table_rows: cfg.ui.max_table_rows,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };
    let show_progress = stderr_is_tty && !cli.quiet && !cli.json;

    let needs_api = !matches!(&cli.command, Commands::Completion(_) | Commands::Config(_));
    if !needs_api {
        return run_offline(&cli, &cfg);
    }

    let client = ApiClient::new(&cfg.api_config())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    tracing::debug!(base_url = client.base_url(), "api client ready");

    match cli.command {
        Commands::Reports(args) => {
            let mut collection = ReportCollection::new();
            collection.filters.domain = args.domain.unwrap_or_default();
            collection.filters.risk = args.risk;
            collection.filters.from = args.from;
            collection.filters.to = args.to;
            collection.sort = sort_from_args(args.sort, args.asc, args.desc);

            let rows = with_spinner(show_progress, "Loading reports...", || {
                runtime.block_on(client.list_reports())
            })
            .context(crate::views::collection::LOAD_FAILED)?;
            collection.finish_load(Ok(rows));

            let visible = collection.visible();
            if cli.json {
                write_json(&visible)?;
            } else {
                crate::ui::print_reports(
                    &visible,
                    collection.rows().len(),
                    &collection.filters,
                    collection.sort,
                    &ui_cfg,
                );
            }
        }
        Commands::Detail(args) => {
            let domain = prepare_query(&args.domain)?;
            let detail = fetch_detail(&runtime, &client, &domain, show_progress)?;
            print_detail(&detail, cli.json, &ui_cfg)?;
        }
        Commands::Create(args) => {
            let mut form = ReportForm::new(OffsetDateTime::now_utc());
            form.domain = args.domain;
            form.source = args.source;
            form.abuse_type = args.abuse_type;
            form.confidence = args.confidence;
            if let Some(timestamp) = args.timestamp {
                form.timestamp = timestamp;
            }
            let payload = form.validate()?;

            let started_at = OffsetDateTime::now_utc();
            let result = with_spinner(show_progress, "Submitting report...", || {
                runtime.block_on(client.create_report(&payload))
            });
            let outcome = match &result {
                Ok(report) => Outcome::Ok {
                    report_id: Some(report.report_id),
                },
                Err(err) => Outcome::Error(err.to_string()),
            };
            crate::logs::record_mutation(
                &home_dir,
                client.base_url(),
                started_at,
                Mutation::CreateReport(&payload),
                &outcome,
            );
            let report = result.context(CREATE_FAILED)?;

            if cli.json {
                write_json(&report)?;
            } else if !ui_cfg.quiet {
                println!(
                    "Report created: #{} {} [{}] risk={}",
                    report.report_id,
                    report.domain_name,
                    report.abuse_type,
                    crate::ui::format_risk(report.risk_level, ui_cfg.color)
                );
            }
        }
        Commands::Status(args) => {
            let domain = prepare_query(&args.domain)?;
            let mut form = StatusForm::new(domain.clone(), &cfg.reviewer.initials);
            form.new_status = args.status;
            if let Some(initials) = args.initials {
                form.initials = initials;
            }
            form.notes = args.notes.unwrap_or_default();
            let payload = form.validate()?;

            let started_at = OffsetDateTime::now_utc();
            let result = with_spinner(show_progress, "Updating status...", || {
                runtime.block_on(client.update_domain_status(&domain, &payload))
            });
            let outcome = match &result {
                Ok(()) => Outcome::Ok { report_id: None },
                Err(err) => Outcome::Error(err.to_string()),
            };
            crate::logs::record_mutation(
                &home_dir,
                client.base_url(),
                started_at,
                Mutation::UpdateStatus {
                    domain: &domain,
                    update: &payload,
                },
                &outcome,
            );
            result.context(STATUS_FAILED)?;

            if !ui_cfg.quiet && !cli.json {
                eprintln!("{}", crate::views::detail::STATUS_SAVED);
            }
            let detail = fetch_detail(&runtime, &client, &domain, show_progress)?;
            print_detail(&detail, cli.json, &ui_cfg)?;
        }
        Commands::Health => {
            let health = with_spinner(show_progress, "Checking API...", || {
                runtime.block_on(client.health())
            })?;
            if cli.json {
                write_json(&health)?;
            } else if !ui_cfg.quiet {
                println!("API {}: {}", client.base_url(), health.status);
            }
            if !health.is_ok() {
                return Err(anyhow::anyhow!("API reported status {:?}", health.status));
            }
        }
        Commands::Ui => {
            if cli.json {
                return Err(crate::exit::invalid_args("ui cannot be combined with --json"));
            }
            if !(ui_cfg.stdin_is_tty && ui_cfg.stdout_is_tty) {
                return Err(crate::exit::invalid_args("ui requires a TTY (stdin + stdout)"));
            }
            crate::tui::run(
                runtime.handle().clone(),
                client,
                crate::tui::Options {
                    color: ui_cfg.color,
                    default_initials: cfg.reviewer.initials.clone(),
                    home_dir,
                },
            )?;
        }
        Commands::Completion(_) | Commands::Config(_) => {}
    }

    Ok(())
}

fn run_offline(cli: &Cli, cfg: &crate::config::EffectiveConfig) -> Result<()> {
    match &cli.command {
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = std::io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "abusedash", &mut out);
        }
        Commands::Config(args) => {
            if args.show {
                if cli.json {
                    write_json(cfg)?;
                } else {
                    print!("{}", toml::to_string_pretty(cfg)?);
                }
            } else if !cli.quiet {
                eprintln!("config: use `abusedash config --show`");
            }
        }
        _ => {}
    }
    Ok(())
}

fn fetch_detail(
    runtime: &tokio::runtime::Runtime,
    client: &ApiClient,
    domain: &str,
    show_progress: bool,
) -> Result<DomainDetail> {
    let detail = with_spinner(show_progress, "Fetching domain...", || {
        runtime.block_on(client.get_domain_detail(domain))
    })
    .with_context(|| format!("{LOOKUP_FAILED} ({domain})"))?;
    Ok(detail)
}

fn print_detail(detail: &DomainDetail, json: bool, ui_cfg: &UiConfig) -> Result<()> {
    if json {
        write_json(detail)
    } else {
        crate::ui::print_domain_detail(detail, ui_cfg);
        Ok(())
    }
}

/// Explicit `--asc`/`--desc` win; a chosen key otherwise starts ascending.
fn sort_from_args(key: Option<SortKey>, asc: bool, desc: bool) -> SortState {
    let default = SortState::default();
    let direction = if asc {
        SortDirection::Asc
    } else if desc {
        SortDirection::Desc
    } else if key.is_some() {
        SortDirection::Asc
    } else {
        default.direction
    };
    SortState {
        key: key.unwrap_or(default.key),
        direction,
    }
}

fn with_spinner<T>(show: bool, message: &'static str, f: impl FnOnce() -> T) -> T {
    let pb = if show {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };
    let out = f();
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    out
}

fn write_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(value)?;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn parse_date_arg(s: &str) -> Result<Date, String> {
    parse_day(s).map_err(|_| format!("invalid date: {s} (expected YYYY-MM-DD)"))
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        other => Err(crate::exit::invalid_args(format!(
            "unsupported shell: {other} (expected bash|zsh|fish)"
        ))),
    }
}
