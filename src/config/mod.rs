use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ApiConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub api: ApiSection,
    pub ui: UiConfig,
    pub reviewer: ReviewerConfig,
    pub log: LogConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiSection {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub color: bool,
    pub max_table_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewerConfig {
    pub initials: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogConfig {
    pub level: String,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            api: ApiSection {
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            },
            ui: UiConfig {
                color: true,
                max_table_rows: 50,
            },
            reviewer: ReviewerConfig {
                initials: String::new(),
            },
            log: LogConfig {
                level: "warn".to_string(),
            },
            config_path: None,
        }
    }
}

impl EffectiveConfig {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    api: Option<RawApiConfig>,
    ui: Option<RawUiConfig>,
    reviewer: Option<RawReviewerConfig>,
    log: Option<RawLogConfig>,
}

#[derive(Debug, Deserialize)]
struct RawApiConfig {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawUiConfig {
    color: Option<bool>,
    max_table_rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawReviewerConfig {
    initials: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLogConfig {
    level: Option<String>,
}

pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("HOME is not set"))
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/abusedash/config.toml")
}

/// `--config`, then `$ABUSEDASH_CONFIG`, then the per-user default.
pub fn resolve_path(explicit: Option<&Path>, home_dir: &Path) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_owned();
    }
    match std::env::var_os("ABUSEDASH_CONFIG") {
        Some(v) if !v.is_empty() => PathBuf::from(v),
        _ => default_config_path(home_dir),
    }
}

pub fn load(config_path: Option<&Path>, home_dir: &Path) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();
    let path = resolve_path(config_path, home_dir);

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw = parse(&s)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        apply_raw_config(&mut cfg, raw);
        cfg.config_path = Some(path.display().to_string());
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

fn parse(s: &str) -> Result<RawConfig> {
    Ok(toml::from_str(s)?)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) {
    if let Some(api) = raw.api {
        if let Some(base_url) = api.base_url {
            cfg.api.base_url = base_url;
        }
        if let Some(timeout_secs) = api.timeout_secs {
            cfg.api.timeout_secs = timeout_secs;
        }
    }

    if let Some(ui) = raw.ui {
        if let Some(color) = ui.color {
            cfg.ui.color = color;
        }
        if let Some(max_table_rows) = ui.max_table_rows {
            cfg.ui.max_table_rows = max_table_rows;
        }
    }

    if let Some(initials) = raw.reviewer.and_then(|r| r.initials) {
        cfg.reviewer.initials = initials;
    }

    if let Some(level) = raw.log.and_then(|l| l.level) {
        cfg.log.level = level;
    }
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Some(v) = non_empty_env("ABUSEDASH_API_BASE_URL") {
        cfg.api.base_url = v;
    }
    if let Some(v) = non_empty_env("ABUSEDASH_API_TIMEOUT_SECS") {
        cfg.api.timeout_secs = v
            .parse::<u64>()
            .with_context(|| "ABUSEDASH_API_TIMEOUT_SECS")?;
    }
    if let Ok(v) = std::env::var("ABUSEDASH_UI_COLOR") {
        cfg.ui.color = parse_bool(&v).with_context(|| "ABUSEDASH_UI_COLOR")?;
    }
    if let Some(v) = non_empty_env("ABUSEDASH_UI_MAX_TABLE_ROWS") {
        cfg.ui.max_table_rows = v
            .parse::<usize>()
            .with_context(|| "ABUSEDASH_UI_MAX_TABLE_ROWS")?;
    }
    if let Ok(v) = std::env::var("ABUSEDASH_REVIEWER_INITIALS") {
        cfg.reviewer.initials = v.trim().to_string();
    }
    if let Some(v) = non_empty_env("ABUSEDASH_LOG_LEVEL") {
        cfg.log.level = v;
    }

    Ok(())
}

fn non_empty_env(key: &str) -> Option<String> {
    let v = std::env::var(key).ok()?;
    let v = v.trim();
    (!v.is_empty()).then(|| v.to_string())
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}
