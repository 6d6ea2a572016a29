use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::checkpoint::{TagGenerations, DEFAULT_TAG_CAPACITY};
use crate::query::{DateRange, MetricPredicate};

/// Who receives the per-run status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub to: String,
    #[serde(default)]
    pub cc: String,
    #[serde(default = "default_subject")]
    pub subject: String,
}

fn default_subject() -> String {
    "MCC Keyword deletion status report".to_string()
}

fn default_tag_capacity() -> usize {
    DEFAULT_TAG_CAPACITY
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            to: "YOUR@EMAIL.HERE".to_string(),
            cc: "YOUR@EMAIL.HERE".to_string(),
            subject: default_subject(),
        }
    }
}

/// Global configuration loaded from `~/.config/kwd/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Keywords matching this over the date range are deleted (e.g. `Clicks = 0`).
    pub condition: String,
    /// Extra per-campaign threshold applied while sweeping (e.g. `QualityScore <= 7`).
    pub quality_condition: String,
    /// First day of the reporting window, `YYYYMMDD`.
    pub range_start: String,
    /// Last day of the reporting window (inclusive), `YYYYMMDD`.
    pub range_end: String,
    /// Completion tag generations, oldest first. Append a name when the
    /// current one is full; never remove or reorder.
    pub tag_generations: Vec<String>,
    /// Members per tag generation.
    #[serde(default = "default_tag_capacity")]
    pub tag_capacity: usize,
    /// Accounts processed concurrently in one run.
    pub max_parallel_units: usize,
    /// Wall-clock budget of one account's execution, in seconds.
    pub unit_time_budget_secs: u64,
    /// Clear every tag automatically once no unfinished account is left.
    #[serde(default)]
    pub reset_on_completion: bool,
    pub notification: NotificationConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            condition: "Clicks = 0".to_string(),
            quality_condition: "QualityScore <= 7".to_string(),
            range_start: "20131001".to_string(),
            range_end: "20141123".to_string(),
            tag_generations: vec!["__PROCESSED__".to_string()],
            tag_capacity: DEFAULT_TAG_CAPACITY,
            max_parallel_units: 50,
            unit_time_budget_secs: 30 * 60,
            reset_on_completion: false,
            notification: NotificationConfig::default(),
        }
    }
}

/// Validated, immutable settings handed to the dispatcher.
#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub condition: MetricPredicate,
    pub quality_condition: MetricPredicate,
    pub date_range: DateRange,
    pub generations: TagGenerations,
    pub max_parallel_units: usize,
    pub unit_time_budget: Duration,
    pub reset_on_completion: bool,
    pub notification: NotificationConfig,
}

impl SweepSettings {
    /// Campaign tag used inside each account.
    pub fn sub_unit_tag(&self) -> &str {
        self.generations.first()
    }
}

impl SweepConfig {
    /// Parse predicates, dates and generations; reject unusable values.
    pub fn validate(&self) -> Result<SweepSettings> {
        let condition = self
            .condition
            .parse::<MetricPredicate>()
            .with_context(|| format!("invalid condition `{}`", self.condition))?;
        let quality_condition = self
            .quality_condition
            .parse::<MetricPredicate>()
            .with_context(|| format!("invalid quality_condition `{}`", self.quality_condition))?;
        let date_range =
            DateRange::parse(&self.range_start, &self.range_end).context("invalid date range")?;
        let generations = TagGenerations::new(self.tag_generations.clone(), self.tag_capacity)
            .context("invalid tag_generations")?;
        if self.max_parallel_units == 0 {
            anyhow::bail!("max_parallel_units must be at least 1");
        }
        if self.unit_time_budget_secs == 0 {
            anyhow::bail!("unit_time_budget_secs must be at least 1");
        }
        if self.notification.to.trim().is_empty() {
            anyhow::bail!("notification.to must not be empty");
        }
        Ok(SweepSettings {
            condition,
            quality_condition,
            date_range,
            generations,
            max_parallel_units: self.max_parallel_units,
            unit_time_budget: Duration::from_secs(self.unit_time_budget_secs),
            reset_on_completion: self.reset_on_completion,
            notification: self.notification.clone(),
        })
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("kwd")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SweepConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SweepConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<SweepConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: SweepConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
