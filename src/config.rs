//! Configuration file handling.
//!
//! Settings live in an optional `equipment-pulse.toml`; every field has a
//! default so a missing file or a partial file both work.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::analytics::Baselines;
use crate::data::aggregate::EmptyColumnPolicy;
use crate::data::loader::ParseOptions;
use crate::history::DEFAULT_CAPACITY;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "equipment-pulse.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// Retained upload history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of summaries kept.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// JSON file the history is persisted to.
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            path: default_history_path(),
        }
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_history_path() -> PathBuf {
    PathBuf::from("history.json")
}

/// Parsing and aggregation of uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Single-byte field separator.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Reject uploads whose numeric column holds no numbers at all.
    /// When false, such a column is reported as unavailable instead.
    #[serde(default = "default_true")]
    pub strict_empty_columns: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            strict_empty_columns: true,
        }
    }
}

impl IngestConfig {
    pub fn parse_options(&self) -> Result<ParseOptions> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character, got {:?}", self.delimiter);
        }
        Ok(ParseOptions {
            delimiter: self.delimiter as u8,
        })
    }

    pub fn empty_column_policy(&self) -> EmptyColumnPolicy {
        if self.strict_empty_columns {
            EmptyColumnPolicy::Reject
        } else {
            EmptyColumnPolicy::Unavailable
        }
    }
}

fn default_delimiter() -> char {
    ','
}

fn default_true() -> bool {
    true
}

/// Derived analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Samples in the synthetic trend.
    #[serde(default = "default_trend_points")]
    pub trend_points: usize,

    /// Bound of the random jitter added to trend and scatter points.
    /// Zero disables trend jitter.
    #[serde(default = "default_jitter_amplitude")]
    pub jitter_amplitude: f64,

    /// Fixed seed for reproducible jitter; seeded from the clock when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(default = "default_baseline_flowrate")]
    pub baseline_flowrate: f64,

    #[serde(default = "default_baseline_pressure")]
    pub baseline_pressure: f64,

    #[serde(default = "default_baseline_temperature")]
    pub baseline_temperature: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            trend_points: default_trend_points(),
            jitter_amplitude: default_jitter_amplitude(),
            seed: None,
            baseline_flowrate: default_baseline_flowrate(),
            baseline_pressure: default_baseline_pressure(),
            baseline_temperature: default_baseline_temperature(),
        }
    }
}

impl AnalyticsConfig {
    pub fn baselines(&self) -> Baselines {
        Baselines {
            flowrate: self.baseline_flowrate,
            pressure: self.baseline_pressure,
            temperature: self.baseline_temperature,
        }
    }
}

fn default_trend_points() -> usize {
    12
}

fn default_jitter_amplitude() -> f64 {
    3.0
}

fn default_baseline_flowrate() -> f64 {
    Baselines::default().flowrate
}

fn default_baseline_pressure() -> f64 {
    Baselines::default().pressure
}

fn default_baseline_temperature() -> f64 {
    Baselines::default().temperature
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String> {
        let config = Config::default();
        toml::to_string_pretty(&config).context("Failed to serialize default configuration")
    }
}
