//! Experiment and plot settings. Defaults reproduce the reference experiment:
//! five streams of 50 000 random strings sampled every 10 % by a `P = 10` sketch.

use std::path::PathBuf;

use crate::correction::Correction;
use crate::error::{ExperimentError, Result};
use crate::hash::HashFamily;
use crate::hyperloglog::{MAX_PRECISION, MIN_PRECISION};
use crate::render::ChartStyle;
use crate::stream::{DEFAULT_MAX_LEN, DEFAULT_MIN_LEN};

pub const DEFAULT_PRECISION: u8 = 10;
pub const DEFAULT_TRIALS_CSV: &str = "graph1_data.csv";
pub const DEFAULT_SUMMARY_CSV: &str = "graph2_stats.csv";
pub const DEFAULT_TRIALS_PNG: &str = "graph1.png";
pub const DEFAULT_SUMMARY_PNG: &str = "graph2.png";

/// Settings of the accuracy experiment
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    /// Items generated per stream
    pub total_items: usize,
    /// Distance between checkpoints, in percent of `total_items`
    pub step_percent: f64,
    pub precision: u8,
    pub streams: usize,
    /// Seed of stream 0
    pub base_seed: u64,
    /// Seed increment between consecutive streams
    pub seed_stride: u64,
    /// Added to the stream seed to seed its hash function
    pub hash_seed_offset: u64,
    pub hash_family: HashFamily,
    pub correction: Correction,
    pub min_len: usize,
    pub max_len: usize,
    pub balance: BalanceConfig,
    pub trials_csv: PathBuf,
    pub summary_csv: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            total_items: 50_000,
            step_percent: 10.0,
            precision: DEFAULT_PRECISION,
            streams: 5,
            base_seed: 1000,
            seed_stride: 97,
            hash_seed_offset: 99_991,
            hash_family: HashFamily::default(),
            correction: Correction::default(),
            min_len: DEFAULT_MIN_LEN,
            max_len: DEFAULT_MAX_LEN,
            balance: BalanceConfig::default(),
            trials_csv: PathBuf::from(DEFAULT_TRIALS_CSV),
            summary_csv: PathBuf::from(DEFAULT_SUMMARY_CSV),
        }
    }
}

impl ExperimentConfig {
    /// Seed of stream `index`
    pub fn stream_seed(&self, index: usize) -> u64 {
        self.base_seed
            .wrapping_add((index as u64).wrapping_mul(self.seed_stride))
    }

    pub fn validate(&self) -> Result<()> {
        validate_precision(self.precision)?;
        if self.total_items == 0 {
            return Err(config_error("total items must be positive"));
        }
        if !self.step_percent.is_finite() || self.step_percent <= 0.0 {
            return Err(config_error(format!(
                "step percent must be a positive number, got {}",
                self.step_percent
            )));
        }
        if self.streams == 0 {
            return Err(config_error("at least one stream is required"));
        }
        if self.min_len > self.max_len {
            return Err(config_error(format!(
                "minimum item length {} exceeds maximum {}",
                self.min_len, self.max_len
            )));
        }
        self.balance.validate()
    }
}

/// Settings of the hash bucket balance report printed before the experiment
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceConfig {
    pub seed: u64,
    pub items: usize,
    pub hash_seed_offset: u64,
    /// Register index widths to check
    pub precisions: Vec<u8>,
    /// Bucket count of the chi-square uniformity check
    pub chi_square_buckets: usize,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            seed: 7777,
            items: 20_000,
            hash_seed_offset: 123,
            precisions: vec![8, 10, 12],
            chi_square_buckets: 256,
        }
    }
}

impl BalanceConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(&p) = self.precisions.iter().find(|p| !(1..=24).contains(*p)) {
            return Err(config_error(format!(
                "bucket balance precision {p} is outside 1..=24"
            )));
        }
        Ok(())
    }
}

/// Settings of the chart rendering
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
    pub trials_csv: PathBuf,
    pub summary_csv: PathBuf,
    pub trials_png: PathBuf,
    pub summary_png: PathBuf,
    /// Precision used to draw the theoretical error bands
    pub precision: u8,
    pub style: ChartStyle,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            trials_csv: PathBuf::from(DEFAULT_TRIALS_CSV),
            summary_csv: PathBuf::from(DEFAULT_SUMMARY_CSV),
            trials_png: PathBuf::from(DEFAULT_TRIALS_PNG),
            summary_png: PathBuf::from(DEFAULT_SUMMARY_PNG),
            precision: DEFAULT_PRECISION,
            style: ChartStyle::default(),
        }
    }
}

impl PlotConfig {
    pub fn validate(&self) -> Result<()> {
        validate_precision(self.precision)?;
        self.style.validate()
    }
}

fn validate_precision(precision: u8) -> Result<()> {
    if (MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
        Ok(())
    } else {
        Err(ExperimentError::InvalidPrecision(precision))
    }
}

pub(crate) fn config_error(message: impl Into<String>) -> ExperimentError {
    ExperimentError::Config(message.into())
}
