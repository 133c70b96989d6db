//! `hll-experiment` measures how closely a HyperLogLog sketch tracks the exact distinct count
//! of random string streams, and plots the result.
//!
//! The experiment writes two CSV files: per-stream checkpoints (`graph1_data.csv`) and their
//! mean and standard deviation across streams (`graph2_stats.csv`). Each file is rendered into a
//! PNG chart, the first one overlaid with the theoretical `1.04/√M` and `1.3/√M` error bands.
pub mod aggregate;
pub mod config;
pub mod correction;
pub mod error;
pub mod experiment;
pub mod hash;
pub mod hyperloglog;
pub mod records;
pub mod render;
pub mod stream;

pub use crate::config::{BalanceConfig, ExperimentConfig, PlotConfig};
pub use crate::correction::{BiasCorrection, Correction};
pub use crate::error::{ExperimentError, Result};
pub use crate::hash::{HashFamily, ItemHasher};
pub use crate::hyperloglog::HyperLogLog;
pub use crate::records::{SummaryRecord, TrialGroups, TrialRecord};
