use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use hll_experiment::config::{
    DEFAULT_PRECISION, DEFAULT_SUMMARY_CSV, DEFAULT_SUMMARY_PNG, DEFAULT_TRIALS_CSV,
    DEFAULT_TRIALS_PNG,
};
use hll_experiment::correction::{Classic, LogLogBeta};
use hll_experiment::render::ChartStyle;
use hll_experiment::{BalanceConfig, Correction, ExperimentConfig, HashFamily, PlotConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "HyperLogLog accuracy experiment and charts", long_about = None)]
pub struct Cli {
    /// Without a subcommand, charts are plotted from the default CSV files
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the experiment and write both CSV files
    Run(RunArgs),
    /// Render both charts from the CSV files
    Plot(PlotArgs),
    /// Run the experiment, then render its charts
    All(AllArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataArgs,
    #[command(flatten)]
    pub experiment: ExperimentArgs,
}

#[derive(Args, Debug)]
pub struct PlotArgs {
    #[command(flatten)]
    pub data: DataArgs,
    #[command(flatten)]
    pub chart: ChartArgs,
}

#[derive(Args, Debug)]
pub struct AllArgs {
    #[command(flatten)]
    pub data: DataArgs,
    #[command(flatten)]
    pub experiment: ExperimentArgs,
    #[command(flatten)]
    pub chart: ChartArgs,
}

/// Files and sketch precision shared by the experiment and the charts
#[derive(Args, Debug)]
pub struct DataArgs {
    /// Per-stream checkpoint CSV
    #[arg(long, default_value = DEFAULT_TRIALS_CSV, value_hint = ValueHint::FilePath)]
    pub trials_csv: PathBuf,

    /// Per-step mean and standard deviation CSV
    #[arg(long, default_value = DEFAULT_SUMMARY_CSV, value_hint = ValueHint::FilePath)]
    pub summary_csv: PathBuf,

    /// Sketch precision, the sketch has 2^p registers
    #[arg(short, long, default_value_t = DEFAULT_PRECISION)]
    pub precision: u8,
}

#[derive(Args, Debug)]
pub struct ExperimentArgs {
    /// Items generated per stream
    #[arg(short = 'n', long, default_value_t = 50_000)]
    pub items: usize,

    /// Checkpoint distance in percent of the item count
    #[arg(long, default_value_t = 10.0)]
    pub step_percent: f64,

    /// Number of independent streams
    #[arg(short, long, default_value_t = 5)]
    pub streams: usize,

    /// Seed of the first stream
    #[arg(long, default_value_t = 1000)]
    pub seed: u64,

    /// Seed increment between streams
    #[arg(long, default_value_t = 97)]
    pub seed_stride: u64,

    /// Offset added to a stream seed to seed its hash function
    #[arg(long, default_value_t = 99_991)]
    pub hash_seed_offset: u64,

    #[arg(long, value_enum, default_value_t = HashOpt::Mix64)]
    pub hash: HashOpt,

    #[arg(long, value_enum, default_value_t = CorrectionOpt::Classic)]
    pub correction: CorrectionOpt,

    /// Shortest generated item
    #[arg(long, default_value_t = hll_experiment::stream::DEFAULT_MIN_LEN)]
    pub min_len: usize,

    /// Longest generated item
    #[arg(long, default_value_t = hll_experiment::stream::DEFAULT_MAX_LEN)]
    pub max_len: usize,

    /// Skip the hash bucket balance report
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_balance: bool,
}

#[derive(Args, Debug)]
pub struct ChartArgs {
    /// Trials chart output
    #[arg(long, default_value = DEFAULT_TRIALS_PNG, value_hint = ValueHint::FilePath)]
    pub trials_png: PathBuf,

    /// Summary chart output
    #[arg(long, default_value = DEFAULT_SUMMARY_PNG, value_hint = ValueHint::FilePath)]
    pub summary_png: PathBuf,

    #[arg(long, default_value_t = 150)]
    pub dpi: u32,

    /// Figure width in inches
    #[arg(long, default_value_t = 9.0)]
    pub width: f64,

    /// Figure height in inches
    #[arg(long, default_value_t = 5.0)]
    pub height: f64,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum HashOpt {
    Mix64,
    Wyhash,
}

impl From<HashOpt> for HashFamily {
    fn from(value: HashOpt) -> Self {
        match value {
            HashOpt::Mix64 => HashFamily::Mix64,
            HashOpt::Wyhash => HashFamily::WyHash,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum CorrectionOpt {
    Classic,
    LoglogBeta,
}

impl From<CorrectionOpt> for Correction {
    fn from(value: CorrectionOpt) -> Self {
        match value {
            CorrectionOpt::Classic => Classic.into(),
            CorrectionOpt::LoglogBeta => LogLogBeta.into(),
        }
    }
}

impl ExperimentArgs {
    pub fn config(&self, data: &DataArgs) -> ExperimentConfig {
        ExperimentConfig {
            total_items: self.items,
            step_percent: self.step_percent,
            precision: data.precision,
            streams: self.streams,
            base_seed: self.seed,
            seed_stride: self.seed_stride,
            hash_seed_offset: self.hash_seed_offset,
            hash_family: self.hash.into(),
            correction: self.correction.into(),
            min_len: self.min_len,
            max_len: self.max_len,
            balance: BalanceConfig::default(),
            trials_csv: data.trials_csv.clone(),
            summary_csv: data.summary_csv.clone(),
        }
    }
}

impl ChartArgs {
    pub fn config(&self, data: &DataArgs) -> PlotConfig {
        PlotConfig {
            trials_csv: data.trials_csv.clone(),
            summary_csv: data.summary_csv.clone(),
            trials_png: self.trials_png.clone(),
            summary_png: self.summary_png.clone(),
            precision: data.precision,
            style: ChartStyle {
                width_in: self.width,
                height_in: self.height,
                dpi: self.dpi,
            },
        }
    }
}
