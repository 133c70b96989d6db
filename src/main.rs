mod cli;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tabled::settings::{Settings, Style};
use tabled::{Table, Tabled};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hll_experiment::aggregate::summarize;
use hll_experiment::experiment::{bucket_balance, run_trials, BalanceReport};
use hll_experiment::records::{load_summary, load_trials, save_summary, save_trials, trial_records};
use hll_experiment::render::{render_summary_chart, render_trials_chart};
use hll_experiment::{ExperimentConfig, PlotConfig};

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        None => handle_plot(&PlotConfig::default()),
        Some(Command::Run(args)) => {
            handle_run(&args.experiment.config(&args.data), !args.experiment.no_balance)
        }
        Some(Command::Plot(args)) => handle_plot(&args.chart.config(&args.data)),
        Some(Command::All(args)) => {
            handle_run(&args.experiment.config(&args.data), !args.experiment.no_balance)?;
            handle_plot(&args.chart.config(&args.data))
        }
    }
}

fn handle_run(config: &ExperimentConfig, balance: bool) -> Result<()> {
    config.validate().context("invalid experiment settings")?;
    info!(
        items = config.total_items,
        streams = config.streams,
        precision = config.precision,
        hash = %config.hash_family,
        "running experiment"
    );

    if balance {
        let report = bucket_balance(&config.balance, config.hash_family)
            .context("failed to measure hash bucket balance")?;
        println!("{}", balance_table(&report));
    }

    let trials = run_trials(config).context("experiment failed")?;
    save_trials(&config.trials_csv, &trial_records(&trials))
        .with_context(|| format!("failed to write {}", config.trials_csv.display()))?;

    let summary = summarize(&trials).context("failed to aggregate streams")?;
    save_summary(&config.summary_csv, &summary)
        .with_context(|| format!("failed to write {}", config.summary_csv.display()))?;

    println!(
        "Wrote {} and {}",
        config.trials_csv.display(),
        config.summary_csv.display()
    );
    Ok(())
}

fn handle_plot(config: &PlotConfig) -> Result<()> {
    config.validate().context("invalid plot settings")?;

    let groups = load_trials(&config.trials_csv)
        .with_context(|| format!("failed to load {}", config.trials_csv.display()))?;
    info!(streams = groups.len(), path = %config.trials_csv.display(), "loaded trials");
    render_trials_chart(&config.trials_png, &groups, config.precision, &config.style)
        .with_context(|| format!("failed to render {}", config.trials_png.display()))?;

    let summary = load_summary(&config.summary_csv)
        .with_context(|| format!("failed to load {}", config.summary_csv.display()))?;
    info!(steps = summary.len(), path = %config.summary_csv.display(), "loaded summary");
    render_summary_chart(&config.summary_png, &summary, &config.style)
        .with_context(|| format!("failed to render {}", config.summary_png.display()))?;

    println!(
        "Saved {} and {}",
        config.trials_png.display(),
        config.summary_png.display()
    );
    Ok(())
}

#[derive(Tabled)]
struct BalanceRow {
    precision: u8,
    buckets: usize,
    min: usize,
    mean: String,
    max: usize,
}

fn balance_table(report: &BalanceReport) -> String {
    let rows = report.buckets.iter().map(|b| BalanceRow {
        precision: b.precision,
        buckets: b.buckets,
        min: b.min,
        mean: format!("{:.2}", b.mean),
        max: b.max,
    });
    let table_config = Settings::default().with(Style::markdown());
    format!(
        "chi-square over {} buckets: {:.2}\n\n{}",
        report.chi_square_buckets,
        report.chi_square,
        Table::new(rows).with(table_config)
    )
}
