//! Accuracy experiment: feed seeded random streams into a sketch and an exact set
//! and record both counts at every checkpoint of the split plan.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::config::{BalanceConfig, ExperimentConfig};
use crate::error::Result;
use crate::hash::{chi_square_uniformity, BucketBalance, HashFamily, ItemHasher};
use crate::hyperloglog::HyperLogLog;
use crate::stream::{RandomStream, SplitPlan};

/// Counts observed at one checkpoint of a stream
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepResult {
    /// Items processed so far
    pub items: usize,
    /// Exact number of distinct items so far
    pub exact: usize,
    pub estimate: f64,
}

/// Run a single stream seeded with `seed` and return one result per checkpoint
pub fn run_stream(config: &ExperimentConfig, seed: u64) -> Result<Vec<StepResult>> {
    let stream = RandomStream::with_lengths(seed, config.min_len, config.max_len)?;
    let hasher = ItemHasher::new(
        config.hash_family,
        seed.wrapping_add(config.hash_seed_offset),
    );
    let mut sketch = HyperLogLog::with_correction(config.precision, config.correction)?;
    let mut exact = HashSet::with_capacity(config.total_items / 2);

    let plan = SplitPlan::by_percent(config.total_items, config.step_percent);
    let mut checkpoints = plan.boundaries().iter().copied().peekable();
    let mut results = Vec::with_capacity(plan.len());

    for (items, item) in (1..=config.total_items).zip(stream) {
        sketch.insert_hash(hasher.hash(item.as_bytes()));
        exact.insert(item);

        if checkpoints.next_if_eq(&items).is_some() {
            let step = StepResult {
                items,
                exact: exact.len(),
                estimate: sketch.estimate(),
            };
            debug!(seed, ?step, "checkpoint");
            results.push(step);
        }
    }

    Ok(results)
}

/// Run all streams of the experiment in order
pub fn run_trials(config: &ExperimentConfig) -> Result<Vec<Vec<StepResult>>> {
    config.validate()?;
    (0..config.streams)
        .map(|index| {
            let seed = config.stream_seed(index);
            let steps = run_stream(config, seed)?;
            if let Some(last) = steps.last() {
                info!(
                    stream = index,
                    seed,
                    exact = last.exact,
                    estimate = last.estimate,
                    "stream finished"
                );
            }
            Ok(steps)
        })
        .collect()
}

/// Hash uniformity report of a single seeded stream
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceReport {
    pub chi_square: f64,
    pub chi_square_buckets: usize,
    pub buckets: Vec<BucketBalance>,
}

/// Hash `config.items` random items and measure how evenly they spread over sketch registers
pub fn bucket_balance(config: &BalanceConfig, family: HashFamily) -> Result<BalanceReport> {
    config.validate()?;
    let hasher = ItemHasher::new(family, config.seed.wrapping_add(config.hash_seed_offset));
    let hashes: Vec<u64> = RandomStream::new(config.seed)
        .take(config.items)
        .map(|item| hasher.hash(item.as_bytes()))
        .collect();

    Ok(BalanceReport {
        chi_square: chi_square_uniformity(&hashes, config.chi_square_buckets),
        chi_square_buckets: config.chi_square_buckets,
        buckets: config
            .precisions
            .iter()
            .map(|&p| BucketBalance::measure(&hashes, p))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correction::{Correction, LogLogBeta};
    use test_case::test_case;

    fn small_config() -> ExperimentConfig {
        ExperimentConfig {
            total_items: 2_000,
            step_percent: 25.0,
            streams: 3,
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn test_run_stream_checkpoints() {
        let config = small_config();
        let steps = run_stream(&config, 1000).unwrap();
        let items: Vec<usize> = steps.iter().map(|s| s.items).collect();
        assert_eq!(items, vec![500, 1000, 1500, 2000]);

        for pair in steps.windows(2) {
            assert!(pair[0].exact <= pair[1].exact);
        }
        for step in &steps {
            assert!(step.exact <= step.items);
            // short items repeat, so distinct count stays below item count
            assert!(step.exact > step.items / 2);
            let relative_error = (step.estimate - step.exact as f64).abs() / step.exact as f64;
            assert!(relative_error < 0.2, "{step:?}");
        }
    }

    #[test]
    fn test_run_stream_is_deterministic() {
        let config = small_config();
        assert_eq!(
            run_stream(&config, 42).unwrap(),
            run_stream(&config, 42).unwrap()
        );
    }

    #[test_case(HashFamily::Mix64, Correction::default(); "mix64 classic")]
    #[test_case(HashFamily::WyHash, LogLogBeta.into(); "wyhash loglog-beta")]
    fn test_run_trials(hash_family: HashFamily, correction: Correction) {
        let config = ExperimentConfig {
            hash_family,
            correction,
            ..small_config()
        };
        let trials = run_trials(&config).unwrap();
        assert_eq!(trials.len(), 3);
        assert!(trials.iter().all(|steps| steps.len() == 4));
        assert_ne!(trials[0], trials[1]);
    }

    #[test]
    fn test_run_trials_rejects_invalid_config() {
        let config = ExperimentConfig {
            streams: 0,
            ..small_config()
        };
        assert!(run_trials(&config).is_err());
    }

    #[test]
    fn test_bucket_balance() {
        let report = bucket_balance(&BalanceConfig::default(), HashFamily::Mix64).unwrap();
        assert_eq!(report.chi_square_buckets, 256);
        assert!(report.chi_square > 0.0);
        let registers: Vec<usize> = report.buckets.iter().map(|b| b.buckets).collect();
        assert_eq!(registers, vec![256, 1024, 4096]);
        for balance in &report.buckets {
            assert_eq!(balance.mean, 20_000.0 / balance.buckets as f64);
            assert!(balance.min as f64 <= balance.mean);
            assert!(balance.max as f64 >= balance.mean);
        }
    }
}
