//! Pointwise statistics across streams.
//!
//! Streams are aligned by position in their sorted step sequence, so every stream
//! must have the same number of checkpoints.

use crate::error::{ExperimentError, Result};
use crate::experiment::StepResult;
use crate::records::{round_millis, SummaryRecord, TrialGroups};

/// Relative standard error factor of HyperLogLog: `1.04 / sqrt(M)`
pub const RSE_LOW_FACTOR: f64 = 1.04;
/// Wider factor used as the outer theoretical band: `1.3 / sqrt(M)`
pub const RSE_HIGH_FACTOR: f64 = 1.3;

/// Relative standard error of a sketch with `2^precision` registers
pub fn relative_standard_error(factor: f64, precision: u8) -> f64 {
    factor / ((1u64 << precision) as f64).sqrt()
}

/// Mean exact count over all streams at every step
#[derive(Debug, Clone, PartialEq)]
pub struct MeanExact {
    pub steps: Vec<u32>,
    /// Item counts of the last stream in stream id order
    pub items: Vec<u64>,
    pub exact: Vec<f64>,
}

/// Average the exact counts of all streams step by step.
///
/// Returns `None` when there are no streams.
pub fn mean_exact(groups: &TrialGroups) -> Result<Option<MeanExact>> {
    let Some(first) = groups.values().next() else {
        return Ok(None);
    };
    let steps: Vec<u32> = first.iter().map(|r| r.step_index).collect();
    let mut items = vec![0; steps.len()];
    let mut exact = vec![0.0; steps.len()];

    for (&stream_id, records) in groups {
        if records.len() != steps.len() {
            return Err(ExperimentError::StepCountMismatch {
                stream_id,
                expected: steps.len(),
                actual: records.len(),
            });
        }
        for (i, record) in records.iter().enumerate() {
            exact[i] += record.exact as f64;
            items[i] = record.items;
        }
    }

    let streams = groups.len() as f64;
    exact.iter_mut().for_each(|v| *v /= streams);

    Ok(Some(MeanExact {
        steps,
        items,
        exact,
    }))
}

/// Symmetric multiplicative band `mean * (1 ± rse)`
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBand {
    pub factor: f64,
    pub rse: f64,
    pub low: Vec<f64>,
    pub high: Vec<f64>,
}

impl ErrorBand {
    pub fn around(mean: &[f64], factor: f64, precision: u8) -> Self {
        let rse = relative_standard_error(factor, precision);
        Self {
            factor,
            rse,
            low: mean.iter().map(|v| v * (1.0 - rse)).collect(),
            high: mean.iter().map(|v| v * (1.0 + rse)).collect(),
        }
    }

    pub fn label(&self) -> String {
        format!("theory ±{}/√(2^p)", self.factor)
    }
}

/// Inner (`1.04`) and outer (`1.3`) theoretical bands around the mean exact count
pub fn theory_bands(mean: &MeanExact, precision: u8) -> [ErrorBand; 2] {
    [
        ErrorBand::around(&mean.exact, RSE_LOW_FACTOR, precision),
        ErrorBand::around(&mean.exact, RSE_HIGH_FACTOR, precision),
    ]
}

/// Mean and population standard deviation of the estimate at every step,
/// rounded to three decimals.
///
/// Item counts are taken from the first stream.
pub fn summarize(trials: &[Vec<StepResult>]) -> Result<Vec<SummaryRecord>> {
    let Some(first) = trials.first() else {
        return Ok(Vec::new());
    };
    if let Some((stream_id, steps)) = trials
        .iter()
        .enumerate()
        .find(|(_, steps)| steps.len() != first.len())
    {
        return Err(ExperimentError::StepCountMismatch {
            stream_id: stream_id as u32,
            expected: first.len(),
            actual: steps.len(),
        });
    }

    let n = trials.len() as f64;
    let rows = first
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let mean = trials.iter().map(|steps| steps[i].estimate).sum::<f64>() / n;
            let variance = trials
                .iter()
                .map(|steps| {
                    let diff = steps[i].estimate - mean;
                    diff * diff
                })
                .sum::<f64>()
                / n;
            SummaryRecord {
                step_index: i as u32,
                items: step.items as u64,
                mean: round_millis(mean),
                stddev: round_millis(variance.sqrt()),
            }
        })
        .collect();

    Ok(rows)
}
