//! CSV records exchanged between the experiment and the plots.
//!
//! - `graph1_data.csv`: one `TrialRecord` per stream checkpoint.
//! - `graph2_stats.csv`: one `SummaryRecord` per checkpoint, aggregated over streams.
//!
//! Experiment results are rounded to three decimals when they become records. Records are
//! written as they are, so loaded files round-trip unchanged. Readers trim whitespace around fields.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExperimentError, Result};
use crate::experiment::StepResult;

pub const TRIAL_HEADERS: [&str; 5] = ["stream_id", "step_index", "items", "exact", "estimate"];
pub const SUMMARY_HEADERS: [&str; 4] = ["step_index", "items", "mean_estimate", "stddev_estimate"];

/// Exact and estimated distinct counts of one stream at one checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub stream_id: u32,
    pub step_index: u32,
    pub items: u64,
    pub exact: u64,
    pub estimate: f64,
}

impl TrialRecord {
    pub fn from_step(stream_id: u32, step_index: u32, step: &StepResult) -> Self {
        Self {
            stream_id,
            step_index,
            items: step.items as u64,
            exact: step.exact as u64,
            estimate: round_millis(step.estimate),
        }
    }
}

/// Round to three decimals
pub fn round_millis(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Mean and standard deviation of the estimate over all streams at one checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub step_index: u32,
    pub items: u64,
    #[serde(rename = "mean_estimate")]
    pub mean: f64,
    #[serde(rename = "stddev_estimate")]
    pub stddev: f64,
}

impl SummaryRecord {
    /// Lower edge of the `mean ± stddev` band
    pub fn lower(&self) -> f64 {
        self.mean - self.stddev
    }

    /// Upper edge of the `mean ± stddev` band
    pub fn upper(&self) -> f64 {
        self.mean + self.stddev
    }
}

/// Trial records grouped by stream id, each group sorted by step index
pub type TrialGroups = BTreeMap<u32, Vec<TrialRecord>>;

/// Convert per-stream step results into trial records, numbering streams and steps from 0
pub fn trial_records(trials: &[Vec<StepResult>]) -> Vec<TrialRecord> {
    trials
        .iter()
        .enumerate()
        .flat_map(|(stream_id, steps)| {
            steps.iter().enumerate().map(move |(step_index, step)| {
                TrialRecord::from_step(stream_id as u32, step_index as u32, step)
            })
        })
        .collect()
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Read trial records and group them by stream
pub fn read_trials<R: Read>(reader: R) -> Result<TrialGroups> {
    let mut groups = TrialGroups::new();
    for row in csv_reader(reader).deserialize() {
        let record: TrialRecord = row?;
        groups.entry(record.stream_id).or_default().push(record);
    }

    for (&stream_id, records) in groups.iter_mut() {
        records.sort_by_key(|r| r.step_index);
        if let Some(pair) = records
            .windows(2)
            .find(|pair| pair[0].step_index == pair[1].step_index)
        {
            return Err(ExperimentError::DuplicateStep {
                stream_id,
                step_index: pair[0].step_index,
            });
        }
    }

    Ok(groups)
}

/// Read summary records sorted by step index
pub fn read_summary<R: Read>(reader: R) -> Result<Vec<SummaryRecord>> {
    let mut rows = csv_reader(reader)
        .deserialize()
        .collect::<std::result::Result<Vec<SummaryRecord>, _>>()?;
    rows.sort_by_key(|r| r.step_index);
    Ok(rows)
}

pub fn write_trials<'a, W: Write>(
    writer: W,
    records: impl IntoIterator<Item = &'a TrialRecord>,
) -> Result<()> {
    write_records(writer, TRIAL_HEADERS, records)
}

pub fn write_summary<'a, W: Write>(
    writer: W,
    rows: impl IntoIterator<Item = &'a SummaryRecord>,
) -> Result<()> {
    write_records(writer, SUMMARY_HEADERS, rows)
}

/// Header row is written even when there are no records
fn write_records<'a, W: Write, T: Serialize + 'a>(
    writer: W,
    headers: impl IntoIterator<Item = &'static str>,
    records: impl IntoIterator<Item = &'a T>,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(headers)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_trials(path: &Path) -> Result<TrialGroups> {
    read_trials(File::open(path)?)
}

pub fn load_summary(path: &Path) -> Result<Vec<SummaryRecord>> {
    read_summary(File::open(path)?)
}

pub fn save_trials<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a TrialRecord>,
) -> Result<()> {
    write_trials(File::create(path)?, records)
}

pub fn save_summary<'a>(
    path: &Path,
    rows: impl IntoIterator<Item = &'a SummaryRecord>,
) -> Result<()> {
    write_summary(File::create(path)?, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIALS_CSV: &str = "\
stream_id,step_index,items,exact,estimate
0,0,5000,4998,5012.345
0,1,10000,9990,9871.5
1,0,5000,4997,4950.0
1,1,10000,9987,10102.125
";

    const SUMMARY_CSV: &str = "\
step_index,items,mean_estimate,stddev_estimate
0,5000,4981.173,31.173
1,10000,9986.813,115.313
";

    fn capture(write: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        write(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_trials_round_trip() {
        let groups = read_trials(TRIALS_CSV.as_bytes()).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.values().map(Vec::len).sum::<usize>(), 4);
        assert_eq!(
            groups[&1][1],
            TrialRecord {
                stream_id: 1,
                step_index: 1,
                items: 10000,
                exact: 9987,
                estimate: 10102.125,
            }
        );

        let written = capture(|buf| write_trials(buf, groups.values().flatten()));
        assert_eq!(written, TRIALS_CSV);
    }

    #[test]
    fn test_extra_decimals_preserved() {
        let csv = "stream_id,step_index,items,exact,estimate\n0,0,10,9,9.87654\n";
        let groups = read_trials(csv.as_bytes()).unwrap();
        let written = capture(|buf| write_trials(buf, groups.values().flatten()));
        assert_eq!(written, csv);
        assert_eq!(read_trials(written.as_bytes()).unwrap(), groups);
    }

    #[test]
    fn test_empty_files_keep_headers() {
        let written = capture(|buf| write_trials(buf, &[]));
        assert_eq!(written, "stream_id,step_index,items,exact,estimate\n");
        let written = capture(|buf| write_summary(buf, &[]));
        assert_eq!(written, "step_index,items,mean_estimate,stddev_estimate\n");
    }

    #[test]
    fn test_step_estimate_rounded() {
        let step = StepResult {
            items: 10,
            exact: 9,
            estimate: 9.87654,
        };
        assert_eq!(TrialRecord::from_step(0, 0, &step).estimate, 9.877);
        assert_eq!(round_millis(10.12345), 10.123);
    }

    #[test]
    fn test_summary_round_trip() {
        let rows = read_summary(SUMMARY_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].mean, 4981.173);
        assert_eq!(rows[1].stddev, 115.313);

        let written = capture(|buf| write_summary(buf, &rows));
        assert_eq!(written, SUMMARY_CSV);
    }

    #[test]
    fn test_trials_grouped_and_sorted() {
        let csv = "\
stream_id,step_index,items,exact,estimate
1,1,20,19,18.5
0,1,20,20,21.0
1,0,10,10,10.0
0,0,10,9,9.5
";
        let groups = read_trials(csv.as_bytes()).unwrap();
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        for records in groups.values() {
            let steps: Vec<u32> = records.iter().map(|r| r.step_index).collect();
            assert_eq!(steps, vec![0, 1]);
        }
        assert_eq!(groups[&0][0].exact, 9);
    }

    #[test]
    fn test_summary_sorted() {
        let csv = "\
step_index,items,mean_estimate,stddev_estimate
1,20,19.0,1.0
0,10,10.0,0.5
";
        let rows = read_summary(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].step_index, 0);
        assert_eq!(rows[1].items, 20);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let csv = "stream_id, step_index, items, exact, estimate\n0, 0, 10, 9, 9.5\n";
        let groups = read_trials(csv.as_bytes()).unwrap();
        assert_eq!(groups[&0][0].estimate, 9.5);
    }

    #[test]
    fn test_duplicate_step_rejected() {
        let csv = "stream_id,step_index,items,exact,estimate\n3,0,10,9,9.5\n3,0,20,19,19.5\n";
        assert!(matches!(
            read_trials(csv.as_bytes()),
            Err(ExperimentError::DuplicateStep {
                stream_id: 3,
                step_index: 0
            })
        ));
    }

    #[test]
    fn test_malformed_row_rejected() {
        let csv = "stream_id,step_index,items,exact,estimate\n0,0,ten,9,9.5\n";
        assert!(matches!(
            read_trials(csv.as_bytes()),
            Err(ExperimentError::Csv(_))
        ));

        let csv = "step_index,items,mean_estimate\n0,10,9.5\n";
        assert!(matches!(
            read_summary(csv.as_bytes()),
            Err(ExperimentError::Csv(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_trials(Path::new("definitely/not/here.csv")),
            Err(ExperimentError::Io(_))
        ));
    }

    #[test]
    fn test_trial_records_numbering() {
        let step = |items, exact, estimate| StepResult {
            items,
            exact,
            estimate,
        };
        let trials = vec![
            vec![step(10, 10, 10.2), step(20, 19, 18.7)],
            vec![step(10, 9, 9.1), step(20, 20, 20.4)],
        ];
        let records = trial_records(&trials);
        let ids: Vec<(u32, u32)> = records
            .iter()
            .map(|r| (r.stream_id, r.step_index))
            .collect();
        assert_eq!(ids, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(records[3].estimate, 20.4);
    }

    #[test]
    fn test_summary_band() {
        let row = SummaryRecord {
            step_index: 0,
            items: 10,
            mean: 105.0,
            stddev: 5.0,
        };
        assert_eq!(row.lower(), 100.0);
        assert_eq!(row.upper(), 110.0);
    }
}
