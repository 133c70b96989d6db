use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while running experiments, loading their results or rendering charts.
#[derive(Error, Debug)]
pub enum ExperimentError {
    /// Sketch precision outside of the supported `[4..18]` range.
    #[error("precision {0} is outside the supported range 4..=18")]
    InvalidPrecision(u8),

    /// Two sketches with different precision cannot be merged.
    #[error("cannot merge sketches with precision {lhs} and {rhs}")]
    PrecisionMismatch { lhs: u8, rhs: u8 },

    /// A configuration value is missing or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A CSV file could not be parsed or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A stream lists the same step index twice.
    #[error("stream {stream_id} repeats step index {step_index}")]
    DuplicateStep { stream_id: u32, step_index: u32 },

    /// Streams do not share the same step sequence length.
    #[error("stream {stream_id} has {actual} steps, expected {expected}")]
    StepCountMismatch {
        stream_id: u32,
        expected: usize,
        actual: usize,
    },

    /// A chart could not be drawn or saved.
    #[error("failed to render {path}: {message}")]
    Render { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ExperimentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ExperimentError::InvalidPrecision(3).to_string(),
            "precision 3 is outside the supported range 4..=18"
        );
        assert_eq!(
            ExperimentError::StepCountMismatch {
                stream_id: 2,
                expected: 10,
                actual: 9
            }
            .to_string(),
            "stream 2 has 9 steps, expected 10"
        );
    }
}
