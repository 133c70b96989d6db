//! Seeded generator of random string items and the checkpoint plan used to sample a stream.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{ExperimentError, Result};

/// Characters items are drawn from
pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-";
pub const DEFAULT_MIN_LEN: usize = 1;
pub const DEFAULT_MAX_LEN: usize = 30;

/// Infinite iterator of random strings with uniformly distributed length and characters.
#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: StdRng,
    lengths: Uniform<usize>,
    chars: Uniform<usize>,
}

impl RandomStream {
    /// Create stream of strings with default length range `[1..30]`
    pub fn new(seed: u64) -> Self {
        Self::build(seed, DEFAULT_MIN_LEN, DEFAULT_MAX_LEN)
    }

    /// Create stream of strings with length in `[min_len..max_len]` range
    pub fn with_lengths(seed: u64, min_len: usize, max_len: usize) -> Result<Self> {
        if min_len > max_len {
            return Err(ExperimentError::Config(format!(
                "minimum item length {min_len} exceeds maximum {max_len}"
            )));
        }
        Ok(Self::build(seed, min_len, max_len))
    }

    fn build(seed: u64, min_len: usize, max_len: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            lengths: Uniform::new_inclusive(min_len, max_len),
            chars: Uniform::new(0, ALPHABET.len()),
        }
    }

    /// Generate next item
    pub fn next_item(&mut self) -> String {
        let len = self.lengths.sample(&mut self.rng);
        (0..len)
            .map(|_| char::from(ALPHABET[self.chars.sample(&mut self.rng)]))
            .collect()
    }

    /// Generate `count` items
    pub fn next_batch(&mut self, count: usize) -> Vec<String> {
        self.by_ref().take(count).collect()
    }
}

impl Iterator for RandomStream {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_item())
    }
}

/// Item counts at which a stream is sampled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitPlan {
    boundaries: Vec<usize>,
}

impl SplitPlan {
    /// Split `total` items into checkpoints every `step_percent` percent.
    ///
    /// Checkpoints are rounded to the nearest item, strictly increasing, never zero,
    /// and the last one is always `total`. Steps shorter than one item are widened to one item.
    /// Plan is empty when there is nothing to split.
    pub fn by_percent(total: usize, step_percent: f64) -> Self {
        let mut boundaries: Vec<usize> = Vec::new();
        if total == 0 || !step_percent.is_finite() || step_percent <= 0.0 {
            return Self { boundaries };
        }

        let step = (step_percent / 100.0).max(1.0 / total as f64);
        let steps = (1.0 / step + 1e-9).floor() as usize;
        for k in 1..=steps {
            let boundary = (k as f64 * step * total as f64 + 0.5) as usize;
            if boundary > boundaries.last().copied().unwrap_or(0) && boundary <= total {
                boundaries.push(boundary);
            }
        }
        if boundaries.last() != Some(&total) {
            boundaries.push(total);
        }

        Self { boundaries }
    }

    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(50_000, 10.0 => vec![5_000, 10_000, 15_000, 20_000, 25_000, 30_000, 35_000, 40_000, 45_000, 50_000]; "default plan")]
    #[test_case(10, 25.0 => vec![3, 5, 8, 10]; "rounded boundaries")]
    #[test_case(3, 10.0 => vec![1, 2, 3]; "duplicates and zero skipped")]
    #[test_case(7, 150.0 => vec![7]; "step above total")]
    #[test_case(4, 1e-300 => vec![1, 2, 3, 4]; "step below one item")]
    #[test_case(100, 30.0 => vec![30, 60, 90, 100]; "total appended")]
    #[test_case(0, 10.0 => Vec::<usize>::new(); "no items")]
    #[test_case(100, 0.0 => Vec::<usize>::new(); "zero step")]
    #[test_case(100, -5.0 => Vec::<usize>::new(); "negative step")]
    #[test_case(100, f64::NAN => Vec::<usize>::new(); "nan step")]
    fn test_split_by_percent(total: usize, step_percent: f64) -> Vec<usize> {
        SplitPlan::by_percent(total, step_percent).boundaries().to_vec()
    }

    #[test]
    fn test_same_seed_same_items() {
        let a = RandomStream::new(1000).next_batch(100);
        let b = RandomStream::new(1000).next_batch(100);
        let c = RandomStream::new(1097).next_batch(100);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_items_within_bounds() {
        let items = RandomStream::new(7).next_batch(2_000);
        assert_eq!(items.len(), 2_000);
        for item in &items {
            assert!((DEFAULT_MIN_LEN..=DEFAULT_MAX_LEN).contains(&item.len()));
            assert!(item.bytes().all(|b| ALPHABET.contains(&b)));
        }
        assert!(items.iter().any(|i| i.len() == DEFAULT_MIN_LEN));
        assert!(items.iter().any(|i| i.len() == DEFAULT_MAX_LEN));
    }

    #[test]
    fn test_fixed_length() {
        let mut stream = RandomStream::with_lengths(3, 5, 5).unwrap();
        assert!(stream.next_batch(50).iter().all(|i| i.len() == 5));
    }

    #[test]
    fn test_invalid_lengths() {
        assert!(matches!(
            RandomStream::with_lengths(3, 6, 5),
            Err(ExperimentError::Config(_))
        ));
    }
}
