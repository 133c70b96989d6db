//! ## HyperLogLog sketch
//! Estimates cardinality of a stream of 64-bit hashes with `M = 2^P` registers.
//!
//! Registers are `W` bits wide and packed into a `u32` slice:
//! - data[0..]     - stores register ranks using `W` bits per each register.
//! - data[last]    - one extra element for branchless register updates (see `set_register`).
//!
//! Number of zero registers and registers' harmonic sum are updated as ranks change,
//! so `estimate` never scans the registers.
//!
//! [Original HyperLogLog paper](https://algo.inria.fr/flajolet/Publications/FlFuGaMe07.pdf)

use std::fmt::{Display, Formatter};
use std::mem::{size_of, size_of_val};

use crate::correction::{BiasCorrection, Correction, RegisterStats};
use crate::error::{ExperimentError, Result};

/// Smallest supported precision
pub const MIN_PRECISION: u8 = 4;
/// Largest supported precision
pub const MAX_PRECISION: u8 = 18;
/// Register width in bits, enough to hold ranks up to `64 - P + 1`
const W: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct HyperLogLog {
    precision: u8,
    registers: Vec<u32>,
    zeros: usize,
    harmonic_sum: f64,
    correction: Correction,
}

impl HyperLogLog {
    /// Create new sketch with `2^precision` registers and classic bias correction
    pub fn new(precision: u8) -> Result<Self> {
        Self::with_correction(precision, Correction::default())
    }

    /// Create new sketch with `2^precision` registers and given bias correction
    pub fn with_correction(precision: u8, correction: Correction) -> Result<Self> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(ExperimentError::InvalidPrecision(precision));
        }
        let m = 1usize << precision;
        Ok(Self {
            precision,
            registers: vec![0u32; m * W / 32 + 1],
            zeros: m,
            harmonic_sum: m as f64,
            correction,
        })
    }

    /// Insert 64-bit hash into the sketch.
    ///
    /// The top `P` bits select the register, the rank is the number of leading zeros
    /// in the remaining bits plus one.
    #[inline]
    pub fn insert_hash(&mut self, hash: u64) {
        let p = u32::from(self.precision);
        let idx = (hash >> (64 - p)) as usize;
        let max_rank = 64 - p + 1;
        let rank = ((hash << p).leading_zeros() + 1).min(max_rank);
        self.update_rank(idx, rank);
    }

    /// Return cardinality estimate
    #[inline]
    pub fn estimate(&self) -> f64 {
        self.correction.estimate(&self.stats())
    }

    /// Merge `rhs` into `self` by taking the maximum rank of every register
    pub fn merge(&mut self, rhs: &HyperLogLog) -> Result<()> {
        if self.precision != rhs.precision {
            return Err(ExperimentError::PrecisionMismatch {
                lhs: self.precision,
                rhs: rhs.precision,
            });
        }
        for idx in 0..self.register_count() {
            self.update_rank(idx, get_register::<W>(&rhs.registers, idx));
        }
        Ok(())
    }

    /// Reset all registers to zero
    pub fn clear(&mut self) {
        self.registers.fill(0);
        self.zeros = self.register_count();
        self.harmonic_sum = self.register_count() as f64;
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn register_count(&self) -> usize {
        1 << self.precision
    }

    pub fn correction(&self) -> Correction {
        self.correction
    }

    /// Return rank stored in `idx` register
    pub fn register(&self, idx: usize) -> u32 {
        get_register::<W>(&self.registers, idx)
    }

    /// Iterate over all register ranks
    pub fn registers(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.register_count()).map(|idx| self.register(idx))
    }

    /// Return register summary used by the bias correction
    pub fn stats(&self) -> RegisterStats {
        RegisterStats {
            precision: self.precision,
            registers: self.register_count(),
            zeros: self.zeros,
            harmonic_sum: self.harmonic_sum,
        }
    }

    /// Return memory size of `HyperLogLog`
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(self.registers.as_slice())
    }

    /// Update register `idx` if `new_rank` is larger than the stored one
    #[inline]
    fn update_rank(&mut self, idx: usize, new_rank: u32) {
        let old_rank = get_register::<W>(&self.registers, idx);
        if new_rank > old_rank {
            set_register::<W>(&mut self.registers, idx, new_rank);
            if old_rank == 0 {
                self.zeros -= 1;
            }
            self.harmonic_sum += inv_pow2(new_rank) - inv_pow2(old_rank);
        }
    }
}

impl Display for HyperLogLog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, correction: {}, estimate: {:.0}, size: {} }}",
            self.precision,
            self.correction.name(),
            self.estimate(),
            self.size_of()
        )
    }
}

#[inline]
fn inv_pow2(rank: u32) -> f64 {
    0.5f64.powi(rank as i32)
}

/// Get HyperLogLog `idx` register
#[inline]
fn get_register<const W: usize>(data: &[u32], idx: usize) -> u32 {
    let bit_idx = idx * W;
    let u32_idx = bit_idx / 32;
    let bit_pos = bit_idx % 32;
    let bits = &data[u32_idx..u32_idx + 2];
    let bits_1 = W.min(32 - bit_pos);
    let bits_2 = W - bits_1;
    let mask_1 = (1 << bits_1) - 1;
    let mask_2 = (1 << bits_2) - 1;

    ((bits[0] >> bit_pos) & mask_1) | ((bits[1] & mask_2) << bits_1)
}

/// Set HyperLogLog `idx` register to new value `rank`
#[inline]
fn set_register<const W: usize>(data: &mut [u32], idx: usize, new_rank: u32) {
    let bit_idx = idx * W;
    let u32_idx = bit_idx / 32;
    let bit_pos = bit_idx % 32;
    let bits = &mut data[u32_idx..u32_idx + 2];
    let bits_1 = W.min(32 - bit_pos);
    let bits_2 = W - bits_1;
    let mask_1 = (1 << bits_1) - 1;
    let mask_2 = (1 << bits_2) - 1;

    // Unconditionally update two `u32` elements based on `new_rank` bits and masks
    bits[0] &= !(mask_1 << bit_pos);
    bits[0] |= (new_rank & mask_1) << bit_pos;
    bits[1] &= !mask_2;
    bits[1] |= (new_rank >> bits_1) & mask_2;
}
