//! Seeded 64-bit hash functions used to feed stream items into the sketch,
//! and checks of how evenly they spread over buckets.

use std::fmt::{Display, Formatter};

/// FNV-1a offset basis, seeds the first lane
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
/// FNV-1a prime, seeds the second lane and multiplies the first one
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash function families available to experiments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashFamily {
    /// Two-lane FNV/rotate mix with murmur3 finalizer
    #[default]
    Mix64,
    /// `wyhash` with the seed passed through
    WyHash,
}

impl Display for HashFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HashFamily::Mix64 => f.write_str("mix64"),
            HashFamily::WyHash => f.write_str("wyhash"),
        }
    }
}

/// Seeded hash function drawn from a `HashFamily`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemHasher {
    family: HashFamily,
    seed: u64,
}

impl ItemHasher {
    pub fn new(family: HashFamily, seed: u64) -> Self {
        Self { family, seed }
    }

    #[inline]
    pub fn hash(&self, item: &[u8]) -> u64 {
        match self.family {
            HashFamily::Mix64 => mix64(item, self.seed),
            HashFamily::WyHash => wyhash::wyhash(item, self.seed),
        }
    }

    pub fn family(&self) -> HashFamily {
        self.family
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Two-lane seeded string hash.
///
/// Lane 1 is FNV-1a, lane 2 xors every byte and then rotates and scales the state.
/// Both lanes absorb the item length before being combined and finalized.
#[inline]
pub fn mix64(item: &[u8], seed: u64) -> u64 {
    let mut h1 = seed ^ FNV_OFFSET;
    let mut h2 = seed ^ FNV_PRIME;
    for &c in item {
        h1 ^= u64::from(c);
        h1 = h1.wrapping_mul(FNV_PRIME);
        h2 ^= u64::from(c);
        h2 = h2.rotate_left(13).wrapping_mul(5).wrapping_add(0x7b7d_159c);
    }
    let len = item.len() as u64;
    let len_mix = len.wrapping_mul(0xcc9e_2d51) ^ (len >> 32);
    h1 ^= len_mix;
    h2 ^= len_mix;

    finalize64(h1 ^ h2 ^ (len << 32))
}

/// MurmurHash3 64-bit finalizer
#[inline]
fn finalize64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}

/// Pearson's chi-square statistic of `hashes` spread over `h mod buckets`.
///
/// Returns 0 for empty input or zero buckets.
pub fn chi_square_uniformity(hashes: &[u64], buckets: usize) -> f64 {
    if hashes.is_empty() || buckets == 0 {
        return 0.0;
    }
    let mut counts = vec![0usize; buckets];
    for &h in hashes {
        counts[(h % buckets as u64) as usize] += 1;
    }
    let expected = hashes.len() as f64 / buckets as f64;
    counts
        .iter()
        .map(|&c| {
            let diff = c as f64 - expected;
            diff * diff / expected
        })
        .sum()
}

/// Distribution of hashes over the `2^precision` register indices of a sketch
#[derive(Debug, Clone, PartialEq)]
pub struct BucketBalance {
    pub precision: u8,
    pub buckets: usize,
    pub min: usize,
    pub mean: f64,
    pub max: usize,
}

impl BucketBalance {
    /// Count hashes per register index (top `precision` bits).
    ///
    /// `precision` must be in `1..=32`.
    pub fn measure(hashes: &[u64], precision: u8) -> Self {
        let buckets = 1usize << precision;
        let mut counts = vec![0usize; buckets];
        for &h in hashes {
            counts[(h >> (64 - u32::from(precision))) as usize] += 1;
        }
        Self {
            precision,
            buckets,
            min: counts.iter().copied().min().unwrap_or(0),
            mean: hashes.len() as f64 / buckets as f64,
            max: counts.iter().copied().max().unwrap_or(0),
        }
    }
}
