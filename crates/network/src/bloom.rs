// Path: crates/network/src/bloom.rs
//! A seeded bloom filter over 64-bit values with a stable wire format.
//!
//! Each filter carries 1..=16 random seeds; an element sets (and is probed
//! at) one bit per seed, derived by mixing the element with the seed. The
//! wire format is `[num_seeds: u8][seeds: u64-le ...][entry bytes]`, so a
//! parsed filter re-marshals to identical bytes.

use rand::Rng;
use thiserror::Error;
use trellis_types::ErrorCode;

/// The fewest seeds a filter may carry.
pub const MIN_SEEDS: usize = 1;

/// The most seeds a filter may carry.
pub const MAX_SEEDS: usize = 16;

/// Errors constructing or parsing a filter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BloomError {
    /// Fewer than [`MIN_SEEDS`] seeds.
    #[error("bloom filter needs at least {MIN_SEEDS} seed")]
    TooFewSeeds,
    /// More than [`MAX_SEEDS`] seeds.
    #[error("bloom filter supports at most {MAX_SEEDS} seeds")]
    TooManySeeds,
    /// No entry bytes at all.
    #[error("bloom filter needs at least one entry byte")]
    TooFewEntries,
    /// The marshaled bytes are truncated or inconsistent.
    #[error("malformed bloom filter bytes")]
    Malformed,
}

impl ErrorCode for BloomError {
    fn code(&self) -> &'static str {
        match self {
            Self::TooFewSeeds => "BLOOM_TOO_FEW_SEEDS",
            Self::TooManySeeds => "BLOOM_TOO_MANY_SEEDS",
            Self::TooFewEntries => "BLOOM_TOO_FEW_ENTRIES",
            Self::Malformed => "BLOOM_MALFORMED",
        }
    }
}

/// A bloom filter over `u64` values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    seeds: Vec<u64>,
    entries: Vec<u8>,
    count: usize,
}

/// The (num_seeds, num_bytes) minimizing memory for an expected `count`
/// elements at the target false-positive probability.
pub fn optimal_parameters(count: usize, false_positive_probability: f64) -> (usize, usize) {
    let count = count.max(1) as f64;
    let p = false_positive_probability.clamp(f64::MIN_POSITIVE, 0.5);

    let ln2 = std::f64::consts::LN_2;
    let num_bits = (-count * p.ln() / (ln2 * ln2)).ceil().max(8.0);
    let num_bytes = (num_bits / 8.0).ceil() as usize;
    let num_seeds = ((num_bits / count) * ln2).round() as usize;
    (num_seeds.clamp(MIN_SEEDS, MAX_SEEDS), num_bytes)
}

impl Filter {
    /// An empty filter with `num_seeds` fresh random seeds over `num_bytes`
    /// bytes of entries.
    pub fn new(num_seeds: usize, num_bytes: usize) -> Result<Self, BloomError> {
        if num_seeds < MIN_SEEDS {
            return Err(BloomError::TooFewSeeds);
        }
        if num_seeds > MAX_SEEDS {
            return Err(BloomError::TooManySeeds);
        }
        if num_bytes < 1 {
            return Err(BloomError::TooFewEntries);
        }
        let mut rng = rand::thread_rng();
        Ok(Self {
            seeds: (0..num_seeds).map(|_| rng.gen()).collect(),
            entries: vec![0; num_bytes],
            count: 0,
        })
    }

    /// The (num_seeds, num_bytes) this filter was built with.
    pub fn parameters(&self) -> (usize, usize) {
        (self.seeds.len(), self.entries.len())
    }

    /// How many elements have been added.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Adds an element.
    pub fn add(&mut self, value: u64) {
        let num_bits = (self.entries.len() * 8) as u64;
        for seed in &self.seeds {
            let bit = mix(value, *seed) % num_bits;
            self.entries[(bit / 8) as usize] |= 1 << (bit % 8);
        }
        self.count += 1;
    }

    /// Whether an element is (probably) present. Never a false negative.
    pub fn contains(&self, value: u64) -> bool {
        let num_bits = (self.entries.len() * 8) as u64;
        self.seeds.iter().all(|seed| {
            let bit = mix(value, *seed) % num_bits;
            self.entries[(bit / 8) as usize] & (1 << (bit % 8)) != 0
        })
    }

    /// The stable wire form of this filter.
    pub fn marshal(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.seeds.len() * 8 + self.entries.len());
        bytes.push(self.seeds.len() as u8);
        for seed in &self.seeds {
            bytes.extend_from_slice(&seed.to_le_bytes());
        }
        bytes.extend_from_slice(&self.entries);
        bytes
    }

    /// Parses a filter from its wire form. The parsed filter reports a
    /// count of zero: additions are not part of the wire format, only their
    /// bits.
    pub fn parse(bytes: &[u8]) -> Result<Self, BloomError> {
        let (&num_seeds, rest) = bytes.split_first().ok_or(BloomError::Malformed)?;
        let num_seeds = num_seeds as usize;
        if num_seeds < MIN_SEEDS {
            return Err(BloomError::TooFewSeeds);
        }
        if num_seeds > MAX_SEEDS {
            return Err(BloomError::TooManySeeds);
        }
        if rest.len() < num_seeds * 8 + 1 {
            return Err(BloomError::Malformed);
        }
        let (seed_bytes, entries) = rest.split_at(num_seeds * 8);
        let seeds = seed_bytes
            .chunks_exact(8)
            .map(|chunk| u64::from_le_bytes(chunk.try_into().expect("8-byte chunk")))
            .collect();
        Ok(Self {
            seeds,
            entries: entries.to_vec(),
            count: 0,
        })
    }
}

/// A fixed 64-bit finalizer (splitmix64) over the element salted with the
/// seed. The quality of the low bits matters: they pick the bit index.
fn mix(value: u64, seed: u64) -> u64 {
    let mut z = value ^ seed;
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
