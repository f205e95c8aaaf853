//! Deterministic random number generation for fallback data.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! All synthetic data flows through FallbackRng instances derived
//! from the single fallback seed in EngineConfig.
//!
//! Each report slice gets its own RNG stream, seeded deterministically
//! from (fallback_seed XOR slot_index). This means:
//!   - Adding a new slice never changes existing slices' streams.
//!   - Each slice's synthetic data is fully reproducible in isolation.

use chrono::{Datelike, NaiveDate};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

const SLOT_SPREAD: u64 = 0x9e37_79b9_7f4a_7c15;

/// A named, deterministic RNG for a single fallback slice.
pub struct FallbackRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl FallbackRng {
    /// Create a slice RNG from the fallback seed and a stable slot index.
    /// The index must never change once assigned.
    pub fn new(seed: u64, slot_index: u64) -> Self {
        let derived_seed = seed ^ slot_index.wrapping_mul(SLOT_SPREAD);
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll a float in [lo, hi).
    pub fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Roll an integer in [lo, hi].
    pub fn range_u32(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_u64_below((hi - lo + 1) as u64) as u32
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick one element of a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let index = self.next_u64_below(items.len() as u64) as usize;
        &items[index]
    }
}

/// Hands out slice RNGs for one fallback seed.
#[derive(Debug, Clone, Copy)]
pub struct SeedBank {
    seed: u64,
}

impl SeedBank {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn for_slot(&self, slot: FallbackSlot) -> FallbackRng {
        FallbackRng::new(self.seed, slot as u64).with_name(slot.name())
    }

    /// A stream keyed by calendar date as well as slot, so a given day
    /// synthesizes the same values no matter which window asks for it.
    pub fn for_day(&self, slot: FallbackSlot, date: NaiveDate) -> FallbackRng {
        let day = date.num_days_from_ce() as u64;
        FallbackRng::new(self.seed ^ day.wrapping_mul(SLOT_SPREAD.rotate_left(17)), slot as u64)
            .with_name(slot.name())
    }
}

/// Stable fallback slot assignments.
/// NEVER reorder or remove entries. Only append.
/// Reordering changes every slice's synthetic data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum FallbackSlot {
    Loans        = 1,
    Interactions = 2,
    Promises     = 3,
    Performance  = 4,
    Trend        = 5,
}

impl FallbackSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loans        => "loans",
            Self::Interactions => "interactions",
            Self::Promises     => "promises",
            Self::Performance  => "performance",
            Self::Trend        => "trend",
        }
    }
}
