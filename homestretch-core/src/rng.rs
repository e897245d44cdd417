//! Injected randomness for the stamina policies.
//!
//! Every policy owns its generator; nothing here is global. Samples derive
//! their seeds from the batch seed so results do not depend on scheduling.
use hmac::{Hmac, Mac};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;
use std::cell::Cell;
use std::rc::Rc;

use crate::numbers::scale_unit_to_u32;

const TWO_POW_32: f64 = 4_294_967_296.0;

/// Deterministic random source consumed by the policies.
pub trait Prng {
    /// Uniform 32-bit integer.
    fn int32(&mut self) -> u32;

    /// Uniform float in `[0, 1)`.
    fn random(&mut self) -> f64;

    /// Uniform integer in `[0, upper)`. Returns 0 when `upper` is 0.
    fn uniform(&mut self, upper: u32) -> u32;
}

impl<P: Prng + ?Sized> Prng for Box<P> {
    fn int32(&mut self) -> u32 {
        (**self).int32()
    }

    fn random(&mut self) -> f64 {
        (**self).random()
    }

    fn uniform(&mut self, upper: u32) -> u32 {
        (**self).uniform(upper)
    }
}

/// Rule 30 elementary cellular automaton on a 64-cell ring.
///
/// Each output bit is the centre cell of one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule30Rng {
    cells: u64,
}

impl Rule30Rng {
    const CENTRE: u32 = 32;
    const FALLBACK_SEED: u64 = 1 << Self::CENTRE;

    #[must_use]
    pub const fn new(seed: u64) -> Self {
        // An all-zero ring is a fixed point.
        let cells = if seed == 0 { Self::FALLBACK_SEED } else { seed };
        Self { cells }
    }

    fn step(&mut self) -> u64 {
        let s = self.cells;
        self.cells = s.rotate_right(1) ^ (s | s.rotate_left(1));
        (self.cells >> Self::CENTRE) & 1
    }
}

impl Prng for Rule30Rng {
    fn int32(&mut self) -> u32 {
        let mut out = 0_u32;
        for _ in 0..32 {
            out = (out << 1) | u32::from(self.step() == 1);
        }
        out
    }

    fn random(&mut self) -> f64 {
        f64::from(self.int32()) / TWO_POW_32
    }

    fn uniform(&mut self, upper: u32) -> u32 {
        if upper == 0 {
            return 0;
        }
        let mask = u64::from(upper).next_power_of_two() - 1;
        loop {
            let candidate = u64::from(self.int32()) & mask;
            if candidate < u64::from(upper) {
                return u32::try_from(candidate).unwrap_or(0);
            }
        }
    }
}

/// ChaCha20-backed source for callers that want a vetted stream cipher.
#[derive(Debug, Clone)]
pub struct ChaChaPrng {
    rng: ChaCha20Rng,
}

impl ChaChaPrng {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl Prng for ChaChaPrng {
    fn int32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn random(&mut self) -> f64 {
        f64::from(self.rng.next_u32()) / TWO_POW_32
    }

    fn uniform(&mut self, upper: u32) -> u32 {
        if upper == 0 {
            return 0;
        }
        self.rng.gen_range(0..upper)
    }
}

/// Replays a fixed list of unit values, wrapping around at the end.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencePrng {
    values: Vec<f64>,
    cursor: usize,
}

impl SequencePrng {
    /// Values are clamped into `[0, 1)`; an empty list replays `0.5`.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        let mut values: Vec<f64> = values
            .into_iter()
            .map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0 - f64::EPSILON) })
            .collect();
        if values.is_empty() {
            values.push(0.5);
        }
        Self { values, cursor: 0 }
    }

    fn next_value(&mut self) -> f64 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor = (self.cursor + 1) % self.values.len();
        value
    }
}

impl Prng for SequencePrng {
    fn int32(&mut self) -> u32 {
        let value = self.next_value();
        scale_unit_to_u32(value, u32::MAX)
    }

    fn random(&mut self) -> f64 {
        self.next_value()
    }

    fn uniform(&mut self, upper: u32) -> u32 {
        let value = self.next_value();
        scale_unit_to_u32(value, upper)
    }
}

/// Per-method draw tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawCounts {
    pub int32: u64,
    pub random: u64,
    pub uniform: u64,
}

impl DrawCounts {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.int32
            .saturating_add(self.random)
            .saturating_add(self.uniform)
    }
}

/// Counting wrapper for a random source.
///
/// The tallies live behind a shared handle so the driver can read them after
/// the generator has been moved into a boxed policy.
#[derive(Debug, Clone)]
pub struct CountingPrng<P> {
    inner: P,
    counts: Rc<Cell<DrawCounts>>,
}

impl<P: Prng> CountingPrng<P> {
    #[must_use]
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            counts: Rc::new(Cell::new(DrawCounts::default())),
        }
    }

    /// Draws performed so far.
    #[must_use]
    pub fn counts(&self) -> DrawCounts {
        self.counts.get()
    }

    /// Handle that keeps reporting after `self` is moved.
    #[must_use]
    pub fn counter(&self) -> DrawCounter {
        DrawCounter {
            counts: Rc::clone(&self.counts),
        }
    }

    fn record(&self, apply: impl FnOnce(&mut DrawCounts)) {
        let mut counts = self.counts.get();
        apply(&mut counts);
        self.counts.set(counts);
    }
}

impl<P: Prng> Prng for CountingPrng<P> {
    fn int32(&mut self) -> u32 {
        self.record(|c| c.int32 = c.int32.saturating_add(1));
        self.inner.int32()
    }

    fn random(&mut self) -> f64 {
        self.record(|c| c.random = c.random.saturating_add(1));
        self.inner.random()
    }

    fn uniform(&mut self, upper: u32) -> u32 {
        self.record(|c| c.uniform = c.uniform.saturating_add(1));
        self.inner.uniform(upper)
    }
}

/// Read-only view of a [`CountingPrng`]'s tallies.
#[derive(Debug, Clone)]
pub struct DrawCounter {
    counts: Rc<Cell<DrawCounts>>,
}

impl DrawCounter {
    #[must_use]
    pub fn counts(&self) -> DrawCounts {
        self.counts.get()
    }
}

/// Derive the seed of sample `index` from a batch seed.
#[must_use]
pub fn derive_sample_seed(batch_seed: u64, index: u64) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&batch_seed.to_le_bytes()) else {
        // HMAC accepts keys of any length.
        return batch_seed ^ index;
    };
    mac.update(b"sample");
    mac.update(&index.to_le_bytes());
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
