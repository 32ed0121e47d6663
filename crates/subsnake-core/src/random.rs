//! Deterministic pseudo-random source for the audio thread.
//!
//! A 32-bit xorshift generator: no allocation, no locking, and the same
//! sequence for the same seed, which keeps offline renders reproducible.

/// Xorshift32 pseudo-random number generator.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u32,
}

impl Default for Rng {
    fn default() -> Self {
        Self::new(0x1234_5678)
    }
}

impl Rng {
    /// Create a generator from a seed. A zero seed is replaced, since
    /// xorshift never leaves the all-zero state.
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    /// Next raw 32-bit value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform value in \[0, 1).
    #[inline]
    pub fn next_unit(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform value in \[-1, 1).
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        self.next_unit() * 2.0 - 1.0
    }
}
