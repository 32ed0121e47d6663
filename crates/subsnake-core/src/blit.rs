//! Band-limited impulse train (BLIT) building blocks.
//!
//! A BLIT is a periodic train of windowed-sinc pulses containing only the
//! harmonics below Nyquist. Integrating it (minus its DC) yields an
//! alias-suppressed sawtooth; subtracting a delayed copy of that saw yields a
//! pulse, and integrating the pulse yields a triangle.
//!
//! The closed form for `M` harmonics over a period of `P` samples is
//!
//! ```text
//! blit(φ) = sin(M·φ/2) / (P·sin(φ/2)),   M = 2·floor(P/2) + 1
//! ```
//!
//! which tends to `M/P` where the denominator vanishes.
//!
//! # Reference
//!
//! Stilson & Smith, "Alias-Free Digital Synthesis of Classic Analog
//! Waveforms", ICMC 1996.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::f32::consts::TAU;
use libm::{floorf, sinf};

use crate::math::flush_denormal;

/// Leak of the BLIT integrators relative to the phase increment.
///
/// Places the integrator pole at a tenth of the oscillator frequency.
const LEAK_RATIO: f32 = 0.1;

/// Leaky-integrator coefficient for a phase increment in radians/sample.
#[inline]
pub fn leak_coefficient(increment: f32) -> f32 {
    1.0 - LEAK_RATIO * increment
}

/// One sample of a unit-area band-limited impulse train.
///
/// `phase` is in radians within \[0, 2π), `period` in samples.
#[inline]
pub fn blit_sample(phase: f32, period: f32) -> f32 {
    let harmonics = 2.0 * floorf(period * 0.5) + 1.0;
    let half = phase * 0.5;
    let denom = sinf(half);
    if denom.abs() < 1e-5 {
        harmonics / period
    } else {
        sinf(harmonics * half) / (period * denom)
    }
}

/// Band-limited sawtooth built by leaky integration of a BLIT.
///
/// Produces a rising ramp with a band-limited downward step at each phase
/// wrap, spanning roughly \[-1, 1\].
#[derive(Debug, Clone, Default)]
pub struct BlitSaw {
    integrator: f32,
}

impl BlitSaw {
    /// Create a saw integrator at rest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the integrator.
    pub fn reset(&mut self) {
        self.integrator = 0.0;
    }

    /// Advance one sample.
    ///
    /// `phase` is the oscillator phase in radians, `increment` the phase
    /// increment in radians/sample (must be positive).
    #[inline]
    pub fn next(&mut self, phase: f32, increment: f32) -> f32 {
        let period = TAU / increment;
        let impulse = blit_sample(phase, period);
        self.integrator = flush_denormal(
            leak_coefficient(increment) * self.integrator + (1.0 / period - impulse),
        );
        2.0 * self.integrator
    }
}

/// Short fractional delay line used to derive the pulse from the saw.
///
/// Reading the saw `width·period` samples in the past gives the second,
/// phase-shifted saw. Because the read offset follows the instantaneous
/// period, pitch bends stay glitch-free.
#[derive(Debug, Clone)]
pub struct FractionalDelay {
    buffer: Vec<f32>,
    mask: usize,
    write_pos: usize,
}

impl FractionalDelay {
    /// Create a delay able to hold at least `max_samples` of history.
    pub fn new(max_samples: usize) -> Self {
        let len = (max_samples + 4).next_power_of_two();
        Self {
            buffer: vec![0.0; len],
            mask: len - 1,
            write_pos: 0,
        }
    }

    /// Largest usable delay in samples.
    pub fn max_delay(&self) -> f32 {
        (self.buffer.len() - 2) as f32
    }

    /// Clear the history.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Push a sample, then read `delay` samples behind it (linear interpolation).
    ///
    /// A delay of 0 returns the sample just written.
    #[inline]
    pub fn write_read(&mut self, sample: f32, delay: f32) -> f32 {
        self.buffer[self.write_pos] = sample;
        let delay = delay.clamp(0.0, self.max_delay());
        let whole = delay as usize;
        let frac = delay - whole as f32;
        let a = self.buffer[(self.write_pos + self.buffer.len() - whole) & self.mask];
        let b = self.buffer[(self.write_pos + self.buffer.len() - whole - 1) & self.mask];
        self.write_pos = (self.write_pos + 1) & self.mask;
        a + (b - a) * frac
    }
}
