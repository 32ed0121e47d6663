//! Low frequency oscillator for the modulation matrix.
//!
//! Renders a whole block of control values in \[-1, 1\] at a time. The phase
//! runs in cycles (\[0, 1)); the phase offset is added on read, so two LFOs
//! at the same rate with offsets 0 and 0.5 run in antiphase.

use core::f32::consts::TAU;
use libm::{floorf, sinf};

use crate::modulation::ModInput;
use crate::random::Rng;

/// LFO waveform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoShape {
    /// Sine.
    #[default]
    Sine,
    /// Symmetric triangle.
    Triangle,
    /// Rising ramp.
    Ramp,
    /// Falling sawtooth.
    Saw,
    /// 50 % square.
    Square,
    /// Random value held for one cycle.
    SampleAndHold,
}

/// Per-sample modulation inputs for an LFO.
#[derive(Debug, Clone, Copy, Default)]
pub struct LfoModulation<'a> {
    /// Relative rate change: 1.0 doubles the rate.
    pub frequency: ModInput<'a>,
    /// Added to the phase offset, in cycles.
    pub phase: ModInput<'a>,
}

/// Block-rendering LFO.
///
/// ```rust
/// use subsnake_core::{Lfo, LfoModulation, LfoShape};
///
/// let mut lfo = Lfo::new(44100.0, 2.0);
/// lfo.set_shape(LfoShape::Triangle);
/// let mut block = [0.0f32; 128];
/// lfo.render(&mut block, &LfoModulation::default());
/// assert!(block.iter().all(|v| (-1.0..=1.0).contains(v)));
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    sample_rate: f32,
    phase: f32,
    frequency: f32,
    phase_offset: f32,
    shape: LfoShape,
    held: f32,
    rng: Rng,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(48000.0, 1.0)
    }
}

impl Lfo {
    /// Create a sine LFO at `frequency` Hz.
    pub fn new(sample_rate: f32, frequency: f32) -> Self {
        Self::with_seed(sample_rate, frequency, 0x0001_F0F0)
    }

    /// Create an LFO whose sample-and-hold draws from the given seed.
    pub fn with_seed(sample_rate: f32, frequency: f32, seed: u32) -> Self {
        let mut rng = Rng::new(seed);
        let held = rng.next_bipolar();
        Self {
            sample_rate,
            phase: 0.0,
            frequency: frequency.max(0.0),
            phase_offset: 0.0,
            shape: LfoShape::Sine,
            held,
            rng,
        }
    }

    /// Set the rate in Hz.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency.max(0.0);
    }

    /// Rate in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set the phase offset in cycles.
    pub fn set_phase_offset(&mut self, offset: f32) {
        self.phase_offset = offset;
    }

    /// Phase offset in cycles.
    pub fn phase_offset(&self) -> f32 {
        self.phase_offset
    }

    /// Select the waveform.
    pub fn set_shape(&mut self, shape: LfoShape) {
        self.shape = shape;
    }

    /// Current waveform.
    pub fn shape(&self) -> LfoShape {
        self.shape
    }

    /// Running phase in cycles, without the offset.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Restart at phase 0.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    #[inline]
    fn shape_at(&self, cycles: f32) -> f32 {
        let p = cycles - floorf(cycles);
        match self.shape {
            LfoShape::Sine => sinf(TAU * p),
            LfoShape::Triangle => 4.0 * (p - 0.5).abs() - 1.0,
            LfoShape::Ramp => 2.0 * p - 1.0,
            LfoShape::Saw => 1.0 - 2.0 * p,
            LfoShape::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoShape::SampleAndHold => self.held,
        }
    }

    /// Fill `out` with one control value per sample.
    pub fn render(&mut self, out: &mut [f32], mods: &LfoModulation<'_>) {
        let base_inc = self.frequency / self.sample_rate;
        for (n, value) in out.iter_mut().enumerate() {
            *value = self.shape_at(self.phase + self.phase_offset + mods.phase.at(n));
            let inc = (base_inc * (1.0 + mods.frequency.at(n))).max(0.0);
            self.phase += inc;
            if self.phase >= 1.0 {
                self.phase -= floorf(self.phase);
                self.held = self.rng.next_bipolar();
            }
        }
    }
}
