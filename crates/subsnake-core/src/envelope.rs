//! Sample-accurate ADSR envelope generator.
//!
//! Each stage is a one-pole approach toward its target:
//!
//! ```text
//! level += c·(target − level),   c = 1 − exp(−1 / max(1, fs·t))
//! ```
//!
//! with `t` the stage time in seconds plus its per-sample modulation, so
//! the level after one time constant of attack is `1 − e⁻¹`. Stages end
//! when the level comes within [`THRESHOLD`] of the target.
//!
//! Gate changes are scheduled at a sample offset inside the next rendered
//! block with [`Adsr::gate_on`] / [`Adsr::gate_off`]. Offsets that lie past
//! the end of the block carry over to the following one.
//!
//! # Example
//!
//! ```rust
//! use subsnake_core::{Adsr, AdsrModulation, EnvelopeStage};
//!
//! let mut env = Adsr::new(44100.0);
//! env.set_attack(0.005);
//! env.gate_on(16);
//!
//! let mut levels = [0.0f32; 64];
//! env.render(&mut levels, &AdsrModulation::default());
//! assert_eq!(levels[15], 0.0);
//! assert!(levels[16] > 0.0);
//! assert_eq!(env.stage(), EnvelopeStage::Attack);
//! ```

use crate::math::one_pole_coeff;
use crate::modulation::ModInput;

/// Distance from the target at which a stage is considered complete.
pub const THRESHOLD: f32 = 0.001;

/// ADSR stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeStage {
    /// Silent; level is 0.
    #[default]
    Off,
    /// Rising toward 1.
    Attack,
    /// Falling toward the sustain level.
    Decay,
    /// Holding the sustain level.
    Sustain,
    /// Falling toward 0 after gate-off.
    Release,
}

/// Per-sample modulation of the stage times (seconds) and sustain level.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdsrModulation<'a> {
    /// Added to the attack time.
    pub attack: ModInput<'a>,
    /// Added to the decay time.
    pub decay: ModInput<'a>,
    /// Added to the sustain level.
    pub sustain: ModInput<'a>,
    /// Added to the release time.
    pub release: ModInput<'a>,
}

/// Attack-decay-sustain-release envelope with sample-offset gates.
#[derive(Debug, Clone)]
pub struct Adsr {
    sample_rate: f32,
    stage: EnvelopeStage,
    level: f32,
    gate: bool,

    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,

    pending_on: Option<usize>,
    pending_off: Option<usize>,
}

impl Default for Adsr {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Adsr {
    /// Create an envelope with 10 ms attack, 0.5 s decay, 0.5 sustain and 0.5 s release.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            stage: EnvelopeStage::Off,
            level: 0.0,
            gate: false,
            attack: 0.01,
            decay: 0.5,
            sustain: 0.5,
            release: 0.5,
            pending_on: None,
            pending_off: None,
        }
    }

    /// Set the attack time in seconds.
    pub fn set_attack(&mut self, seconds: f32) {
        self.attack = seconds.max(0.0);
    }

    /// Attack time in seconds.
    pub fn attack(&self) -> f32 {
        self.attack
    }

    /// Set the decay time in seconds.
    pub fn set_decay(&mut self, seconds: f32) {
        self.decay = seconds.max(0.0);
    }

    /// Decay time in seconds.
    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Set the sustain level in \[0, 1\].
    pub fn set_sustain(&mut self, level: f32) {
        self.sustain = level.clamp(0.0, 1.0);
    }

    /// Sustain level.
    pub fn sustain(&self) -> f32 {
        self.sustain
    }

    /// Set the release time in seconds.
    pub fn set_release(&mut self, seconds: f32) {
        self.release = seconds.max(0.0);
    }

    /// Release time in seconds.
    pub fn release(&self) -> f32 {
        self.release
    }

    /// Current stage.
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Current level.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Whether the gate is held.
    pub fn gate(&self) -> bool {
        self.gate
    }

    /// True once the envelope has fully finished: Off, level 0, and no
    /// gate-on waiting to start.
    pub fn is_idle(&self) -> bool {
        self.stage == EnvelopeStage::Off && self.pending_on.is_none() && self.level == 0.0
    }

    /// Open the gate `offset` samples into the next block.
    ///
    /// From any stage the envelope re-enters Attack at that offset,
    /// continuing from its current level.
    pub fn gate_on(&mut self, offset: usize) {
        self.gate = true;
        self.pending_on = Some(offset);
        self.pending_off = None;
    }

    /// Close the gate `offset` samples into the next block.
    ///
    /// A release scheduled at or before a still-pending attack is moved to
    /// the sample after it, so the attack always produces at least one sample.
    pub fn gate_off(&mut self, offset: usize) {
        self.gate = false;
        let offset = match self.pending_on {
            Some(on) => offset.max(on + 1),
            None => offset,
        };
        self.pending_off = Some(offset);
    }

    /// Return to Off at level 0 and drop pending gates.
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Off;
        self.level = 0.0;
        self.gate = false;
        self.pending_on = None;
        self.pending_off = None;
    }

    /// Advance one sample at block index `n`.
    #[inline]
    fn step(&mut self, n: usize, mods: &AdsrModulation<'_>) -> f32 {
        if self.pending_on.is_some_and(|on| n >= on) {
            self.pending_on = None;
            self.stage = EnvelopeStage::Attack;
        }
        if self.pending_off.is_some_and(|off| n >= off) {
            self.pending_off = None;
            if matches!(
                self.stage,
                EnvelopeStage::Attack | EnvelopeStage::Decay | EnvelopeStage::Sustain
            ) {
                self.stage = EnvelopeStage::Release;
            }
        }

        let sustain = (self.sustain + mods.sustain.at(n)).clamp(0.0, 1.0);
        match self.stage {
            EnvelopeStage::Off => self.level = 0.0,
            EnvelopeStage::Attack => {
                let c = one_pole_coeff(self.sample_rate * (self.attack + mods.attack.at(n)));
                self.level += c * (1.0 - self.level);
                if self.level >= 1.0 - THRESHOLD {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }
            EnvelopeStage::Decay => {
                let c = one_pole_coeff(self.sample_rate * (self.decay + mods.decay.at(n)));
                self.level += c * (sustain - self.level);
                if self.level <= sustain + THRESHOLD {
                    self.level = sustain;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => self.level = sustain,
            EnvelopeStage::Release => {
                let c = one_pole_coeff(self.sample_rate * (self.release + mods.release.at(n)));
                self.level -= c * self.level;
                if self.level < THRESHOLD {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Off;
                }
            }
        }
        self.level = self.level.clamp(0.0, 1.0);
        self.level
    }

    /// Carry pending offsets that fell past the end of a `frames`-long block.
    fn carry(&mut self, frames: usize) {
        self.pending_on = self.pending_on.map(|on| on.saturating_sub(frames));
        self.pending_off = self.pending_off.map(|off| off.saturating_sub(frames));
    }

    /// Write one envelope level per sample into `levels`.
    pub fn render(&mut self, levels: &mut [f32], mods: &AdsrModulation<'_>) {
        for (n, out) in levels.iter_mut().enumerate() {
            *out = self.step(n, mods);
        }
        self.carry(levels.len());
    }

    /// Multiply a stereo buffer by the envelope in place.
    pub fn apply(&mut self, buffer: &mut [[f32; 2]], mods: &AdsrModulation<'_>) {
        for (n, frame) in buffer.iter_mut().enumerate() {
            let level = self.step(n, mods);
            frame[0] *= level;
            frame[1] *= level;
        }
        self.carry(buffer.len());
    }
}
