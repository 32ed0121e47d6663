//! Attack/release modulation envelope.
//!
//! A unipolar control source in \[0, 1\] driven by the same gates as the
//! voice envelopes. Attack and release use the ADSR one-pole law and the
//! same completion [`THRESHOLD`].
//!
//! | Mode | While gated |
//! |------|-------------|
//! | [`ModEnvMode::OneShot`] | attack, release, then stay at 0 until the next gate |
//! | [`ModEnvMode::Hold`]    | attack, then hold at 1 |
//! | [`ModEnvMode::Loop`]    | attack, release, repeat |
//!
//! Releasing the gate always finishes with a release to 0.

use crate::envelope::THRESHOLD;
use crate::math::one_pole_coeff;
use crate::modulation::ModInput;

/// Modulation envelope cycle behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModEnvMode {
    /// AR once per gate.
    #[default]
    OneShot,
    /// Attack, hold while gated, release.
    Hold,
    /// AR repeated while gated.
    Loop,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Stage {
    #[default]
    Idle,
    Attack,
    Hold,
    Release,
}

/// Per-sample modulation of the stage times, in seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModEnvModulation<'a> {
    /// Added to the attack time.
    pub attack: ModInput<'a>,
    /// Added to the release time.
    pub release: ModInput<'a>,
}

/// Gated AR / AHR / looping envelope.
#[derive(Debug, Clone)]
pub struct ModEnv {
    sample_rate: f32,
    mode: ModEnvMode,
    attack: f32,
    release: f32,
    level: f32,
    stage: Stage,
    gate: bool,
    pending_on: Option<usize>,
    pending_off: Option<usize>,
}

impl Default for ModEnv {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl ModEnv {
    /// Create a one-shot envelope with 0.5 s attack and release.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            mode: ModEnvMode::OneShot,
            attack: 0.5,
            release: 0.5,
            level: 0.0,
            stage: Stage::Idle,
            gate: false,
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

    /// Set the release time in seconds.
    pub fn set_release(&mut self, seconds: f32) {
        self.release = seconds.max(0.0);
    }

    /// Release time in seconds.
    pub fn release(&self) -> f32 {
        self.release
    }

    /// Select the cycle behaviour.
    pub fn set_mode(&mut self, mode: ModEnvMode) {
        self.mode = mode;
    }

    /// Current cycle behaviour.
    pub fn mode(&self) -> ModEnvMode {
        self.mode
    }

    /// Current level.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Whether the gate is currently open.
    pub fn gate(&self) -> bool {
        self.gate
    }

    /// Open the gate `offset` samples into the next block.
    pub fn gate_on(&mut self, offset: usize) {
        self.pending_on = Some(offset);
        self.pending_off = None;
    }

    /// Close the gate `offset` samples into the next block.
    pub fn gate_off(&mut self, offset: usize) {
        let offset = match self.pending_on {
            Some(on) => offset.max(on + 1),
            None => offset,
        };
        self.pending_off = Some(offset);
    }

    /// Return to idle at level 0.
    pub fn reset(&mut self) {
        self.level = 0.0;
        self.stage = Stage::Idle;
        self.gate = false;
        self.pending_on = None;
        self.pending_off = None;
    }

    #[inline]
    fn step(&mut self, n: usize, mods: &ModEnvModulation<'_>) -> f32 {
        if self.pending_on.is_some_and(|on| n >= on) {
            self.pending_on = None;
            self.gate = true;
            self.stage = Stage::Attack;
        }
        if self.pending_off.is_some_and(|off| n >= off) {
            self.pending_off = None;
            self.gate = false;
            if self.stage != Stage::Idle {
                self.stage = Stage::Release;
            }
        }

        match self.stage {
            Stage::Idle => self.level = 0.0,
            Stage::Attack | Stage::Hold => {
                let c = one_pole_coeff(self.sample_rate * (self.attack + mods.attack.at(n)));
                self.level += c * (1.0 - self.level);
                if self.level >= 1.0 - THRESHOLD {
                    self.level = 1.0;
                    self.stage = match self.mode {
                        ModEnvMode::Hold => Stage::Hold,
                        ModEnvMode::OneShot | ModEnvMode::Loop => Stage::Release,
                    };
                }
            }
            Stage::Release => {
                let c = one_pole_coeff(self.sample_rate * (self.release + mods.release.at(n)));
                self.level -= c * self.level;
                if self.level <= THRESHOLD {
                    self.level = 0.0;
                    self.stage = if self.gate && self.mode == ModEnvMode::Loop {
                        Stage::Attack
                    } else {
                        Stage::Idle
                    };
                }
            }
        }
        self.level
    }

    /// Fill `out` with one level per sample.
    pub fn render(&mut self, out: &mut [f32], mods: &ModEnvModulation<'_>) {
        for (n, value) in out.iter_mut().enumerate() {
            *value = self.step(n, mods);
        }
        let frames = out.len();
        self.pending_on = self.pending_on.map(|on| on.saturating_sub(frames));
        self.pending_off = self.pending_off.map(|off| off.saturating_sub(frames));
    }
}
