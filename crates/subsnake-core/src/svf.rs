//! Oversampled nonlinear state variable filter.
//!
//! Hal Chamberlin's two-integrator SVF with a saturating feedback path, run
//! 4 or 8 times per input sample. Every integrator goes through
//! [`cubic_clip`] at the saturation ceiling, which keeps the loop bounded
//! at any resonance, and the band feedback is shaped by `tanh(band·drive)`.
//!
//! # Per-iteration update
//!
//! ```text
//! feedback = q·tanh(band·drive)/drive
//! high     = clip(input − low − feedback, sat)
//! band     = clip(band + f·high, sat)
//! low      = clip(low + f·band, sat)
//! ```
//!
//! `q` is the damping term: small values ring, large values flatten the
//! response. The selected tap is clipped at 1.5 and averaged over the
//! iterations.
//!
//! # Cutoff path
//!
//! The tuning coefficient `f = 2·sin(π·fc/(os·fs))` is recomputed every
//! sample from
//!
//! ```text
//! fc = cutoff·(1 + amount·env)          env ∈ [0, 1], amount ∈ [−1, 1]
//! fc = lerp(fc, key_freq·32, key_track)
//! fc = fc + cutoff·cutoff_mod
//! fc = clamp(fc, 0.1, min(1760·os, 0.45·fs))
//! ```
//!
//! # Reference
//!
//! Chamberlin, "Musical Applications of Microprocessors", 2nd ed. (1985),
//! section 14.5.

use core::f32::consts::PI;
use libm::{sinf, tanhf};

use crate::math::{cubic_clip, flush_denormal, lerp};
use crate::modulation::ModInput;

/// Filter output tap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterType {
    /// Low-pass output.
    #[default]
    Lowpass,
    /// High-pass output.
    Highpass,
    /// Band-pass output.
    Bandpass,
    /// Notch (high + low).
    Notch,
}

/// Inner iterations per input sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Oversampling {
    /// 4 iterations, cutoff ceiling 7040 Hz.
    #[default]
    X4,
    /// 8 iterations, cutoff ceiling 14080 Hz.
    X8,
}

impl Oversampling {
    /// Iteration count.
    pub fn factor(self) -> usize {
        match self {
            Self::X4 => 4,
            Self::X8 => 8,
        }
    }
}

/// Cutoff ceiling per unit of oversampling, in Hz.
const CEILING_PER_FACTOR: f32 = 1760.0;
/// Ceiling applied to every output tap.
const TAP_CLIP: f32 = 1.5;
/// Multiplier applied to the key frequency for key tracking.
const KEY_TRACK_RATIO: f32 = 32.0;

const RESONANCE_RANGE: (f32, f32) = (0.02, 20.0);
const DRIVE_RANGE: (f32, f32) = (0.025, 9.0);
const SATURATION_RANGE: (f32, f32) = (1.0, 12.0);

const RESONANCE_MOD_SCALE: f32 = 10.0;
const DRIVE_MOD_SCALE: f32 = 4.5;
const SATURATION_MOD_SCALE: f32 = 5.5;

/// Per-sample modulation inputs for the filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterModulation<'a> {
    /// Added to the cutoff as a fraction of the base cutoff.
    pub cutoff: ModInput<'a>,
    /// Added to the damping, ×10.
    pub resonance: ModInput<'a>,
    /// Added to the drive, ×4.5.
    pub drive: ModInput<'a>,
    /// Added to the saturation ceiling, ×5.5.
    pub saturation: ModInput<'a>,
    /// Added to the envelope amount.
    pub env_amount: ModInput<'a>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    low: f32,
    band: f32,
}

/// Stereo oversampled Chamberlin SVF.
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    sample_rate: f32,
    oversampling: Oversampling,
    ceiling: f32,

    cutoff: f32,
    resonance: f32,
    drive: f32,
    saturation: f32,
    filter_type: FilterType,
    env_amount: f32,
    key_track: f32,
    key_frequency: f32,

    channels: [ChannelState; 2],
}

impl Default for StateVariableFilter {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl StateVariableFilter {
    /// Create a lowpass filter at 3520 Hz with unit damping, drive and saturation.
    pub fn new(sample_rate: f32) -> Self {
        let mut filter = Self {
            sample_rate,
            oversampling: Oversampling::X4,
            ceiling: 0.0,
            cutoff: 3520.0,
            resonance: 1.0,
            drive: 1.0,
            saturation: 1.0,
            filter_type: FilterType::Lowpass,
            env_amount: 0.0,
            key_track: 0.0,
            key_frequency: 440.0,
            channels: [ChannelState::default(); 2],
        };
        filter.update_ceiling();
        filter
    }

    fn update_ceiling(&mut self) {
        let factor = self.oversampling.factor() as f32;
        self.ceiling = (CEILING_PER_FACTOR * factor).min(0.45 * self.sample_rate);
    }

    /// Highest reachable cutoff in Hz.
    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Set the base cutoff in Hz.
    ///
    /// The effective cutoff is limited to [`ceiling`](Self::ceiling) on
    /// every sample; the stored value is only bounded by 0.45·fs.
    pub fn set_cutoff(&mut self, freq: f32) {
        self.cutoff = freq.clamp(0.1, 0.45 * self.sample_rate);
    }

    /// Base cutoff in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set the feedback damping, clamped to \[0.02, 20\].
    pub fn set_resonance(&mut self, q: f32) {
        self.resonance = q.clamp(RESONANCE_RANGE.0, RESONANCE_RANGE.1);
    }

    /// Feedback damping.
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Set the feedback drive, clamped to \[0.025, 9\].
    pub fn set_drive(&mut self, drive: f32) {
        self.drive = drive.clamp(DRIVE_RANGE.0, DRIVE_RANGE.1);
    }

    /// Feedback drive.
    pub fn drive(&self) -> f32 {
        self.drive
    }

    /// Set the integrator saturation ceiling, clamped to \[1, 12\].
    pub fn set_saturation(&mut self, sat: f32) {
        self.saturation = sat.clamp(SATURATION_RANGE.0, SATURATION_RANGE.1);
    }

    /// Integrator saturation ceiling.
    pub fn saturation(&self) -> f32 {
        self.saturation
    }

    /// Select the output tap.
    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
    }

    /// Current output tap.
    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Select 4× or 8× iteration. Recomputes the cutoff ceiling.
    pub fn set_oversampling(&mut self, oversampling: Oversampling) {
        self.oversampling = oversampling;
        self.update_ceiling();
        #[cfg(feature = "tracing")]
        tracing::debug!("svf: {}x oversampling, ceiling {} Hz", oversampling.factor(), self.ceiling);
    }

    /// Current oversampling.
    pub fn oversampling(&self) -> Oversampling {
        self.oversampling
    }

    /// Set the envelope amount in \[−1, 1\].
    pub fn set_env_amount(&mut self, amount: f32) {
        self.env_amount = amount.clamp(-1.0, 1.0);
    }

    /// Envelope amount.
    pub fn env_amount(&self) -> f32 {
        self.env_amount
    }

    /// Set the key-tracking blend in \[0, 1\].
    pub fn set_key_track(&mut self, amount: f32) {
        self.key_track = amount.clamp(0.0, 1.0);
    }

    /// Key-tracking blend.
    pub fn key_track(&self) -> f32 {
        self.key_track
    }

    /// Set the note frequency used by key tracking.
    pub fn set_key_frequency(&mut self, freq: f32) {
        self.key_frequency = freq.max(0.0);
    }

    /// Clear the integrators.
    pub fn reset(&mut self) {
        self.channels = [ChannelState::default(); 2];
    }

    /// Effective cutoff for one sample, before the tuning coefficient.
    #[inline]
    fn effective_cutoff(&self, env: f32, amount_mod: f32, cutoff_mod: f32) -> f32 {
        let env = env.clamp(0.0, 1.0);
        let amount = (self.env_amount + amount_mod).clamp(-1.0, 1.0);
        let fc = self.cutoff + self.cutoff * amount * env;
        let fc = lerp(fc, self.key_frequency * KEY_TRACK_RATIO, self.key_track);
        (fc + self.cutoff * cutoff_mod).clamp(0.1, self.ceiling)
    }

    /// Filter `buffer` in place.
    ///
    /// `env` holds the filter envelope, one value per frame; frames beyond
    /// its length read as 0.
    pub fn render(&mut self, buffer: &mut [[f32; 2]], env: &[f32], mods: &FilterModulation<'_>) {
        let os = self.oversampling.factor();
        let inv_os = 1.0 / os as f32;
        let tuning_scale = PI / (os as f32 * self.sample_rate);

        for (n, frame) in buffer.iter_mut().enumerate() {
            let e = env.get(n).copied().unwrap_or(0.0);
            let fc = self.effective_cutoff(e, mods.env_amount.at(n), mods.cutoff.at(n));
            let tuning = 2.0 * sinf(fc * tuning_scale);

            let q = (self.resonance + RESONANCE_MOD_SCALE * mods.resonance.at(n))
                .clamp(RESONANCE_RANGE.0, RESONANCE_RANGE.1);
            let drive = (self.drive + DRIVE_MOD_SCALE * mods.drive.at(n))
                .clamp(DRIVE_RANGE.0, DRIVE_RANGE.1);
            let sat = (self.saturation + SATURATION_MOD_SCALE * mods.saturation.at(n))
                .clamp(SATURATION_RANGE.0, SATURATION_RANGE.1);
            let inv_drive = 1.0 / drive;

            for (ch, state) in self.channels.iter_mut().enumerate() {
                let input = frame[ch];
                let mut acc = 0.0;
                for _ in 0..os {
                    let feedback = q * tanhf(state.band * drive) * inv_drive;
                    let high = cubic_clip(input - state.low - feedback, sat);
                    state.band = cubic_clip(state.band + tuning * high, sat);
                    state.low = cubic_clip(state.low + tuning * state.band, sat);
                    let tap = match self.filter_type {
                        FilterType::Lowpass => state.low,
                        FilterType::Highpass => high,
                        FilterType::Bandpass => state.band,
                        FilterType::Notch => high + state.low,
                    };
                    acc += cubic_clip(tap, TAP_CLIP);
                }
                state.band = flush_denormal(state.band);
                state.low = flush_denormal(state.low);
                frame[ch] = acc * inv_os;
            }
        }
    }
}
