//! Parameter registry and the thread-shared parameter store.
//!
//! Every scalar setting of the synth is a [`ParamId`]. Each id carries a
//! [`ParamSpec`]: its patch key, range, default, and the control curve used
//! when a normalized control (a MIDI CC, a slider) drives it.
//!
//! Choice parameters (waveform, filter type, LFO shape, ...) are stored as
//! their index and serialize as their label.
//!
//! # Curves
//!
//! | Curve | `x = 0` | `x = 1` | Law |
//! |-------|---------|---------|-----|
//! | [`Curve::Linear`] | min | max | `min + x·(max − min)` |
//! | [`Curve::Exponential`] | min | max | `min·(max/min)^x` |
//! | [`Curve::ExponentialReversed`] | max | min | `max·(min/max)^x` |
//!
//! The filter cutoff uses the exponential law (`27.5·2^(9x)` Hz), the filter
//! damping the reversed one, so turning a controller up always opens the
//! filter and raises the resonance.
//!
//! # Threading
//!
//! [`ParamStore`] keeps each value as the bit pattern of an `f32` inside an
//! `AtomicU32` with relaxed ordering. Control threads write whenever they
//! like; the audio thread reads the whole store once per block. A block may
//! see one parameter updated before another, which is accepted.

use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use crate::routing::{ModRoute, ModSource, ModTarget};

/// Mapping from a normalized control position to a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Curve {
    /// Equal steps across the range.
    #[default]
    Linear,
    /// Equal ratios across the range. Requires `min > 0`.
    Exponential,
    /// Exponential, running from max down to min.
    ExponentialReversed,
}

impl Curve {
    /// Value at control position `x` in \[0, 1\].
    pub fn map(self, x: f32, min: f32, max: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        match self {
            Curve::Linear => min + x * (max - min),
            Curve::Exponential => min * (max / min).powf(x),
            Curve::ExponentialReversed => max * (min / max).powf(x),
        }
    }

    /// Control position in \[0, 1\] that produces `value`.
    pub fn unmap(self, value: f32, min: f32, max: f32) -> f32 {
        let v = value.clamp(min, max);
        let x = match self {
            Curve::Linear => (v - min) / (max - min),
            Curve::Exponential => (v / min).ln() / (max / min).ln(),
            Curve::ExponentialReversed => (v / max).ln() / (min / max).ln(),
        };
        x.clamp(0.0, 1.0)
    }
}

/// Oscillator waveform labels, in index order.
pub const WAVEFORMS: &[&str] = &["sine", "saw", "pulse", "triangle"];
/// Oscillator anti-aliasing labels.
pub const QUALITIES: &[&str] = &["blit", "polyblep"];
/// Filter output taps.
pub const FILTER_TYPES: &[&str] = &["low", "high", "band", "notch"];
/// Filter oversampling factors.
pub const OVERSAMPLING: &[&str] = &["4x", "8x"];
/// Delay read interpolation.
pub const INTERPOLATIONS: &[&str] = &["linear", "hermite"];
/// LFO shapes.
pub const LFO_SHAPES: &[&str] = &["sine", "triangle", "ramp", "saw", "square", "s&h"];
/// Modulation envelope modes.
pub const MENV_MODES: &[&str] = &["AR", "AHR", "Loop"];

/// Static description of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Patch key, e.g. `"filt_freq"`.
    pub key: &'static str,
    /// Smallest value.
    pub min: f32,
    /// Largest value.
    pub max: f32,
    /// Initial value.
    pub default: f32,
    /// Control curve.
    pub curve: Curve,
    /// Labels of a choice parameter; empty for continuous ones.
    pub choices: &'static [&'static str],
}

impl ParamSpec {
    const fn linear(key: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            key,
            min,
            max,
            default,
            curve: Curve::Linear,
            choices: &[],
        }
    }

    const fn exponential(key: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            curve: Curve::Exponential,
            ..Self::linear(key, min, max, default)
        }
    }

    const fn reversed(key: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            curve: Curve::ExponentialReversed,
            ..Self::linear(key, min, max, default)
        }
    }

    const fn choice(key: &'static str, choices: &'static [&'static str], default: usize) -> Self {
        Self {
            key,
            min: 0.0,
            max: (choices.len() - 1) as f32,
            default: default as f32,
            curve: Curve::Linear,
            choices,
        }
    }

    /// Whether this is a choice parameter.
    pub fn is_choice(&self) -> bool {
        !self.choices.is_empty()
    }

    /// Clamp into range; choice parameters also round to a whole index.
    pub fn clamp(&self, value: f32) -> f32 {
        let value = if value.is_nan() { self.default } else { value };
        if self.is_choice() {
            value.round().clamp(self.min, self.max)
        } else {
            value.clamp(self.min, self.max)
        }
    }

    /// Value at normalized control position `x`.
    pub fn from_normalized(&self, x: f32) -> f32 {
        if self.is_choice() {
            (x.clamp(0.0, 1.0) * self.max).round()
        } else {
            self.curve.map(x, self.min, self.max)
        }
    }

    /// Normalized control position of `value`.
    pub fn to_normalized(&self, value: f32) -> f32 {
        if self.is_choice() {
            if self.max > 0.0 { self.clamp(value) / self.max } else { 0.0 }
        } else {
            self.curve.unmap(value, self.min, self.max)
        }
    }

    /// Index of a choice label.
    pub fn choice_index(&self, label: &str) -> Option<usize> {
        self.choices.iter().position(|c| c.eq_ignore_ascii_case(label))
    }

    /// Label of a choice index.
    pub fn choice_label(&self, index: usize) -> Option<&'static str> {
        self.choices.get(index).copied()
    }
}

/// Every scalar parameter of the synth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
#[allow(missing_docs)]
pub enum ParamId {
    OscDrift,
    OscFreq,
    OscAmp,
    OscWidth,
    OscWave,
    OscQuality,
    Osc2Freq,
    Osc2Det,
    Osc2Amp,
    Osc2Width,
    Osc2Wave,
    Osc2Quality,
    Osc3Freq,
    Osc3Det,
    Osc3Amp,
    Osc3Width,
    Osc3Wave,
    Osc3Quality,
    FiltFreq,
    FiltRes,
    FiltDrive,
    FiltSat,
    FiltType,
    FiltKey,
    FiltOversample,
    FenvAtt,
    FenvDec,
    FenvSus,
    FenvRel,
    FenvAmt,
    EnvAtt,
    EnvDec,
    EnvSus,
    EnvRel,
    DelTime,
    DelFback,
    DelMix,
    DelInterp,
    Lfo1Freq,
    Lfo1Phase,
    Lfo1Shape,
    Lfo2Freq,
    Lfo2Phase,
    Lfo2Shape,
    Menv1Att,
    Menv1Rel,
    Menv1Mode,
    Menv2Att,
    Menv2Rel,
    Menv2Mode,
}

impl ParamId {
    /// Number of parameters.
    pub const COUNT: usize = 50;

    /// All parameters in index order.
    pub const ALL: [ParamId; Self::COUNT] = [
        ParamId::OscDrift,
        ParamId::OscFreq,
        ParamId::OscAmp,
        ParamId::OscWidth,
        ParamId::OscWave,
        ParamId::OscQuality,
        ParamId::Osc2Freq,
        ParamId::Osc2Det,
        ParamId::Osc2Amp,
        ParamId::Osc2Width,
        ParamId::Osc2Wave,
        ParamId::Osc2Quality,
        ParamId::Osc3Freq,
        ParamId::Osc3Det,
        ParamId::Osc3Amp,
        ParamId::Osc3Width,
        ParamId::Osc3Wave,
        ParamId::Osc3Quality,
        ParamId::FiltFreq,
        ParamId::FiltRes,
        ParamId::FiltDrive,
        ParamId::FiltSat,
        ParamId::FiltType,
        ParamId::FiltKey,
        ParamId::FiltOversample,
        ParamId::FenvAtt,
        ParamId::FenvDec,
        ParamId::FenvSus,
        ParamId::FenvRel,
        ParamId::FenvAmt,
        ParamId::EnvAtt,
        ParamId::EnvDec,
        ParamId::EnvSus,
        ParamId::EnvRel,
        ParamId::DelTime,
        ParamId::DelFback,
        ParamId::DelMix,
        ParamId::DelInterp,
        ParamId::Lfo1Freq,
        ParamId::Lfo1Phase,
        ParamId::Lfo1Shape,
        ParamId::Lfo2Freq,
        ParamId::Lfo2Phase,
        ParamId::Lfo2Shape,
        ParamId::Menv1Att,
        ParamId::Menv1Rel,
        ParamId::Menv1Mode,
        ParamId::Menv2Att,
        ParamId::Menv2Rel,
        ParamId::Menv2Mode,
    ];

    /// Position in [`ParamId::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Patch key of this parameter.
    pub fn key(self) -> &'static str {
        self.spec().key
    }

    /// Look a parameter up by its patch key.
    pub fn from_key(key: &str) -> Option<ParamId> {
        Self::ALL.iter().copied().find(|id| id.key() == key)
    }

    /// Static description.
    pub fn spec(self) -> ParamSpec {
        match self {
            ParamId::OscDrift => ParamSpec::linear("osc_drift", 0.0, 10.0, 0.0),
            ParamId::OscFreq => ParamSpec::linear("osc_freq", -2.0, 2.0, 0.0),
            ParamId::OscAmp => ParamSpec::linear("osc_amp", 0.0, 1.0, 1.0),
            ParamId::OscWidth => ParamSpec::linear("osc_width", 0.0, 1.0, 0.5),
            ParamId::OscWave => ParamSpec::choice("osc_wave", WAVEFORMS, 2),
            ParamId::OscQuality => ParamSpec::choice("osc_quality", QUALITIES, 0),
            ParamId::Osc2Freq => ParamSpec::linear("osc2_freq", -2.0, 2.0, 0.0),
            ParamId::Osc2Det => ParamSpec::linear("osc2_det", -10.0, 10.0, 0.0),
            ParamId::Osc2Amp => ParamSpec::linear("osc2_amp", 0.0, 1.0, 0.0),
            ParamId::Osc2Width => ParamSpec::linear("osc2_width", 0.0, 1.0, 0.5),
            ParamId::Osc2Wave => ParamSpec::choice("osc2_wave", WAVEFORMS, 1),
            ParamId::Osc2Quality => ParamSpec::choice("osc2_quality", QUALITIES, 0),
            ParamId::Osc3Freq => ParamSpec::linear("osc3_freq", -2.0, 2.0, 0.0),
            ParamId::Osc3Det => ParamSpec::linear("osc3_det", -10.0, 10.0, 0.0),
            ParamId::Osc3Amp => ParamSpec::linear("osc3_amp", 0.0, 1.0, 0.0),
            ParamId::Osc3Width => ParamSpec::linear("osc3_width", 0.0, 1.0, 0.5),
            ParamId::Osc3Wave => ParamSpec::choice("osc3_wave", WAVEFORMS, 1),
            ParamId::Osc3Quality => ParamSpec::choice("osc3_quality", QUALITIES, 0),
            ParamId::FiltFreq => ParamSpec::exponential("filt_freq", 27.5, 14080.0, 3520.0),
            ParamId::FiltRes => ParamSpec::reversed("filt_res", 0.1, 10.0, 1.0),
            ParamId::FiltDrive => ParamSpec::linear("filt_drive", 0.025, 9.0, 1.0),
            ParamId::FiltSat => ParamSpec::linear("filt_sat", 1.0, 12.0, 1.0),
            ParamId::FiltType => ParamSpec::choice("filt_type", FILTER_TYPES, 0),
            ParamId::FiltKey => ParamSpec::linear("filt_key", 0.0, 1.0, 0.0),
            ParamId::FiltOversample => ParamSpec::choice("filt_os", OVERSAMPLING, 0),
            ParamId::FenvAtt => ParamSpec::linear("fenv_att", 0.001, 1.0, 0.01),
            ParamId::FenvDec => ParamSpec::linear("fenv_dec", 0.001, 1.0, 0.5),
            ParamId::FenvSus => ParamSpec::linear("fenv_sus", 0.0, 1.0, 1.0),
            ParamId::FenvRel => ParamSpec::linear("fenv_rel", 0.001, 1.0, 0.5),
            ParamId::FenvAmt => ParamSpec::linear("fenv_amt", -1.0, 1.0, 0.0),
            ParamId::EnvAtt => ParamSpec::linear("env_att", 0.001, 1.0, 0.01),
            ParamId::EnvDec => ParamSpec::linear("env_dec", 0.001, 1.0, 0.5),
            ParamId::EnvSus => ParamSpec::linear("env_sus", 0.0, 1.0, 1.0),
            ParamId::EnvRel => ParamSpec::linear("env_rel", 0.001, 1.0, 0.25),
            ParamId::DelTime => ParamSpec::linear("del_time", 0.01, 2.0, 1.0),
            ParamId::DelFback => ParamSpec::linear("del_fback", 0.0, 0.99, 0.5),
            ParamId::DelMix => ParamSpec::linear("del_mix", 0.0, 1.0, 0.0),
            ParamId::DelInterp => ParamSpec::choice("del_interp", INTERPOLATIONS, 0),
            ParamId::Lfo1Freq => ParamSpec::exponential("lfo1_freq", 0.01, 20.0, 1.0),
            ParamId::Lfo1Phase => ParamSpec::linear("lfo1_phase", 0.0, 1.0, 0.0),
            ParamId::Lfo1Shape => ParamSpec::choice("lfo1_shape", LFO_SHAPES, 0),
            ParamId::Lfo2Freq => ParamSpec::exponential("lfo2_freq", 0.01, 20.0, 2.67),
            ParamId::Lfo2Phase => ParamSpec::linear("lfo2_phase", 0.0, 1.0, 0.5),
            ParamId::Lfo2Shape => ParamSpec::choice("lfo2_shape", LFO_SHAPES, 0),
            ParamId::Menv1Att => ParamSpec::linear("menv1_att", 0.001, 2.0, 0.5),
            ParamId::Menv1Rel => ParamSpec::linear("menv1_rel", 0.001, 2.0, 0.5),
            ParamId::Menv1Mode => ParamSpec::choice("menv1_mode", MENV_MODES, 0),
            ParamId::Menv2Att => ParamSpec::linear("menv2_att", 0.001, 2.0, 0.25),
            ParamId::Menv2Rel => ParamSpec::linear("menv2_rel", 0.001, 2.0, 0.25),
            ParamId::Menv2Mode => ParamSpec::choice("menv2_mode", MENV_MODES, 2),
        }
    }
}

/// Lock-free mirror of every parameter and modulation route.
///
/// Shared behind an `Arc` between the control side (patch loads, MIDI CC,
/// UI) and the engine, which reads it once per block.
///
/// ```rust
/// use subsnake_synth::{ParamId, ParamStore};
///
/// let store = ParamStore::new();
/// store.set(ParamId::FiltFreq, 1000.0);
/// assert_eq!(store.get(ParamId::FiltFreq), 1000.0);
///
/// // Out-of-range writes clamp.
/// store.set(ParamId::EnvSus, 3.0);
/// assert_eq!(store.get(ParamId::EnvSus), 1.0);
/// ```
#[derive(Debug)]
pub struct ParamStore {
    values: Vec<AtomicU32>,
    route_sources: Vec<AtomicU8>,
    route_depths: Vec<AtomicU32>,
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamStore {
    /// A store holding every default, with no routes assigned.
    pub fn new() -> Self {
        Self {
            values: ParamId::ALL
                .iter()
                .map(|id| AtomicU32::new(id.spec().default.to_bits()))
                .collect(),
            route_sources: (0..ModTarget::COUNT).map(|_| AtomicU8::new(0)).collect(),
            route_depths: (0..ModTarget::COUNT)
                .map(|_| AtomicU32::new(0.0f32.to_bits()))
                .collect(),
        }
    }

    /// Current value.
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.raw(id))
    }

    #[inline]
    pub(crate) fn raw(&self, id: ParamId) -> u32 {
        self.values[id.index()].load(Ordering::Relaxed)
    }

    /// Store a value, clamped to the parameter's range. Returns what was stored.
    pub fn set(&self, id: ParamId, value: f32) -> f32 {
        let value = id.spec().clamp(value);
        self.values[id.index()].store(value.to_bits(), Ordering::Relaxed);
        value
    }

    /// Current value as a control position in \[0, 1\].
    pub fn normalized(&self, id: ParamId) -> f32 {
        id.spec().to_normalized(self.get(id))
    }

    /// Set from a control position in \[0, 1\] through the parameter's curve.
    pub fn set_normalized(&self, id: ParamId, x: f32) -> f32 {
        self.set(id, id.spec().from_normalized(x))
    }

    /// Selected index of a choice parameter.
    pub fn choice(&self, id: ParamId) -> usize {
        self.get(id).max(0.0) as usize
    }

    /// Select a choice by label. Returns `false` for an unknown label.
    pub fn set_choice_label(&self, id: ParamId, label: &str) -> bool {
        match id.spec().choice_index(label) {
            Some(index) => {
                self.set(id, index as f32);
                true
            }
            None => false,
        }
    }

    /// Routing of one modulation target.
    pub fn route(&self, target: ModTarget) -> ModRoute {
        let i = target.index();
        let source = ModSource::from_index(self.route_sources[i].load(Ordering::Relaxed))
            .unwrap_or(ModSource::None);
        let depth = f32::from_bits(self.route_depths[i].load(Ordering::Relaxed));
        ModRoute { source, depth }
    }

    /// Assign a modulation route. Depth is clamped to \[-1, 1\].
    pub fn set_route(&self, target: ModTarget, route: ModRoute) {
        let i = target.index();
        let depth = if route.depth.is_nan() { 0.0 } else { route.depth.clamp(-1.0, 1.0) };
        self.route_depths[i].store(depth.to_bits(), Ordering::Relaxed);
        self.route_sources[i].store(route.source.index(), Ordering::Relaxed);
    }

    /// Restore every default and clear all routes.
    pub fn reset(&self) {
        for id in ParamId::ALL {
            self.set(id, id.spec().default);
        }
        for target in ModTarget::ALL {
            self.set_route(target, ModRoute::default());
        }
    }
}
