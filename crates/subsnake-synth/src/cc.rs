//! MIDI CC assignments.
//!
//! A CC number drives one (module, parameter) pair. The set of assignable
//! pairs is closed: [`CcTarget`] indexes a const table that names each pair
//! and the [`ParamId`] it writes. CC values (0..=127) pass through the
//! parameter's control curve, so a controller sweeps the cutoff in octaves
//! just like the panel does.

use crate::params::{ParamId, ParamStore};

/// CC number reserved for "all notes off".
pub const ALL_NOTES_OFF: u8 = 123;

/// A CC-assignable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
#[allow(missing_docs)]
pub enum CcTarget {
    Osc1Pitch,
    Osc1Level,
    Osc1Width,
    Osc2Pitch,
    Osc2Detune,
    Osc2Level,
    Osc2Width,
    Osc3Pitch,
    Osc3Detune,
    Osc3Level,
    Osc3Width,
    FilterCutoff,
    FilterFeedback,
    FilterDrive,
    FilterSaturate,
    FilterEnvAttack,
    FilterEnvDecay,
    FilterEnvSustain,
    FilterEnvRelease,
    FilterEnvDepth,
    EnvAttack,
    EnvDecay,
    EnvSustain,
    EnvRelease,
    DelayTime,
    DelayFeedback,
    DelayMix,
}

/// One row of the dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct CcEntry {
    /// The target this row describes.
    pub target: CcTarget,
    /// Module label, e.g. `"filter"`.
    pub module: &'static str,
    /// Parameter label within the module, e.g. `"cutoff"`.
    pub parameter: &'static str,
    /// Parameter written.
    pub param: ParamId,
}

const fn entry(
    target: CcTarget,
    module: &'static str,
    parameter: &'static str,
    param: ParamId,
) -> CcEntry {
    CcEntry {
        target,
        module,
        parameter,
        param,
    }
}

/// Dispatch table, indexed by `CcTarget as usize`.
pub const CC_TABLE: [CcEntry; 27] = [
    entry(CcTarget::Osc1Pitch, "oscillator 1", "pitch", ParamId::OscFreq),
    entry(CcTarget::Osc1Level, "oscillator 1", "level", ParamId::OscAmp),
    entry(CcTarget::Osc1Width, "oscillator 1", "width", ParamId::OscWidth),
    entry(CcTarget::Osc2Pitch, "oscillator 2", "pitch", ParamId::Osc2Freq),
    entry(CcTarget::Osc2Detune, "oscillator 2", "detune", ParamId::Osc2Det),
    entry(CcTarget::Osc2Level, "oscillator 2", "level", ParamId::Osc2Amp),
    entry(CcTarget::Osc2Width, "oscillator 2", "width", ParamId::Osc2Width),
    entry(CcTarget::Osc3Pitch, "oscillator 3", "pitch", ParamId::Osc3Freq),
    entry(CcTarget::Osc3Detune, "oscillator 3", "detune", ParamId::Osc3Det),
    entry(CcTarget::Osc3Level, "oscillator 3", "level", ParamId::Osc3Amp),
    entry(CcTarget::Osc3Width, "oscillator 3", "width", ParamId::Osc3Width),
    entry(CcTarget::FilterCutoff, "filter", "cutoff", ParamId::FiltFreq),
    entry(CcTarget::FilterFeedback, "filter", "feedback", ParamId::FiltRes),
    entry(CcTarget::FilterDrive, "filter", "drive", ParamId::FiltDrive),
    entry(CcTarget::FilterSaturate, "filter", "saturate", ParamId::FiltSat),
    entry(CcTarget::FilterEnvAttack, "filter env", "attack", ParamId::FenvAtt),
    entry(CcTarget::FilterEnvDecay, "filter env", "decay", ParamId::FenvDec),
    entry(CcTarget::FilterEnvSustain, "filter env", "sustain", ParamId::FenvSus),
    entry(CcTarget::FilterEnvRelease, "filter env", "release", ParamId::FenvRel),
    entry(CcTarget::FilterEnvDepth, "filter env", "depth", ParamId::FenvAmt),
    entry(CcTarget::EnvAttack, "envelope", "attack", ParamId::EnvAtt),
    entry(CcTarget::EnvDecay, "envelope", "decay", ParamId::EnvDec),
    entry(CcTarget::EnvSustain, "envelope", "sustain", ParamId::EnvSus),
    entry(CcTarget::EnvRelease, "envelope", "release", ParamId::EnvRel),
    entry(CcTarget::DelayTime, "delay", "time", ParamId::DelTime),
    entry(CcTarget::DelayFeedback, "delay", "feedback", ParamId::DelFback),
    entry(CcTarget::DelayMix, "delay", "mix", ParamId::DelMix),
];

impl CcTarget {
    /// Table row of this target.
    #[inline]
    pub fn entry(self) -> &'static CcEntry {
        &CC_TABLE[self as usize]
    }

    /// Parameter this target writes.
    pub fn param(self) -> ParamId {
        self.entry().param
    }

    /// Find a target by its module and parameter labels (case-insensitive).
    pub fn from_labels(module: &str, parameter: &str) -> Option<CcTarget> {
        CC_TABLE
            .iter()
            .find(|e| e.module.eq_ignore_ascii_case(module) && e.parameter.eq_ignore_ascii_case(parameter))
            .map(|e| e.target)
    }
}

/// CC number → target assignments.
#[derive(Debug, Clone)]
pub struct CcMap {
    slots: [Option<CcTarget>; 128],
}

impl Default for CcMap {
    fn default() -> Self {
        Self::new()
    }
}

impl CcMap {
    /// No assignments.
    pub fn new() -> Self {
        Self { slots: [None; 128] }
    }

    fn is_free(&self, cc: u8) -> bool {
        cc != ALL_NOTES_OFF && self.slots[cc as usize].is_none()
    }

    /// Assign `target` to `cc`. If `cc` is taken, the next free number
    /// above it is used, then the nearest free one below. Returns the number
    /// actually assigned, or `None` when every number is taken.
    pub fn assign(&mut self, cc: u8, target: CcTarget) -> Option<u8> {
        let cc = cc.min(127);
        let chosen = if self.is_free(cc) {
            Some(cc)
        } else {
            (cc..=127)
                .skip(1)
                .find(|&n| self.is_free(n))
                .or_else(|| (0..cc).rev().find(|&n| self.is_free(n)))
        }?;
        self.slots[chosen as usize] = Some(target);
        Some(chosen)
    }

    /// Remove the assignment of `cc`.
    pub fn remove(&mut self, cc: u8) -> Option<CcTarget> {
        self.slots.get_mut(cc as usize).and_then(Option::take)
    }

    /// Target assigned to `cc`.
    #[inline]
    pub fn target(&self, cc: u8) -> Option<CcTarget> {
        self.slots.get(cc as usize).copied().flatten()
    }

    /// Assigned (cc, target) pairs in CC order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, CcTarget)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(cc, t)| t.map(|t| (cc as u8, t)))
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether nothing is assigned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write a CC value into `store`. Returns the parameter written.
    pub fn apply(&self, cc: u8, value: u8, store: &ParamStore) -> Option<ParamId> {
        let target = self.target(cc)?;
        let id = target.param();
        store.set_normalized(id, f32::from(value.min(127)) / 127.0);
        Some(id)
    }
}
