//! Modulation routing: which modulator drives which parameter, and how hard.
//!
//! Every modulatable parameter is a [`ModTarget`]. A target is fed by at most
//! one [`ModSource`] at a depth in \[-1, 1\]. Routes are resolved into
//! `(buffer, depth)` pairs once per block; an unassigned target resolves to
//! the shared zero buffer, so render loops never branch on it.
//!
//! In patches a route is stored as two keys next to the parameter:
//! `<key>_mod` holds the depth and `<key>_ass` the source index
//! (0 = none, 1 = LFO 1, 2 = LFO 2, 3 = mod env 1, 4 = mod env 2).

use crate::params::ParamId;

/// A modulation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModSource {
    /// Unassigned.
    #[default]
    None,
    /// LFO 1, bipolar.
    Lfo1,
    /// LFO 2, bipolar.
    Lfo2,
    /// Modulation envelope 1, unipolar.
    ModEnv1,
    /// Modulation envelope 2, unipolar.
    ModEnv2,
}

impl ModSource {
    /// All sources in index order.
    pub const ALL: [ModSource; 5] = [
        ModSource::None,
        ModSource::Lfo1,
        ModSource::Lfo2,
        ModSource::ModEnv1,
        ModSource::ModEnv2,
    ];

    /// Patch index (`<key>_ass` value).
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Source for a patch index.
    pub fn from_index(index: u8) -> Option<ModSource> {
        Self::ALL.get(index as usize).copied()
    }

    /// Slot in a modulator bank's buffer set, `None` when unassigned.
    pub fn slot(self) -> Option<usize> {
        match self {
            ModSource::None => None,
            ModSource::Lfo1 => Some(0),
            ModSource::Lfo2 => Some(1),
            ModSource::ModEnv1 => Some(2),
            ModSource::ModEnv2 => Some(3),
        }
    }
}

/// One route: a source and the depth it is applied at.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModRoute {
    /// Driving modulator.
    pub source: ModSource,
    /// Depth in \[-1, 1\].
    pub depth: f32,
}

impl ModRoute {
    /// A route with its depth clamped to \[-1, 1\].
    pub fn new(source: ModSource, depth: f32) -> Self {
        Self {
            source,
            depth: depth.clamp(-1.0, 1.0),
        }
    }

    /// Whether the route has any effect.
    pub fn is_active(&self) -> bool {
        self.source != ModSource::None && self.depth != 0.0
    }
}

/// Every parameter a modulator can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
#[allow(missing_docs)]
pub enum ModTarget {
    OscFreq,
    OscAmp,
    OscWidth,
    Osc2Freq,
    Osc2Det,
    Osc2Amp,
    Osc2Width,
    Osc3Freq,
    Osc3Det,
    Osc3Amp,
    Osc3Width,
    FiltFreq,
    FiltRes,
    FiltDrive,
    FiltSat,
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
    Lfo1Freq,
    Lfo1Phase,
    Lfo2Freq,
    Lfo2Phase,
    Menv1Att,
    Menv1Rel,
    Menv2Att,
    Menv2Rel,
}

impl ModTarget {
    /// Number of targets.
    pub const COUNT: usize = 35;

    /// All targets in index order.
    pub const ALL: [ModTarget; Self::COUNT] = [
        ModTarget::OscFreq,
        ModTarget::OscAmp,
        ModTarget::OscWidth,
        ModTarget::Osc2Freq,
        ModTarget::Osc2Det,
        ModTarget::Osc2Amp,
        ModTarget::Osc2Width,
        ModTarget::Osc3Freq,
        ModTarget::Osc3Det,
        ModTarget::Osc3Amp,
        ModTarget::Osc3Width,
        ModTarget::FiltFreq,
        ModTarget::FiltRes,
        ModTarget::FiltDrive,
        ModTarget::FiltSat,
        ModTarget::FenvAtt,
        ModTarget::FenvDec,
        ModTarget::FenvSus,
        ModTarget::FenvRel,
        ModTarget::FenvAmt,
        ModTarget::EnvAtt,
        ModTarget::EnvDec,
        ModTarget::EnvSus,
        ModTarget::EnvRel,
        ModTarget::DelTime,
        ModTarget::DelFback,
        ModTarget::DelMix,
        ModTarget::Lfo1Freq,
        ModTarget::Lfo1Phase,
        ModTarget::Lfo2Freq,
        ModTarget::Lfo2Phase,
        ModTarget::Menv1Att,
        ModTarget::Menv1Rel,
        ModTarget::Menv2Att,
        ModTarget::Menv2Rel,
    ];

    /// Position in [`ModTarget::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The parameter this target modulates.
    pub fn param(self) -> ParamId {
        match self {
            ModTarget::OscFreq => ParamId::OscFreq,
            ModTarget::OscAmp => ParamId::OscAmp,
            ModTarget::OscWidth => ParamId::OscWidth,
            ModTarget::Osc2Freq => ParamId::Osc2Freq,
            ModTarget::Osc2Det => ParamId::Osc2Det,
            ModTarget::Osc2Amp => ParamId::Osc2Amp,
            ModTarget::Osc2Width => ParamId::Osc2Width,
            ModTarget::Osc3Freq => ParamId::Osc3Freq,
            ModTarget::Osc3Det => ParamId::Osc3Det,
            ModTarget::Osc3Amp => ParamId::Osc3Amp,
            ModTarget::Osc3Width => ParamId::Osc3Width,
            ModTarget::FiltFreq => ParamId::FiltFreq,
            ModTarget::FiltRes => ParamId::FiltRes,
            ModTarget::FiltDrive => ParamId::FiltDrive,
            ModTarget::FiltSat => ParamId::FiltSat,
            ModTarget::FenvAtt => ParamId::FenvAtt,
            ModTarget::FenvDec => ParamId::FenvDec,
            ModTarget::FenvSus => ParamId::FenvSus,
            ModTarget::FenvRel => ParamId::FenvRel,
            ModTarget::FenvAmt => ParamId::FenvAmt,
            ModTarget::EnvAtt => ParamId::EnvAtt,
            ModTarget::EnvDec => ParamId::EnvDec,
            ModTarget::EnvSus => ParamId::EnvSus,
            ModTarget::EnvRel => ParamId::EnvRel,
            ModTarget::DelTime => ParamId::DelTime,
            ModTarget::DelFback => ParamId::DelFback,
            ModTarget::DelMix => ParamId::DelMix,
            ModTarget::Lfo1Freq => ParamId::Lfo1Freq,
            ModTarget::Lfo1Phase => ParamId::Lfo1Phase,
            ModTarget::Lfo2Freq => ParamId::Lfo2Freq,
            ModTarget::Lfo2Phase => ParamId::Lfo2Phase,
            ModTarget::Menv1Att => ParamId::Menv1Att,
            ModTarget::Menv1Rel => ParamId::Menv1Rel,
            ModTarget::Menv2Att => ParamId::Menv2Att,
            ModTarget::Menv2Rel => ParamId::Menv2Rel,
        }
    }

    /// Target for a parameter, if that parameter is modulatable.
    pub fn for_param(id: ParamId) -> Option<ModTarget> {
        Self::ALL.iter().copied().find(|t| t.param() == id)
    }
}

/// The engine-side routing table, one route per target.
#[derive(Debug, Clone)]
pub struct ModRouting {
    routes: [ModRoute; ModTarget::COUNT],
}

impl Default for ModRouting {
    fn default() -> Self {
        Self::new()
    }
}

impl ModRouting {
    /// All targets unassigned.
    pub fn new() -> Self {
        Self {
            routes: [ModRoute::default(); ModTarget::COUNT],
        }
    }

    /// Route of `target`.
    #[inline]
    pub fn get(&self, target: ModTarget) -> ModRoute {
        self.routes[target.index()]
    }

    /// Assign `target`.
    pub fn set(&mut self, target: ModTarget, route: ModRoute) {
        self.routes[target.index()] = route;
    }

    /// Unassign every target.
    pub fn clear(&mut self) {
        self.routes = [ModRoute::default(); ModTarget::COUNT];
    }

    /// Targets with an effective route.
    pub fn active(&self) -> impl Iterator<Item = (ModTarget, ModRoute)> + '_ {
        ModTarget::ALL
            .iter()
            .map(|&t| (t, self.get(t)))
            .filter(|(_, r)| r.is_active())
    }
}
