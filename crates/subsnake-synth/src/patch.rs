//! Patches: flat key → value documents.
//!
//! A [`Patch`] is a sorted map from patch key to a number or a string.
//! Numbers are in engine units (Hz, seconds, octaves); choice parameters are
//! strings (`"saw"`, `"low"`, `"Loop"`). Each modulatable parameter also has
//! `<key>_mod` (depth, -1..1) and `<key>_ass` (source index, 0..4).
//!
//! Loading is lenient: unknown keys are ignored and missing keys leave the
//! current value alone, so partial patches layer over whatever is loaded.
//!
//! ```rust
//! use subsnake_synth::{ParamId, ParamStore, Patch, PatchValue};
//!
//! let mut patch = Patch::new();
//! patch.set("filt_freq", PatchValue::Number(880.0));
//! patch.set("osc_wave", PatchValue::Text("saw".into()));
//!
//! let store = ParamStore::new();
//! patch.apply_to(&store);
//! assert_eq!(store.get(ParamId::FiltFreq), 880.0);
//! assert_eq!(store.choice(ParamId::OscWave), 1);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::params::{ParamId, ParamStore};
use crate::routing::{ModRoute, ModSource, ModTarget};

/// Suffix of the modulation depth key.
pub const MOD_DEPTH_SUFFIX: &str = "_mod";
/// Suffix of the modulation source key.
pub const MOD_SOURCE_SUFFIX: &str = "_ass";

/// One patch value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatchValue {
    /// Numeric value in engine units.
    Number(f64),
    /// Label of a choice.
    Text(String),
}

impl PatchValue {
    /// The number, if numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PatchValue::Number(n) => Some(*n),
            PatchValue::Text(_) => None,
        }
    }

    /// The string, if textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PatchValue::Text(s) => Some(s),
            PatchValue::Number(_) => None,
        }
    }
}

/// A complete or partial synth state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    values: BTreeMap<String, PatchValue>,
}

impl Patch {
    /// An empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `key`.
    pub fn get(&self, key: &str) -> Option<&PatchValue> {
        self.values.get(key)
    }

    /// Set `key`.
    pub fn set(&mut self, key: impl Into<String>, value: PatchValue) {
        self.values.insert(key.into(), value);
    }

    /// Remove `key`.
    pub fn remove(&mut self, key: &str) -> Option<PatchValue> {
        self.values.remove(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the patch has no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PatchValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Snapshot every parameter and route of `store`.
    pub fn from_store(store: &ParamStore) -> Self {
        let mut patch = Patch::new();
        for id in ParamId::ALL {
            let spec = id.spec();
            let value = if spec.is_choice() {
                let label = spec.choice_label(store.choice(id)).unwrap_or_default();
                PatchValue::Text(label.to_string())
            } else {
                PatchValue::Number(f64::from(store.get(id)))
            };
            patch.set(spec.key, value);
        }
        for target in ModTarget::ALL {
            let key = target.param().key();
            let route = store.route(target);
            patch.set(
                format!("{key}{MOD_DEPTH_SUFFIX}"),
                PatchValue::Number(f64::from(route.depth)),
            );
            patch.set(
                format!("{key}{MOD_SOURCE_SUFFIX}"),
                PatchValue::Number(f64::from(route.source.index())),
            );
        }
        patch
    }

    /// Write every recognised key into `store`. Returns how many keys
    /// were applied.
    pub fn apply_to(&self, store: &ParamStore) -> usize {
        let mut applied = 0;
        for id in ParamId::ALL {
            let spec = id.spec();
            let Some(value) = self.get(spec.key) else {
                continue;
            };
            let ok = match value {
                PatchValue::Text(label) if spec.is_choice() => store.set_choice_label(id, label),
                PatchValue::Number(n) => {
                    store.set(id, *n as f32);
                    true
                }
                PatchValue::Text(_) => false,
            };
            if ok {
                applied += 1;
            }
        }
        for target in ModTarget::ALL {
            let key = target.param().key();
            let depth = self
                .get(&format!("{key}{MOD_DEPTH_SUFFIX}"))
                .and_then(PatchValue::as_number);
            let source = self
                .get(&format!("{key}{MOD_SOURCE_SUFFIX}"))
                .and_then(PatchValue::as_number)
                .and_then(|n| {
                    if n >= 0.0 && n.fract() == 0.0 && n <= 255.0 {
                        ModSource::from_index(n as u8)
                    } else {
                        None
                    }
                });
            if depth.is_none() && source.is_none() {
                continue;
            }
            let current = store.route(target);
            let route = ModRoute::new(
                source.unwrap_or(current.source),
                depth.map_or(current.depth, |d| d as f32),
            );
            store.set_route(target, route);
            applied += usize::from(depth.is_some()) + usize::from(source.is_some());
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_has_every_key() {
        let patch = Patch::from_store(&ParamStore::new());
        assert_eq!(patch.len(), ParamId::COUNT + 2 * ModTarget::COUNT);
        assert_eq!(patch.get("osc_wave"), Some(&PatchValue::Text("pulse".into())));
        assert_eq!(patch.get("menv2_mode"), Some(&PatchValue::Text("Loop".into())));
        assert_eq!(patch.get("filt_freq_ass"), Some(&PatchValue::Number(0.0)));
    }

    #[test]
    fn test_apply_ignores_unknown_and_keeps_missing() {
        let store = ParamStore::new();
        store.set(ParamId::EnvRel, 0.8);
        let mut patch = Patch::new();
        patch.set("env_att", PatchValue::Number(0.2));
        patch.set("not_a_param", PatchValue::Number(3.0));
        patch.set("filt_type", PatchValue::Text("sideways".into()));
        assert_eq!(patch.apply_to(&store), 1);
        assert_eq!(store.get(ParamId::EnvAtt), 0.2);
        assert_eq!(store.get(ParamId::EnvRel), 0.8);
        assert_eq!(store.choice(ParamId::FiltType), 0);
    }

    #[test]
    fn test_routes_round_trip() {
        let store = ParamStore::new();
        store.set_route(ModTarget::Osc2Width, ModRoute::new(ModSource::ModEnv2, -0.4));
        let patch = Patch::from_store(&store);
        assert_eq!(patch.get("osc2_width_ass"), Some(&PatchValue::Number(4.0)));

        let other = ParamStore::new();
        patch.apply_to(&other);
        let route = other.route(ModTarget::Osc2Width);
        assert_eq!(route.source, ModSource::ModEnv2);
        assert!((route.depth + 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_partial_route_keeps_other_half() {
        let store = ParamStore::new();
        store.set_route(ModTarget::FiltFreq, ModRoute::new(ModSource::Lfo1, 0.3));
        let mut patch = Patch::new();
        patch.set("filt_freq_mod", PatchValue::Number(0.9));
        patch.set("filt_res_ass", PatchValue::Number(9.0));
        patch.apply_to(&store);
        assert_eq!(store.route(ModTarget::FiltFreq), ModRoute::new(ModSource::Lfo1, 0.9));
        assert_eq!(store.route(ModTarget::FiltRes).source, ModSource::None);
    }

    #[test]
    fn test_number_accepted_for_choice() {
        let store = ParamStore::new();
        let mut patch = Patch::new();
        patch.set("lfo2_shape", PatchValue::Number(5.0));
        patch.apply_to(&store);
        assert_eq!(store.choice(ParamId::Lfo2Shape), 5);
    }
}
