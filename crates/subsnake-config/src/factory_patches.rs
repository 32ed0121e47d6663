//! Factory patches bundled with the synth.
//!
//! Embedded at compile time so they are always available. Each one is a
//! partial patch: it is applied over the defaults, so `init` is simply the
//! empty document.

use subsnake_synth::{ParamStore, Patch};

use crate::PatchFile;

/// Names of the factory patches.
pub static FACTORY_PATCH_NAMES: &[&str] = &["init", "bass", "pad", "pluck", "lead"];

static FACTORY_PATCHES_TOML: &[(&str, &str)] = &[
    ("init", INIT_PATCH),
    ("bass", BASS_PATCH),
    ("pad", PAD_PATCH),
    ("pluck", PLUCK_PATCH),
    ("lead", LEAD_PATCH),
];

const INIT_PATCH: &str = r#"
name = "Init"
description = "Every parameter at its default"
"#;

const BASS_PATCH: &str = r#"
name = "Bass"
description = "Two detuned saws an octave down through a closing low-pass"

[params]
osc_wave = "saw"
osc_freq = -1.0
osc2_wave = "pulse"
osc2_freq = -1.0
osc2_det = 7.0
osc2_amp = 0.6
osc2_width = 0.3
filt_type = "low"
filt_freq = 180.0
filt_res = 2.0
filt_drive = 2.0
fenv_att = 0.002
fenv_dec = 0.25
fenv_sus = 0.1
fenv_rel = 0.15
fenv_amt = 0.7
env_att = 0.002
env_dec = 0.3
env_sus = 0.8
env_rel = 0.08
"#;

const PAD_PATCH: &str = r#"
name = "Pad"
description = "Slow three-saw pad with LFO-swept cutoff and a long delay"

[params]
osc_wave = "saw"
osc2_wave = "saw"
osc2_det = 9.0
osc2_amp = 0.8
osc3_wave = "triangle"
osc3_freq = 1.0
osc3_det = -9.0
osc3_amp = 0.5
filt_freq = 1200.0
filt_res = 1.5
fenv_att = 0.8
fenv_dec = 1.0
fenv_sus = 0.6
fenv_rel = 1.0
fenv_amt = 0.3
env_att = 0.9
env_dec = 1.0
env_sus = 0.9
env_rel = 1.0
del_time = 0.45
del_fback = 0.55
del_mix = 0.3
lfo1_freq = 0.2
lfo1_shape = "triangle"
filt_freq_mod = 0.35
filt_freq_ass = 1
osc_width_mod = 0.2
osc_width_ass = 2
"#;

const PLUCK_PATCH: &str = r#"
name = "Pluck"
description = "Short pulse pluck with a filter snap and slapback echo"

[params]
osc_wave = "pulse"
osc_width = 0.25
osc2_wave = "triangle"
osc2_freq = 1.0
osc2_amp = 0.4
filt_freq = 400.0
filt_res = 3.0
fenv_att = 0.001
fenv_dec = 0.12
fenv_sus = 0.0
fenv_rel = 0.1
fenv_amt = 0.9
env_att = 0.001
env_dec = 0.35
env_sus = 0.0
env_rel = 0.2
del_time = 0.12
del_fback = 0.25
del_mix = 0.2
"#;

const LEAD_PATCH: &str = r#"
name = "Lead"
description = "Driven saw lead with LFO vibrato"

[params]
osc_wave = "saw"
osc2_wave = "saw"
osc2_det = 5.0
osc2_amp = 0.7
filt_freq = 2400.0
filt_res = 4.0
filt_drive = 4.0
filt_sat = 3.0
fenv_amt = 0.25
env_att = 0.01
env_sus = 0.9
env_rel = 0.3
del_time = 0.33
del_fback = 0.35
del_mix = 0.15
lfo2_freq = 5.5
menv1_att = 0.6
menv1_mode = "AR"
lfo2_phase = 0.0
osc_freq_mod = 0.01
osc_freq_ass = 2
"#;

/// All factory patches, in [`FACTORY_PATCH_NAMES`] order.
pub fn factory_patches() -> Vec<PatchFile> {
    FACTORY_PATCHES_TOML
        .iter()
        .filter_map(|(_, toml)| PatchFile::from_toml(toml).ok())
        .collect()
}

/// A factory patch by name (case-insensitive).
pub fn get_factory_patch(name: &str) -> Option<PatchFile> {
    FACTORY_PATCHES_TOML
        .iter()
        .find(|(patch_name, _)| patch_name.eq_ignore_ascii_case(name))
        .and_then(|(_, toml)| PatchFile::from_toml(toml).ok())
}

/// Whether `name` is a factory patch.
pub fn is_factory_patch(name: &str) -> bool {
    FACTORY_PATCH_NAMES
        .iter()
        .any(|n| n.eq_ignore_ascii_case(name))
}

/// A factory patch layered over the defaults, as a complete snapshot.
///
/// Loading this replaces every parameter, unlike applying the partial
/// factory document over an edited state.
pub fn factory_snapshot(name: &str) -> Option<Patch> {
    let patch = get_factory_patch(name)?;
    let store = ParamStore::new();
    patch.apply_to(&store);
    Some(Patch::from_store(&store))
}
