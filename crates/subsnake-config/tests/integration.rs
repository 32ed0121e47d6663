//! Integration tests for subsnake-config.
//!
//! These tests run settings and patch files through the synth engine.

use subsnake_config::{
    ConfigError, PatchFile, Settings, factory_patches, factory_snapshot, load_patch,
    paths::{find_patch_in, list_patches_in},
};
use subsnake_synth::{CcTarget, Engine, ParamId, ParamStore, Patch, PatchValue};
use tempfile::TempDir;

fn peak(frames: &[[f32; 2]]) -> f32 {
    frames.iter().map(|f| f[0].abs()).fold(0.0, f32::max)
}

// ---------------------------------------------------------------------------
// 1. Factory patches through the engine
// ---------------------------------------------------------------------------

#[test]
fn every_factory_patch_plays() {
    for patch in factory_patches() {
        let settings = Settings::default();
        let mut engine = Engine::new(settings.engine_config(44100.0));
        engine.apply(&patch.params);
        engine.note_on(57, 110, 0);

        let mut frames = vec![[0.0f32; 2]; 8192];
        engine.render(&mut frames);
        assert!(
            frames.iter().all(|f| f[0].is_finite() && f[0].abs() <= 1.0),
            "patch '{}' produced invalid samples",
            patch.name
        );
        assert!(peak(&frames) > 1e-3, "patch '{}' is silent", patch.name);
    }
}

#[test]
fn snapshot_matches_engine_serialize() {
    let settings = Settings::default();
    let mut engine = Engine::new(settings.engine_config(44100.0));
    let snap = factory_snapshot("pluck").unwrap();
    engine.apply(&snap);
    assert_eq!(engine.serialize(), snap);
}

// ---------------------------------------------------------------------------
// 2. Patch files on disk
// ---------------------------------------------------------------------------

#[test]
fn saved_engine_state_restores_in_both_formats() {
    let dir = TempDir::new().unwrap();
    let store = ParamStore::new();
    store.set(ParamId::FiltFreq, 640.0);
    store.set_choice_label(ParamId::Lfo2Shape, "s&h");
    let file = PatchFile::from_store("Session", &store).with_description("saved");

    for name in ["session.toml", "session.json"] {
        let path = dir.path().join(name);
        file.save(&path).unwrap();

        let restored = ParamStore::new();
        PatchFile::load(&path).unwrap().apply_to(&restored);
        assert_eq!(restored.get(ParamId::FiltFreq), 640.0);
        assert_eq!(restored.choice(ParamId::Lfo2Shape), 5);
    }

    assert_eq!(list_patches_in(dir.path()).len(), 2);
    assert!(find_patch_in(dir.path(), "session").is_some());
}

#[test]
fn partial_json_patch_layers_over_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bright.json");
    std::fs::write(
        &path,
        r#"{ "name": "Bright", "params": { "filt_freq": 9000, "filt_type": "high", "unknown": 1 } }"#,
    )
    .unwrap();

    let store = ParamStore::new();
    store.set(ParamId::DelMix, 0.4);
    let applied = PatchFile::load(&path).unwrap().apply_to(&store);
    assert_eq!(applied, 2);
    assert_eq!(store.get(ParamId::FiltFreq), 9000.0);
    assert_eq!(store.choice(ParamId::FiltType), 1);
    assert_eq!(store.get(ParamId::DelMix), 0.4);
}

#[test]
fn load_patch_falls_back_to_factory() {
    assert_eq!(load_patch("bass").unwrap().name, "Bass");
    assert!(matches!(
        load_patch("no_such_patch_12345"),
        Err(ConfigError::PatchNotFound(_))
    ));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mine.toml");
    let mut patch = Patch::new();
    patch.set("env_rel", PatchValue::Number(0.5));
    PatchFile::from_patch("Mine", patch).save(&path).unwrap();
    assert_eq!(load_patch(path.to_str().unwrap()).unwrap().name, "Mine");
}

// ---------------------------------------------------------------------------
// 3. Settings into a running engine
// ---------------------------------------------------------------------------

#[test]
fn settings_cc_map_drives_engine() {
    let settings = Settings::from_toml(
        r#"
[engine]
voices = 2

[[cc]]
module = "filter"
parameter = "cutoff"
cc = 74
"#,
    )
    .unwrap();

    let map = settings.cc_map().unwrap();
    assert_eq!(map.target(74), Some(CcTarget::FilterCutoff));

    let mut engine = Engine::new(settings.engine_config(48000.0));
    engine.set_cc_map(map);
    let store = ParamStore::new();
    engine.cc_map().apply(74, 127, &store);
    assert!((store.get(ParamId::FiltFreq) - 14080.0).abs() < 0.5);
}
