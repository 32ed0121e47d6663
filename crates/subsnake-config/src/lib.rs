//! Settings and patch management for the subsnake synthesizer.
//!
//! # Features
//!
//! - **Settings**: `settings.toml` with `[audio]`, `[midi]`, `[engine]` and
//!   `[[cc]]` sections
//! - **Patch files**: named patches stored as TOML or JSON
//! - **Paths**: Platform-specific patch and config directories
//! - **Factory Patches**: Built-in starting points
//!
//! # Example
//!
//! ```rust,no_run
//! use subsnake_config::{PatchFile, Settings, paths};
//! use subsnake_synth::ParamStore;
//!
//! let settings = Settings::load_or_default(paths::settings_path()).unwrap();
//! let cc_map = settings.cc_map().unwrap();
//!
//! let store = ParamStore::new();
//! PatchFile::load("warm_pad.toml").unwrap().apply_to(&store);
//!
//! // Save the current state as a JSON patch
//! let path = paths::user_patches_dir().join("warm_pad_2.json");
//! PatchFile::from_store("Warm Pad 2", &store).save(&path).unwrap();
//! # let _ = cc_map;
//! ```

mod error;
mod patch_file;
mod settings;

/// Platform-specific paths for patches and settings.
pub mod paths;

/// Factory patches bundled with the library.
pub mod factory_patches;

pub use error::ConfigError;
pub use factory_patches::{
    FACTORY_PATCH_NAMES, factory_patches, factory_snapshot, get_factory_patch, is_factory_patch,
};
pub use patch_file::{PatchFile, PatchFormat};
pub use paths::{
    ensure_user_config_dir, ensure_user_patches_dir, find_patch, list_user_patches,
    patch_name_from_path, settings_path, user_config_dir, user_patches_dir,
};
pub use settings::{
    AudioSettings, CcAssignment, DEFAULT_CC, EngineSettings, MAX_RECORDER_SECONDS, MAX_VOICES,
    MidiSettings, Settings,
};

/// Resolve `name` to a patch: a file path, a user patch, or a factory patch,
/// in that order.
pub fn load_patch(name: &str) -> Result<PatchFile, ConfigError> {
    if let Some(path) = find_patch(name) {
        return PatchFile::load(path);
    }
    get_factory_patch(name).ok_or_else(|| ConfigError::PatchNotFound(name.to_string()))
}
