//! Patch file format and operations.

use serde::{Deserialize, Serialize};
use std::path::Path;

use subsnake_synth::{ParamStore, Patch};

use crate::error::ConfigError;

/// On-disk encoding of a patch file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchFormat {
    /// TOML, the native format.
    Toml,
    /// JSON.
    Json,
}

impl PatchFormat {
    /// `.json` files are JSON; everything else is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => PatchFormat::Json,
            _ => PatchFormat::Toml,
        }
    }
}

/// A named patch on disk.
///
/// # TOML Format
///
/// ```toml
/// name = "Bass"
/// description = "Saw bass with a filter pluck"
///
/// [params]
/// osc_wave = "saw"
/// filt_freq = 220.0
/// fenv_amt = 0.6
/// filt_freq_mod = 0.2
/// filt_freq_ass = 1
/// ```
///
/// The JSON form has the same shape. `params` may be partial: keys it
/// leaves out keep whatever value is already loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchFile {
    /// Name of the patch.
    pub name: String,

    /// Optional description of the patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Parameter values and modulation routes.
    #[serde(default)]
    pub params: Patch,
}

impl PatchFile {
    /// An empty patch.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            params: Patch::new(),
        }
    }

    /// Wrap an existing [`Patch`].
    pub fn from_patch(name: impl Into<String>, params: Patch) -> Self {
        Self {
            name: name.into(),
            description: None,
            params,
        }
    }

    /// Snapshot everything in `store`.
    pub fn from_store(name: impl Into<String>, store: &ParamStore) -> Self {
        Self::from_patch(name, Patch::from_store(store))
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Write the parameters into `store`. Returns how many keys applied.
    pub fn apply_to(&self, store: &ParamStore) -> usize {
        self.params.apply_to(store)
    }

    /// Load a patch, choosing the format from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        match PatchFormat::from_path(path) {
            PatchFormat::Toml => Self::from_toml(&content),
            PatchFormat::Json => Self::from_json(&content),
        }
    }

    /// Save the patch, choosing the format from the file extension.
    /// Missing parent directories are created.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = match PatchFormat::from_path(path) {
            PatchFormat::Toml => self.to_toml()?,
            PatchFormat::Json => self.to_json()?,
        };
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::JsonParse)
    }

    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::JsonSerialize)
    }
}
