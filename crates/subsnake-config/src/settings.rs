//! The `settings.toml` document.
//!
//! ```toml
//! [audio]
//! device = "pipewire"
//! buffer_size = 256
//!
//! [midi]
//! port = "Keystation"
//! channel = 1          # 1..=16, omit for omni
//!
//! [engine]
//! voices = 8
//! recorder_seconds = 8.0
//! seed = 1
//! sample_rate = 44100  # offline renders only
//!
//! [[cc]]
//! module = "filter"
//! parameter = "cutoff"
//! cc = 74
//! ```
//!
//! Every section and field is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::path::Path;

use subsnake_synth::{ALL_NOTES_OFF, CcMap, CcTarget, ChannelFilter, EngineConfig};

use crate::error::ConfigError;

/// CC number used when an assignment leaves it out.
pub const DEFAULT_CC: u8 = 63;

/// Largest voice pool accepted.
pub const MAX_VOICES: usize = 64;

/// Longest looper accepted, in seconds.
pub const MAX_RECORDER_SECONDS: f32 = 600.0;

/// `[audio]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Output device name, partial name or index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Fixed buffer size in frames. The driver picks when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<u32>,
}

/// `[midi]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiSettings {
    /// Input port name, partial name or index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// One-based channel. Unset listens to all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
}

/// `[engine]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Voice pool size.
    pub voices: usize,
    /// Looper length in seconds.
    pub recorder_seconds: f32,
    /// Seed for per-voice detune and sample-and-hold.
    pub seed: u32,
    /// Sample rate of offline renders. Live playback uses the device rate.
    pub sample_rate: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            voices: engine.voices,
            recorder_seconds: engine.recorder_seconds,
            seed: engine.seed,
            sample_rate: engine.sample_rate as u32,
        }
    }
}

/// One `[[cc]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcAssignment {
    /// Module label, e.g. `"filter"`.
    pub module: String,
    /// Parameter label within the module, e.g. `"cutoff"`.
    pub parameter: String,
    /// Requested CC number.
    #[serde(default = "default_cc")]
    pub cc: u8,
}

fn default_cc() -> u8 {
    DEFAULT_CC
}

impl CcAssignment {
    /// The assignment as stored for `target` on `cc`.
    pub fn new(target: CcTarget, cc: u8) -> Self {
        let entry = target.entry();
        Self {
            module: entry.module.to_string(),
            parameter: entry.parameter.to_string(),
            cc,
        }
    }

    /// Resolve the labels.
    pub fn target(&self) -> Option<CcTarget> {
        CcTarget::from_labels(&self.module, &self.parameter)
    }
}

/// Everything in `settings.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Output device.
    pub audio: AudioSettings,
    /// MIDI input.
    pub midi: MidiSettings,
    /// Engine sizing.
    pub engine: EngineSettings,
    /// CC assignments, applied in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<CcAssignment>,
}

impl Settings {
    /// Load and validate a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Like [`load`](Self::load), but a missing file gives the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the settings, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(toml_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every value for range and every CC entry for a known target.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.buffer_size == Some(0) {
            return Err(ConfigError::invalid("audio.buffer_size", "must be positive"));
        }
        if let Some(channel) = self.midi.channel
            && !(1..=16).contains(&channel)
        {
            return Err(ConfigError::invalid(
                "midi.channel",
                format!("{channel} is not in 1..=16"),
            ));
        }
        if !(1..=MAX_VOICES).contains(&self.engine.voices) {
            return Err(ConfigError::invalid(
                "engine.voices",
                format!("{} is not in 1..={MAX_VOICES}", self.engine.voices),
            ));
        }
        let seconds = self.engine.recorder_seconds;
        if !(seconds > 0.0 && seconds <= MAX_RECORDER_SECONDS) {
            return Err(ConfigError::invalid(
                "engine.recorder_seconds",
                format!("{seconds} is not in (0, {MAX_RECORDER_SECONDS}]"),
            ));
        }
        if self.engine.sample_rate == 0 {
            return Err(ConfigError::invalid("engine.sample_rate", "must be positive"));
        }
        for (i, cc) in self.cc.iter().enumerate() {
            if cc.cc > 127 {
                return Err(ConfigError::invalid(
                    format!("cc[{i}].cc"),
                    format!("{} is not a CC number", cc.cc),
                ));
            }
            if cc.cc == ALL_NOTES_OFF {
                return Err(ConfigError::invalid(
                    format!("cc[{i}].cc"),
                    "123 is reserved for all notes off",
                ));
            }
            if cc.target().is_none() {
                return Err(ConfigError::invalid(
                    format!("cc[{i}]"),
                    format!("unknown target '{}' / '{}'", cc.module, cc.parameter),
                ));
            }
        }
        Ok(())
    }

    /// The MIDI channel filter.
    pub fn channel_filter(&self) -> ChannelFilter {
        match self.midi.channel {
            Some(ch @ 1..=16) => ChannelFilter::Channel(ch - 1),
            _ => ChannelFilter::Omni,
        }
    }

    /// Build the CC map. Entries are assigned in order, so a later entry
    /// asking for a taken number moves to the next free one.
    pub fn cc_map(&self) -> Result<CcMap, ConfigError> {
        let mut map = CcMap::new();
        for (i, cc) in self.cc.iter().enumerate() {
            let target = cc.target().ok_or_else(|| {
                ConfigError::invalid(
                    format!("cc[{i}]"),
                    format!("unknown target '{}' / '{}'", cc.module, cc.parameter),
                )
            })?;
            map.assign(cc.cc, target)
                .ok_or_else(|| ConfigError::invalid(format!("cc[{i}].cc"), "no free CC number"))?;
        }
        Ok(map)
    }

    /// Replace the `[[cc]]` entries with the contents of `map`.
    pub fn set_cc_map(&mut self, map: &CcMap) {
        self.cc = map
            .iter()
            .map(|(cc, target)| CcAssignment::new(target, cc))
            .collect();
    }

    /// Engine settings at `sample_rate`.
    pub fn engine_config(&self, sample_rate: f32) -> EngineConfig {
        EngineConfig {
            sample_rate,
            voices: self.engine.voices,
            recorder_seconds: self.engine.recorder_seconds,
            seed: self.engine.seed,
        }
    }
}
