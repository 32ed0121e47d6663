//! Subsnake Synth - Polyphonic voice engine for the subsnake synthesizer
//!
//! This crate turns the DSP blocks of `subsnake-core` into a playable
//! instrument: a pool of voices, their modulation routing, the parameter
//! registry the UI and patches speak, and the threading glue that gets
//! MIDI into the audio callback with sample accuracy.
//!
//! # Core Components
//!
//! ## Engine
//!
//! - [`Engine`] - Voice pool, note allocation, delay, recorder, limiter
//! - [`Voice`] - Three oscillators, filter, two ADSRs, per-voice modulators
//! - [`VoiceStatus`] / [`transition`] - The voice lifecycle table
//!
//! ```rust
//! use subsnake_synth::{Engine, EngineConfig, ParamId};
//!
//! let mut engine = Engine::new(EngineConfig {
//!     recorder_seconds: 1.0,
//!     ..EngineConfig::default()
//! });
//! engine.set_param(ParamId::OscWave, 1.0); // saw
//! engine.set_param(ParamId::FiltFreq, 880.0);
//!
//! engine.note_on(60, 100, 0);
//! engine.note_on(64, 100, 128);
//!
//! let mut block = vec![[0.0f32; 2]; 512];
//! engine.render(&mut block);
//! ```
//!
//! ## Parameters and Patches
//!
//! - [`ParamId`] / [`ParamSpec`] - Every scalar parameter with its range
//!   and control curve
//! - [`ParamStore`] - Lock-free mirror shared between UI and audio thread
//! - [`ModTarget`] / [`ModSource`] / [`ModRouting`] - Modulation routing
//! - [`Patch`] - Flat key/value snapshot
//! - [`CcMap`] / [`CcTarget`] - MIDI CC assignments
//!
//! ## Realtime Plumbing
//!
//! - [`SchedulerCore`] / [`MidiScheduler`] - Resolve MIDI timestamps to
//!   frame offsets
//! - [`SynthProcessor`] - What the audio callback runs
//! - [`Recorder`] / [`RecorderHandle`] - Looper and its transport
//! - [`ScopeWriter`] / [`ScopeReader`] - Oscilloscope tap

pub mod cc;
pub mod engine;
pub mod lifecycle;
pub mod modulators;
pub mod params;
pub mod patch;
pub mod recorder;
pub mod routing;
pub mod runtime;
pub mod scheduler;
pub mod scope;
pub mod voice;

pub use cc::{ALL_NOTES_OFF, CC_TABLE, CcEntry, CcMap, CcTarget};
pub use engine::{Engine, EngineConfig, HEADROOM};
pub use lifecycle::{PoolAction, VoiceEvent, VoiceStatus, transition};
pub use modulators::{ModSources, ModulatorBank};
pub use params::{Curve, ParamId, ParamSpec, ParamStore};
pub use patch::{Patch, PatchValue};
pub use recorder::{
    DEFAULT_RECORD_SECONDS, Recorder, RecorderEvent, RecorderHandle, format_time, recorder,
};
pub use routing::{ModRoute, ModRouting, ModSource, ModTarget};
pub use runtime::SynthProcessor;
pub use scheduler::{
    AudioQueues, BlockWindow, ChannelFilter, CommandQueues, DEFAULT_PERIOD, MIN_PERIOD, MidiEvent,
    MidiScheduler, QUEUE_CAPACITY, Resolution, SchedulerClock, SchedulerCore, VoiceCommand,
    audio_queues, decode, event_queue, resolve,
};
pub use scope::{ScopeReader, ScopeWriter, scope};
pub use voice::{Voice, note_to_frequency};
