//! Audio and MIDI I/O for the subsnake synthesizer.
//!
//! This crate provides:
//!
//! - **Audio output**: [`resolve_output`] picks a cpal device and
//!   [`OutputTarget::start`] runs a [`SynthProcessor`](subsnake_synth::SynthProcessor)
//!   in its callback
//! - **MIDI input**: [`list_ports`] and [`connect_midi`] feed timestamped
//!   messages to the scheduler
//! - **WAV files**: [`write_wav_frames`] for offline renders and loop dumps
//! - **Sessions**: [`Session`] wires the pieces together and swaps devices
//!   without losing state
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use subsnake_io::{Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::default())?;
//! session.start_audio()?;
//! session.set_midi_input("0")?;
//! // ... play ...
//! session.shutdown();
//! ```

mod midi;
mod session;
mod stream;
mod wav;

pub use midi::{MidiConnection, MidiPort, connect_midi, list_ports};
pub use session::{Session, SessionConfig};
pub use stream::{
    AudioDevice, OutputTarget, StreamConfig, SynthOutput, default_output_device, list_devices,
    resolve_output,
};
pub use wav::{WavFormat, WavInfo, WavSpec, read_wav_frames, read_wav_info, write_wav_frames};

/// Error types for audio and MIDI I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// MIDI subsystem error.
    #[error("MIDI error: {0}")]
    Midi(String),

    /// The requested MIDI port was not found.
    #[error("MIDI port not found: {0}")]
    MidiPortNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio and MIDI I/O.
pub type Result<T> = std::result::Result<T, Error>;
