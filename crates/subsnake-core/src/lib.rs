//! Subsnake Core - DSP primitives for a polyphonic subtractive synth
//!
//! Everything in this crate renders whole blocks at a time and never
//! allocates after construction, so it is safe to call from an audio
//! callback.
//!
//! # Sources
//!
//! - [`Oscillator`] - BLIT or polyBLEP sine/saw/pulse/triangle
//! - [`Lfo`] - Six-shape control oscillator
//! - [`ModEnv`] - One-shot, hold or looping AR envelope
//!
//! # Processors
//!
//! - [`StateVariableFilter`] - Oversampled nonlinear Chamberlin SVF
//! - [`Adsr`] - Sample-accurate ADSR with offset gates
//! - [`StereoDelay`] - Smoothed-time feedback delay
//!
//! # Modulation
//!
//! Every modulatable parameter takes a [`ModInput`]: a control buffer plus
//! a depth. Unassigned inputs read from [`ZERO_BLOCK`].
//!
//! # no_std Support
//!
//! Disable the default `std` feature to build for embedded targets:
//!
//! ```toml
//! [dependencies]
//! subsnake-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use subsnake_core::{
//!     Adsr, AdsrModulation, FilterModulation, OscModulation, Oscillator, StateVariableFilter,
//! };
//!
//! let sr = 44100.0;
//! let mut osc = Oscillator::new(sr);
//! let mut filter = StateVariableFilter::new(sr);
//! let mut amp = Adsr::new(sr);
//! amp.gate_on(0);
//!
//! let mut block = [[0.0f32; 2]; 256];
//! osc.render(&mut block, &OscModulation::default());
//! filter.render(&mut block, &[], &FilterModulation::default());
//! amp.apply(&mut block, &AdsrModulation::default());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod blit;
pub mod delay;
pub mod envelope;
pub mod lfo;
pub mod math;
pub mod mod_env;
pub mod modulation;
pub mod oscillator;
pub mod random;
pub mod svf;

pub use blit::{BlitSaw, FractionalDelay};
pub use delay::{DelayModulation, Interpolation, MAX_DELAY_SECONDS, StereoDelay};
pub use envelope::{Adsr, AdsrModulation, EnvelopeStage, THRESHOLD};
pub use lfo::{Lfo, LfoModulation, LfoShape};
pub use math::{cubic_clip, flush_denormal, hermite4, lerp, one_pole_coeff, wet_dry_mix};
pub use mod_env::{ModEnv, ModEnvMode, ModEnvModulation};
pub use modulation::{MAX_BLOCK, ModInput, ZERO_BLOCK};
pub use oscillator::{
    AntiAlias, MAX_DETUNE_HZ, MAX_DRIFT, MIN_FREQUENCY, OscModulation, Oscillator, Waveform,
};
pub use random::Rng;
pub use svf::{FilterModulation, FilterType, Oversampling, StateVariableFilter};
