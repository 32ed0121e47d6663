//! Band-limited audio oscillator with per-sample modulation.
//!
//! Four waveforms share one phase accumulator (radians, wrapped to \[0, 2π)):
//!
//! | Waveform | [`AntiAlias::Blit`] | [`AntiAlias::PolyBlep`] |
//! |----------|---------------------|-------------------------|
//! | Sine     | `sin(φ)`            | `sin(φ)`                |
//! | Saw      | integrated BLIT     | naive ramp + 2-point BLEP |
//! | Pulse    | saw − delayed saw   | saw − phase-shifted saw |
//! | Triangle | integrated pulse    | integrated pulse        |
//!
//! The BLIT pulse reads the second saw through a fractional delay of
//! `width·period` samples, so pitch bends and width sweeps never produce a
//! discontinuity. The triangle is the pulse run through a leaky integrator
//! and normalised by `inc_cycles / (w·(1 − w))` so its span stays near 2 at
//! any width.
//!
//! # Modulation
//!
//! [`Oscillator::render`] consumes one value per output sample from each of
//! the four [`ModInput`]s in [`OscModulation`]:
//!
//! ```text
//! inc  = base_inc·(1 + pitch) + (2π·10/fs)·detune + drift
//! gain = max(0, amplitude − amp_mod)
//! w    = width + 0.25·width_mod
//! ```
//!
//! # Example
//!
//! ```rust
//! use subsnake_core::{Oscillator, OscModulation, Waveform};
//!
//! let mut osc = Oscillator::new(48000.0);
//! osc.set_frequency(220.0);
//! osc.set_waveform(Waveform::Saw);
//!
//! let mut block = [[0.0f32; 2]; 256];
//! osc.render(&mut block, &OscModulation::default());
//! assert!(block.iter().all(|s| s[0] == s[1]));
//! ```

use core::f32::consts::{PI, TAU};
use libm::sinf;

use crate::blit::{BlitSaw, FractionalDelay, leak_coefficient};
use crate::math::flush_denormal;
use crate::modulation::ModInput;
use crate::random::Rng;

/// Lowest oscillator frequency in Hz; bounds the pulse delay line.
pub const MIN_FREQUENCY: f32 = 8.0;

/// Detune in Hz produced by a full-scale detune modulation.
pub const MAX_DETUNE_HZ: f32 = 10.0;

/// Largest accepted drift depth.
pub const MAX_DRIFT: f32 = 10.0;

/// Pitch deviation (fraction of the base increment) per unit of drift depth.
const DRIFT_SCALE: f32 = 0.002;

/// Width travel (in cycles) at full width modulation.
const WIDTH_MOD_SCALE: f32 = 0.25;

/// Oscillator waveform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    /// Pure sine.
    Sine,
    /// Rising sawtooth.
    Saw,
    /// Variable-width pulse.
    #[default]
    Pulse,
    /// Variable-symmetry triangle.
    Triangle,
}

/// Anti-aliasing method used for the discontinuous waveforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AntiAlias {
    /// Band-limited impulse train integration.
    #[default]
    Blit,
    /// Polynomial band-limited step corrections.
    PolyBlep,
}

/// Per-sample modulation inputs for one oscillator.
#[derive(Debug, Clone, Copy, Default)]
pub struct OscModulation<'a> {
    /// Relative pitch change: 1.0 doubles the frequency.
    pub pitch: ModInput<'a>,
    /// Detune, 1.0 = +10 Hz.
    pub detune: ModInput<'a>,
    /// Subtracted from the amplitude.
    pub amplitude: ModInput<'a>,
    /// Added to the pulse width, 1.0 = a quarter cycle.
    pub width: ModInput<'a>,
}

/// Band-limited oscillator.
#[derive(Debug, Clone)]
pub struct Oscillator {
    sample_rate: f32,
    phase: f32,
    frequency: f32,
    base_inc: f32,
    max_detune_inc: f32,
    amplitude: f32,
    width: f32,
    waveform: Waveform,
    anti_alias: AntiAlias,

    saw: BlitSaw,
    pulse_delay: FractionalDelay,
    triangle: f32,

    drift_depth: f32,
    drift_walk: f32,
    rng: Rng,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Oscillator {
    /// Create an oscillator at 440 Hz, full amplitude, 50 % width.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_seed(sample_rate, 0x5EED_0001)
    }

    /// Create an oscillator whose drift walk uses the given seed.
    pub fn with_seed(sample_rate: f32, seed: u32) -> Self {
        let max_period = (sample_rate / MIN_FREQUENCY) as usize + 1;
        let mut osc = Self {
            sample_rate,
            phase: 0.0,
            frequency: 440.0,
            base_inc: 0.0,
            max_detune_inc: TAU * MAX_DETUNE_HZ / sample_rate,
            amplitude: 1.0,
            width: 0.5,
            waveform: Waveform::default(),
            anti_alias: AntiAlias::default(),
            saw: BlitSaw::new(),
            pulse_delay: FractionalDelay::new(max_period),
            triangle: 0.0,
            drift_depth: 0.0,
            drift_walk: 0.0,
            rng: Rng::new(seed),
        };
        osc.set_frequency(440.0);
        osc
    }

    /// Set the base frequency in Hz, clamped to \[8 Hz, 0.45·fs\].
    pub fn set_frequency(&mut self, freq: f32) {
        self.frequency = freq.clamp(MIN_FREQUENCY, self.max_frequency());
        self.base_inc = TAU * self.frequency / self.sample_rate;
    }

    /// Base frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set the output amplitude (≥ 0).
    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude.max(0.0);
    }

    /// Output amplitude.
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Set the pulse width in \[0, 1\].
    pub fn set_width(&mut self, width: f32) {
        self.width = width.clamp(0.0, 1.0);
    }

    /// Pulse width.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Select the waveform.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Current waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Select the anti-aliasing method.
    pub fn set_anti_alias(&mut self, anti_alias: AntiAlias) {
        self.anti_alias = anti_alias;
    }

    /// Current anti-aliasing method.
    pub fn anti_alias(&self) -> AntiAlias {
        self.anti_alias
    }

    /// Set the analog-style drift depth in \[0, [`MAX_DRIFT`]\].
    pub fn set_drift(&mut self, depth: f32) {
        self.drift_depth = depth.clamp(0.0, MAX_DRIFT);
    }

    /// Current phase in radians.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Reset phase and integrator state.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.saw.reset();
        self.pulse_delay.clear();
        self.triangle = 0.0;
        self.drift_walk = 0.0;
    }

    fn max_frequency(&self) -> f32 {
        0.45 * self.sample_rate
    }

    /// Fill `out` with stereo frames. Both channels carry the same signal.
    pub fn render(&mut self, out: &mut [[f32; 2]], mods: &OscModulation<'_>) {
        let min_inc = TAU * MIN_FREQUENCY / self.sample_rate;
        let max_inc = TAU * 0.45;
        let drift_step = self.rng.next_bipolar();

        for (n, frame) in out.iter_mut().enumerate() {
            self.drift_walk = self.drift_walk * 0.99999 + 0.00001 * drift_step;
            let drift = self.base_inc * self.drift_walk * DRIFT_SCALE * self.drift_depth;

            let inc = (self.base_inc * (1.0 + mods.pitch.at(n))
                + self.max_detune_inc * mods.detune.at(n)
                + drift)
                .clamp(min_inc, max_inc);
            let gain = (self.amplitude - mods.amplitude.at(n)).max(0.0);
            let width = self.width + WIDTH_MOD_SCALE * mods.width.at(n);

            let sample = match self.waveform {
                Waveform::Sine => sinf(self.phase),
                Waveform::Saw => self.saw_sample(inc),
                Waveform::Pulse => self.pulse_sample(inc, width.clamp(0.0, 1.0)),
                Waveform::Triangle => {
                    let w = width.clamp(0.01, 0.99);
                    let pulse = self.pulse_sample(inc, w);
                    let scale = (inc / TAU) / (w * (1.0 - w));
                    self.triangle =
                        flush_denormal(leak_coefficient(inc) * self.triangle + pulse * scale);
                    self.triangle
                }
            };

            let y = sample * gain;
            *frame = [y, y];

            self.phase += inc;
            if self.phase >= TAU {
                self.phase -= TAU;
            }
        }
    }

    #[inline]
    fn saw_sample(&mut self, inc: f32) -> f32 {
        match self.anti_alias {
            AntiAlias::Blit => self.saw.next(self.phase, inc),
            AntiAlias::PolyBlep => poly_blep_saw(self.phase, inc),
        }
    }

    #[inline]
    fn pulse_sample(&mut self, inc: f32, width: f32) -> f32 {
        match self.anti_alias {
            AntiAlias::Blit => {
                let saw = self.saw.next(self.phase, inc);
                let period = TAU / inc;
                saw - self.pulse_delay.write_read(saw, width * period)
            }
            AntiAlias::PolyBlep => {
                let mut shifted = self.phase + TAU * width;
                if shifted >= TAU {
                    shifted -= TAU;
                }
                poly_blep_saw(self.phase, inc) - poly_blep_saw(shifted, inc)
            }
        }
    }
}

/// Rising saw at `phase` (radians) with 2-point polyBLEP corrections at the wrap.
#[inline]
pub fn poly_blep_saw(phase: f32, inc: f32) -> f32 {
    let mut y = phase / PI - 1.0;
    if phase < inc {
        let t = phase / inc;
        y += (t - 1.0) * (t - 1.0);
    } else if phase + inc > TAU {
        let t = (TAU - phase) / inc;
        y -= (t - 1.0) * (t - 1.0);
    }
    y
}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn render_mono(osc: &mut Oscillator, n: usize, mods: &OscModulation<'_>) -> Vec<f32> {
        let mut block = vec![[0.0f32; 2]; n];
        osc.render(&mut block, mods);
        block.iter().map(|f| f[0]).collect()
    }

    fn rising_crossings(samples: &[f32]) -> i32 {
        let mut count = 0;
        let mut prev = 0.0;
        for &s in samples {
            if prev <= 0.0 && s > 0.0 {
                count += 1;
            }
            prev = s;
        }
        count
    }

    fn goertzel_magnitude_db(signal: &[f32], bin: usize, n: usize) -> f32 {
        let w = 2.0 * core::f64::consts::PI * bin as f64 / n as f64;
        let coeff = 2.0 * libm::cos(w);
        let mut s0: f64 = 0.0;
        let mut s1: f64 = 0.0;
        let mut s2: f64;
        for &x in signal.iter().take(n) {
            s2 = s1;
            s1 = s0;
            s0 = f64::from(x) + coeff * s1 - s2;
        }
        let real = s0 - s1 * libm::cos(w);
        let imag = s1 * libm::sin(w);
        let magnitude = libm::sqrt(real * real + imag * imag) / (n as f64 / 2.0);
        20.0 * libm::log10(magnitude.max(1e-12)) as f32
    }

    #[test]
    fn test_sine_frequency_440hz() {
        let mut osc = Oscillator::new(48000.0);
        osc.set_waveform(Waveform::Sine);
        osc.set_frequency(440.0);
        let samples = render_mono(&mut osc, 48000, &OscModulation::default());
        let crossings = rising_crossings(&samples);
        assert!((crossings - 440).abs() <= 2, "crossings = {}", crossings);
    }

    #[test]
    fn test_blit_saw_frequency() {
        let mut osc = Oscillator::new(44100.0);
        osc.set_waveform(Waveform::Saw);
        osc.set_frequency(100.0);
        let samples = render_mono(&mut osc, 44100, &OscModulation::default());
        let crossings = rising_crossings(&samples[4410..]);
        assert!((crossings - 90).abs() <= 2, "crossings = {}", crossings);
    }

    #[test]
    fn test_pitch_mod_doubles_frequency() {
        let mut osc = Oscillator::new(48000.0);
        osc.set_waveform(Waveform::Sine);
        osc.set_frequency(200.0);
        let ones = [1.0f32; 2048];
        let mods = OscModulation {
            pitch: ModInput::new(&ones, 1.0),
            ..OscModulation::default()
        };
        let mut crossings: i32 = 0;
        let mut prev = 0.0;
        for _ in 0..24 {
            for s in render_mono(&mut osc, 2000, &mods) {
                if prev <= 0.0 && s > 0.0 {
                    crossings += 1;
                }
                prev = s;
            }
        }
        assert!((crossings - 400).abs() <= 2, "crossings = {}", crossings);
    }

    #[test]
    fn test_detune_mod_adds_hertz() {
        let mut osc = Oscillator::new(48000.0);
        osc.set_waveform(Waveform::Sine);
        osc.set_frequency(100.0);
        let ones = [1.0f32; 2048];
        let mods = OscModulation {
            detune: ModInput::new(&ones, 1.0),
            ..OscModulation::default()
        };
        let mut crossings: i32 = 0;
        let mut prev = 0.0;
        for _ in 0..24 {
            for s in render_mono(&mut osc, 2000, &mods) {
                if prev <= 0.0 && s > 0.0 {
                    crossings += 1;
                }
                prev = s;
            }
        }
        assert!((crossings - 110).abs() <= 2, "crossings = {}", crossings);
    }

    #[test]
    fn test_full_amp_mod_silences() {
        let mut osc = Oscillator::new(48000.0);
        osc.set_waveform(Waveform::Saw);
        let ones = [1.0f32; 512];
        let mods = OscModulation {
            amplitude: ModInput::new(&ones, 2.0),
            ..OscModulation::default()
        };
        let samples = render_mono(&mut osc, 512, &mods);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_channels_identical() {
        let mut osc = Oscillator::new(48000.0);
        osc.set_waveform(Waveform::Triangle);
        let mut block = [[0.0f32; 2]; 300];
        osc.render(&mut block, &OscModulation::default());
        for f in &block {
            assert_eq!(f[0], f[1]);
        }
    }

    #[test]
    fn test_triangle_settles_in_range() {
        for aa in [AntiAlias::Blit, AntiAlias::PolyBlep] {
            let mut osc = Oscillator::new(48000.0);
            osc.set_waveform(Waveform::Triangle);
            osc.set_anti_alias(aa);
            osc.set_frequency(220.0);
            osc.set_width(0.3);
            let samples = render_mono(&mut osc, 48000, &OscModulation::default());
            let tail = &samples[24000..];
            let max = tail.iter().copied().fold(f32::MIN, f32::max);
            let min = tail.iter().copied().fold(f32::MAX, f32::min);
            assert!(max - min > 1.5 && max - min < 2.6, "{:?} span {}", aa, max - min);
            assert!(max < 2.0 && min > -2.0, "{:?} range {}..{}", aa, min, max);
        }
    }

    #[test]
    fn test_pulse_bounded_under_width_sweep() {
        let mut osc = Oscillator::new(48000.0);
        osc.set_waveform(Waveform::Pulse);
        let sweep: Vec<f32> = (0..2048).map(|n| libm::sinf(n as f32 * 0.01)).collect();
        let mods = OscModulation {
            width: ModInput::new(&sweep, 2.0),
            ..OscModulation::default()
        };
        for _ in 0..20 {
            for s in render_mono(&mut osc, 2048, &mods) {
                assert!(s.is_finite() && s.abs() < 4.0, "pulse sample {}", s);
            }
        }
    }

    #[test]
    fn test_frequency_clamped() {
        let mut osc = Oscillator::new(48000.0);
        osc.set_frequency(1.0);
        assert_eq!(osc.frequency(), MIN_FREQUENCY);
        osc.set_frequency(40000.0);
        assert!((osc.frequency() - 21600.0).abs() < 1e-2);
    }

    #[test]
    fn test_poly_blep_saw_shrinks_wrap_step() {
        let inc = TAU * 1000.0 / 48000.0;
        let naive_before = (TAU - 0.5 * inc) / PI - 1.0;
        let naive_after = (0.5 * inc) / PI - 1.0;
        let naive_step = (naive_before - naive_after).abs();

        let before = poly_blep_saw(TAU - 0.5 * inc, inc);
        let after = poly_blep_saw(0.5 * inc, inc);
        let step = (before - after).abs();
        assert!(step < 0.8 * naive_step, "step {} vs naive {}", step, naive_step);
        // The residual is antisymmetric around the wrap.
        assert!((before + after).abs() < 1e-4, "{} vs {}", before, after);
    }

    #[test]
    fn test_drift_detunes_slightly() {
        let mut osc = Oscillator::with_seed(48000.0, 77);
        osc.set_waveform(Waveform::Sine);
        osc.set_frequency(440.0);
        osc.set_drift(1.0);
        let samples = render_mono(&mut osc, 48000, &OscModulation::default());
        let crossings = rising_crossings(&samples);
        assert!((crossings - 440).abs() <= 10, "crossings = {}", crossings);
    }

    #[test]
    fn test_drift_depth_scales_over_full_range() {
        let render = |depth: f32| {
            let mut osc = Oscillator::with_seed(48000.0, 77);
            osc.set_waveform(Waveform::Sine);
            osc.set_frequency(440.0);
            osc.set_drift(depth);
            let mut out = Vec::new();
            for _ in 0..24 {
                out.extend(render_mono(&mut osc, 2000, &OscModulation::default()));
            }
            out
        };
        let max_diff = |a: &[f32], b: &[f32]| {
            a.iter().zip(b).fold(0.0f32, |m, (x, y)| m.max((x - y).abs()))
        };
        let low = render(1.0);
        let high = render(MAX_DRIFT);
        assert!(max_diff(&render(0.0), &low) > 1e-5);
        assert!(max_diff(&low, &high) > 1e-3, "depth 10 should drift further than 1");

        let mut osc = Oscillator::new(48000.0);
        osc.set_drift(25.0);
        assert_eq!(osc.drift_depth, MAX_DRIFT);
    }

    /// A 5 kHz BLIT saw at 48 kHz has harmonics at 5, 10, 15 and 20 kHz.
    /// Bins at 2, 7 and 12 kHz are where a naive saw would fold energy.
    #[test]
    fn test_blit_saw_alias_suppression_5khz() {
        let n = 48000;
        let mut osc = Oscillator::new(48000.0);
        osc.set_waveform(Waveform::Saw);
        osc.set_frequency(5000.0);
        let samples = render_mono(&mut osc, n, &OscModulation::default());

        let fundamental_db = goertzel_magnitude_db(&samples, 5000, n);
        for bin in [2000_usize, 7000, 12000] {
            let alias_db = goertzel_magnitude_db(&samples, bin, n);
            assert!(
                fundamental_db - alias_db > 40.0,
                "alias at {} Hz only {:.1} dB down (fundamental {:.1} dB)",
                bin,
                fundamental_db - alias_db,
                fundamental_db
            );
        }
    }
}
