//! Stereo feedback delay for the mix bus.
//!
//! Each channel owns a two-second circular buffer. The read offset glides
//! toward the requested delay time through a one-pole smoother
//! (α = 0.0001 per sample), so time changes and time modulation sweep the
//! pitch of the repeats instead of clicking.
//!
//! ```text
//! delayed = buffer[write − offset]           (fractional read)
//! buffer[write] = delayed·feedback + dry
//! out     = (1 − mix)·dry + mix·delayed
//! ```

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use crate::math::{hermite4, lerp, wet_dry_mix};
use crate::modulation::ModInput;

/// Buffer length per channel, in seconds.
pub const MAX_DELAY_SECONDS: f32 = 2.0;

/// Per-sample smoothing coefficient of the read offset.
const OFFSET_SMOOTHING: f32 = 0.0001;

/// Highest usable feedback gain.
const MAX_FEEDBACK: f32 = 0.99;

/// Fractional read method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Two-point linear.
    #[default]
    Linear,
    /// Four-point, third-order Hermite.
    Hermite,
}

/// Per-sample modulation inputs for the delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelayModulation<'a> {
    /// Added to the delay time, in seconds.
    pub time: ModInput<'a>,
    /// Added to the feedback gain.
    pub feedback: ModInput<'a>,
    /// Added to the wet/dry mix.
    pub mix: ModInput<'a>,
}

#[derive(Debug, Clone)]
struct DelayChannel {
    buffer: Vec<f32>,
    write: usize,
    offset: f32,
}

impl DelayChannel {
    #[inline]
    fn at(&self, back: usize) -> f32 {
        let len = self.buffer.len();
        self.buffer[(self.write + len - back % len) % len]
    }

    #[inline]
    fn read(&self, interpolation: Interpolation) -> f32 {
        let whole = self.offset as usize;
        let frac = self.offset - whole as f32;
        match interpolation {
            Interpolation::Linear => lerp(self.at(whole), self.at(whole + 1), frac),
            Interpolation::Hermite => hermite4(
                self.at(whole.saturating_sub(1)),
                self.at(whole),
                self.at(whole + 1),
                self.at(whole + 2),
                frac,
            ),
        }
    }
}

/// Two-channel feedback delay with smoothed, modulatable time.
#[derive(Debug, Clone)]
pub struct StereoDelay {
    sample_rate: f32,
    channels: [DelayChannel; 2],
    time: f32,
    feedback: f32,
    mix: f32,
    interpolation: Interpolation,
}

impl StereoDelay {
    /// Allocate the buffers. Starts at 1 s time, 0.5 feedback, dry.
    pub fn new(sample_rate: f32) -> Self {
        let len = (sample_rate * MAX_DELAY_SECONDS) as usize + 4;
        #[cfg(feature = "tracing")]
        tracing::debug!("stereo_delay: allocating {len} frames per channel");
        let time = 1.0;
        let channel = DelayChannel {
            buffer: vec![0.0; len],
            write: 0,
            offset: time * sample_rate,
        };
        Self {
            sample_rate,
            channels: [channel.clone(), channel],
            time,
            feedback: 0.5,
            mix: 0.0,
            interpolation: Interpolation::Linear,
        }
    }

    fn max_offset(&self) -> f32 {
        (self.channels[0].buffer.len() - 3) as f32
    }

    /// Set the delay time in seconds, clamped to \[0, 2\].
    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds.clamp(0.0, MAX_DELAY_SECONDS);
    }

    /// Delay time in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Set the feedback gain.
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, MAX_FEEDBACK);
    }

    /// Feedback gain.
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Set the wet/dry mix in \[0, 1\].
    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// Wet/dry mix.
    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// Select the fractional read method.
    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// Current read method.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Smoothed read offset of the left channel, in samples.
    pub fn current_offset(&self) -> f32 {
        self.channels[0].offset
    }

    /// Silence the buffers and snap the read offset to the target.
    pub fn clear(&mut self) {
        let offset = (self.time * self.sample_rate).clamp(1.0, self.max_offset());
        for ch in &mut self.channels {
            ch.buffer.fill(0.0);
            ch.write = 0;
            ch.offset = offset;
        }
    }

    /// Process a stereo buffer in place.
    pub fn process(&mut self, buffer: &mut [[f32; 2]], mods: &DelayModulation<'_>) {
        let max_offset = self.max_offset();
        for (n, frame) in buffer.iter_mut().enumerate() {
            let target = ((self.time + mods.time.at(n)) * self.sample_rate).clamp(1.0, max_offset);
            let feedback = (self.feedback + mods.feedback.at(n)).clamp(0.0, MAX_FEEDBACK);
            let mix = (self.mix + mods.mix.at(n)).clamp(0.0, 1.0);

            for (ch, state) in self.channels.iter_mut().enumerate() {
                state.offset += OFFSET_SMOOTHING * (target - state.offset);
                let delayed = state.read(self.interpolation);
                let dry = frame[ch];
                let write = state.write;
                state.buffer[write] = delayed * feedback + dry;
                state.write = (write + 1) % state.buffer.len();
                frame[ch] = wet_dry_mix(dry, delayed, mix);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse_response(delay: &mut StereoDelay, frames: usize) -> Vec<[f32; 2]> {
        let mut buf = vec![[0.0f32; 2]; frames];
        buf[0] = [1.0, 1.0];
        delay.process(&mut buf, &DelayModulation::default());
        buf
    }

    #[test]
    fn test_dry_when_mix_zero() {
        let mut delay = StereoDelay::new(1000.0);
        let mut buf = [[0.3f32, -0.2]; 64];
        delay.process(&mut buf, &DelayModulation::default());
        assert!(buf.iter().all(|f| f[0] == 0.3 && f[1] == -0.2));
    }

    #[test]
    fn test_echo_arrives_at_delay_time() {
        let mut delay = StereoDelay::new(1000.0);
        delay.set_time(0.1);
        delay.set_mix(1.0);
        delay.set_feedback(0.0);
        delay.clear();
        let out = impulse_response(&mut delay, 300);
        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1[0].total_cmp(&b.1[0]))
            .map(|(i, _)| i)
            .unwrap_or(0);
        assert_eq!(peak, 100);
        assert!(out[200][0].abs() < 1e-6, "no feedback expected");
    }

    #[test]
    fn test_feedback_repeats_decay() {
        let mut delay = StereoDelay::new(1000.0);
        delay.set_time(0.05);
        delay.set_mix(1.0);
        delay.set_feedback(0.5);
        delay.clear();
        let out = impulse_response(&mut delay, 200);
        assert!((out[50][0] - 1.0).abs() < 1e-3);
        assert!((out[100][0] - 0.5).abs() < 1e-3);
        assert!((out[150][0] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_offset_glides_toward_new_time() {
        let mut delay = StereoDelay::new(1000.0);
        delay.set_time(1.0);
        delay.clear();
        delay.set_time(0.5);
        let mut buf = [[0.0f32; 2]; 1000];
        delay.process(&mut buf, &DelayModulation::default());
        let offset = delay.current_offset();
        assert!(offset < 1000.0 && offset > 500.0, "offset = {}", offset);
    }

    #[test]
    fn test_hermite_matches_linear_on_integer_offset() {
        let mut a = StereoDelay::new(1000.0);
        let mut b = StereoDelay::new(1000.0);
        for d in [&mut a, &mut b] {
            d.set_time(0.02);
            d.set_mix(1.0);
            d.set_feedback(0.0);
            d.clear();
        }
        b.set_interpolation(Interpolation::Hermite);
        let x = impulse_response(&mut a, 64);
        let y = impulse_response(&mut b, 64);
        for (p, q) in x.iter().zip(&y) {
            assert!((p[0] - q[0]).abs() < 1e-4);
        }
    }

    #[test]
    fn test_feedback_clamped() {
        let mut delay = StereoDelay::new(1000.0);
        delay.set_feedback(5.0);
        assert_eq!(delay.feedback(), MAX_FEEDBACK);
    }
}
