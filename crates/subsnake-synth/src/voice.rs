//! One synth voice.
//!
//! Signal path per block:
//!
//! ```text
//! modulators ─┐ (per-sample buffers, resolved per target)
//!             ▼
//! osc1 ─┐
//! osc2 ─┼─ ×1/3 ─► filter ◄── filter env
//! osc3 ─┘            │
//!                    ▼
//!                amp env ─► ×velocity ─► out
//! ```
//!
//! Voices are created with the engine and live as long as it does. Their
//! status only changes through [`crate::lifecycle::transition`].

use subsnake_core::{
    Adsr, AdsrModulation, FilterModulation, MAX_BLOCK, ModInput, OscModulation, Oscillator, Rng,
    StateVariableFilter,
};

use crate::lifecycle::{PoolAction, VoiceEvent, VoiceStatus, transition};
use crate::modulators::ModulatorBank;
use crate::routing::{ModRouting, ModTarget};

/// Gain of each oscillator in the sum.
const OSC_MIX: f32 = 1.0 / 3.0;

/// Modulation targets of each oscillator: pitch, detune, amplitude, width.
const OSC_TARGETS: [(ModTarget, Option<ModTarget>, ModTarget, ModTarget); 3] = [
    (ModTarget::OscFreq, None, ModTarget::OscAmp, ModTarget::OscWidth),
    (
        ModTarget::Osc2Freq,
        Some(ModTarget::Osc2Det),
        ModTarget::Osc2Amp,
        ModTarget::Osc2Width,
    ),
    (
        ModTarget::Osc3Freq,
        Some(ModTarget::Osc3Det),
        ModTarget::Osc3Amp,
        ModTarget::Osc3Width,
    ),
];

/// Equal-tempered frequency of a MIDI note, A4 = 440 Hz.
#[inline]
pub fn note_to_frequency(note: u8) -> f32 {
    440.0 * 2.0f32.powf((f32::from(note) - 69.0) / 12.0)
}

/// A single polyphonic voice.
#[derive(Debug, Clone)]
pub struct Voice {
    index: usize,
    status: VoiceStatus,
    base_note: u8,
    velocity: f32,
    detune_offset: f32,

    oscillators: [Oscillator; 3],
    octaves: [f32; 3],
    detune_hz: [f32; 3],
    filter: StateVariableFilter,
    amp_env: Adsr,
    filter_env: Adsr,
    modulators: ModulatorBank,

    osc_scratch: Vec<[f32; 2]>,
    env_levels: Vec<f32>,
}

impl Voice {
    /// Create voice `index`. Its detune offset and noise seeds are drawn
    /// from `rng` once, here.
    pub fn new(sample_rate: f32, index: usize, rng: &mut Rng) -> Self {
        let detune_offset = rng.next_bipolar();
        let oscillators = std::array::from_fn(|_| Oscillator::with_seed(sample_rate, rng.next_u32()));
        Self {
            index,
            status: VoiceStatus::Stopped,
            base_note: 69,
            velocity: 0.0,
            detune_offset,
            oscillators,
            octaves: [0.0; 3],
            detune_hz: [0.0; 3],
            filter: StateVariableFilter::new(sample_rate),
            amp_env: Adsr::new(sample_rate),
            filter_env: Adsr::new(sample_rate),
            modulators: ModulatorBank::new(sample_rate, rng.next_u32()),
            osc_scratch: vec![[0.0; 2]; MAX_BLOCK],
            env_levels: vec![0.0; MAX_BLOCK],
        }
    }

    /// Stable position in the engine's pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current status.
    pub fn status(&self) -> VoiceStatus {
        self.status
    }

    /// Last note assigned.
    pub fn base_note(&self) -> u8 {
        self.base_note
    }

    /// Velocity in \[0, 1\].
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Fixed random scalar in \[-1, 1\] applied to the osc 2/3 detune.
    pub fn detune_offset(&self) -> f32 {
        self.detune_offset
    }

    /// Oscillator `index` (0..3).
    pub fn oscillator(&self, index: usize) -> &Oscillator {
        &self.oscillators[index]
    }

    /// Oscillator `index` (0..3), mutably.
    pub fn oscillator_mut(&mut self, index: usize) -> &mut Oscillator {
        &mut self.oscillators[index]
    }

    /// The filter.
    pub fn filter_mut(&mut self) -> &mut StateVariableFilter {
        &mut self.filter
    }

    /// The amplitude envelope.
    pub fn amp_env(&self) -> &Adsr {
        &self.amp_env
    }

    /// The amplitude envelope, mutably.
    pub fn amp_env_mut(&mut self) -> &mut Adsr {
        &mut self.amp_env
    }

    /// The filter envelope, mutably.
    pub fn filter_env_mut(&mut self) -> &mut Adsr {
        &mut self.filter_env
    }

    /// The per-voice LFOs and modulation envelopes.
    pub fn modulators_mut(&mut self) -> &mut ModulatorBank {
        &mut self.modulators
    }

    /// Octave offset of oscillator `index`.
    pub fn set_octave(&mut self, index: usize, octaves: f32) {
        self.octaves[index] = octaves;
        self.retune();
    }

    /// Detune of oscillator `index` in Hz, scaled by the voice's detune offset.
    pub fn set_detune(&mut self, index: usize, hz: f32) {
        self.detune_hz[index] = hz;
        self.retune();
    }

    fn retune(&mut self) {
        let base = note_to_frequency(self.base_note);
        for (i, osc) in self.oscillators.iter_mut().enumerate() {
            let freq = base * 2.0f32.powf(self.octaves[i]) + self.detune_hz[i] * self.detune_offset;
            osc.set_frequency(freq);
        }
    }

    /// Apply a lifecycle event; the caller performs the returned action.
    pub(crate) fn apply_event(&mut self, event: VoiceEvent) -> PoolAction {
        let (status, action) = transition(self.status, event);
        self.status = status;
        action
    }

    /// Start `note` at `offset` samples into the next block.
    pub(crate) fn trigger(&mut self, note: u8, velocity: f32, offset: usize) {
        self.base_note = note;
        self.velocity = velocity.clamp(0.0, 1.0);
        self.retune();
        self.filter.set_key_frequency(note_to_frequency(note));
        self.amp_env.gate_on(offset);
        self.filter_env.gate_on(offset);
        self.modulators.gate_on(offset);
    }

    /// Close every gate at `offset` samples into the next block.
    pub(crate) fn release(&mut self, offset: usize) {
        self.amp_env.gate_off(offset);
        self.filter_env.gate_off(offset);
        self.modulators.gate_off(offset);
    }

    /// Whether the amp envelope has finished.
    pub fn is_silent(&self) -> bool {
        self.amp_env.is_idle()
    }

    /// Return to Stopped with silent state.
    pub(crate) fn reset(&mut self) {
        self.status = VoiceStatus::Stopped;
        self.amp_env.reset();
        self.filter_env.reset();
        self.filter.reset();
        self.modulators.reset();
    }

    /// Render one block into `out`, overwriting it.
    pub fn render(&mut self, out: &mut [[f32; 2]], routing: &ModRouting) {
        let frames = out.len().min(MAX_BLOCK);
        let out = &mut out[..frames];
        out.fill([0.0; 2]);

        self.modulators.render(frames, routing);
        let src = self.modulators.sources();

        for (osc, &(pitch, detune, amplitude, width)) in
            self.oscillators.iter_mut().zip(OSC_TARGETS.iter())
        {
            let amp_route = routing.get(amplitude);
            if osc.amplitude() == 0.0 && !amp_route.is_active() {
                continue;
            }
            let mods = OscModulation {
                pitch: src.input(routing, pitch),
                detune: detune.map_or(ModInput::none(), |t| src.input(routing, t)),
                amplitude: src.input(routing, amplitude),
                width: src.input(routing, width),
            };
            let scratch = &mut self.osc_scratch[..frames];
            osc.render(scratch, &mods);
            for (o, s) in out.iter_mut().zip(scratch.iter()) {
                o[0] += s[0] * OSC_MIX;
                o[1] += s[1] * OSC_MIX;
            }
        }

        let levels = &mut self.env_levels[..frames];
        self.filter_env.render(
            levels,
            &AdsrModulation {
                attack: src.input(routing, ModTarget::FenvAtt),
                decay: src.input(routing, ModTarget::FenvDec),
                sustain: src.input(routing, ModTarget::FenvSus),
                release: src.input(routing, ModTarget::FenvRel),
            },
        );

        self.filter.render(
            out,
            levels,
            &FilterModulation {
                cutoff: src.input(routing, ModTarget::FiltFreq),
                resonance: src.input(routing, ModTarget::FiltRes),
                drive: src.input(routing, ModTarget::FiltDrive),
                saturation: src.input(routing, ModTarget::FiltSat),
                env_amount: src.input(routing, ModTarget::FenvAmt),
            },
        );

        self.amp_env.apply(
            out,
            &AdsrModulation {
                attack: src.input(routing, ModTarget::EnvAtt),
                decay: src.input(routing, ModTarget::EnvDec),
                sustain: src.input(routing, ModTarget::EnvSus),
                release: src.input(routing, ModTarget::EnvRel),
            },
        );

        let velocity = self.velocity;
        for frame in out.iter_mut() {
            frame[0] *= velocity;
            frame[1] *= velocity;
        }
    }
}
