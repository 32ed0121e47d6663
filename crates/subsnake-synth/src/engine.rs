//! Polyphonic engine: voice pool, allocation, and the mix bus.
//!
//! # Allocation
//!
//! Note-on picks a voice in this order:
//!
//! 1. the voice already mapped to the note, if it is still sounding
//!    (a same-note retrigger keeps its voice);
//! 2. the oldest voice on the stopped list;
//! 3. the oldest voice on the released list, whose old note is unmapped;
//! 4. round-robin stealing with a cursor.
//!
//! Voices return to the stopped list only through the `Silent` lifecycle
//! event, evaluated after each block.
//!
//! # Mix bus
//!
//! ```text
//! Σ voices ─► delay ─► recorder ─► ×0.29 ─► tanh ─► out
//! ```
//!
//! The delay is driven by an engine-level modulator bank whose envelopes
//! are gated while any voice is active.
//!
//! Nothing in [`Engine::render`] allocates or locks. Parameters are read
//! from the shared [`ParamStore`] once per block of at most [`MAX_BLOCK`]
//! frames.

use std::collections::VecDeque;
use std::sync::Arc;

use subsnake_core::{
    AntiAlias, DelayModulation, FilterType, Interpolation, LfoShape, MAX_BLOCK, ModEnvMode,
    Oversampling, Rng, StereoDelay, Waveform,
};

use crate::cc::{ALL_NOTES_OFF, CcMap};
use crate::lifecycle::{PoolAction, VoiceEvent, VoiceStatus};
use crate::modulators::ModulatorBank;
use crate::params::{ParamId, ParamStore};
use crate::patch::Patch;
use crate::recorder::{DEFAULT_RECORD_SECONDS, Recorder, RecorderHandle, recorder};
use crate::routing::{ModRoute, ModRouting, ModTarget};
use crate::scheduler::VoiceCommand;
use crate::voice::Voice;

/// Gain applied to the mix before the soft limiter.
pub const HEADROOM: f32 = 0.29;

/// Construction-time settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Size of the voice pool.
    pub voices: usize,
    /// Recorder length in seconds.
    pub recorder_seconds: f32,
    /// Seed for the per-voice detune offsets and noise sources.
    pub seed: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            voices: 8,
            recorder_seconds: DEFAULT_RECORD_SECONDS,
            seed: 0x5AB5_AE01,
        }
    }
}

/// The synth engine.
///
/// ```rust
/// use subsnake_synth::{Engine, EngineConfig};
///
/// let mut engine = Engine::new(EngineConfig {
///     recorder_seconds: 1.0,
///     ..EngineConfig::default()
/// });
/// engine.note_on(60, 100, 0);
/// let mut block = vec![[0.0f32; 2]; 512];
/// engine.render(&mut block);
/// assert!(block.iter().any(|f| f[0] != 0.0));
/// ```
#[derive(Debug)]
pub struct Engine {
    sample_rate: f32,
    voices: Vec<Voice>,
    note_to_voice: [Option<usize>; 128],
    stopped: VecDeque<usize>,
    released: VecDeque<usize>,
    steal_cursor: usize,

    params: Arc<ParamStore>,
    applied: Vec<u32>,
    routing: ModRouting,
    cc_map: CcMap,

    global_mods: ModulatorBank,
    global_gate: bool,
    delay: StereoDelay,
    recorder: Recorder,
    recorder_handle: Option<RecorderHandle>,

    voice_buf: Vec<[f32; 2]>,
    mix_buf: Vec<[f32; 2]>,
}

impl Engine {
    /// Create an engine with its own parameter store.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_params(config, Arc::new(ParamStore::new()))
    }

    /// Create an engine reading from a shared parameter store.
    pub fn with_params(config: EngineConfig, params: Arc<ParamStore>) -> Self {
        let sample_rate = config.sample_rate.max(1.0);
        let count = config.voices.max(1);
        let mut rng = Rng::new(config.seed);
        let voices: Vec<Voice> = (0..count).map(|i| Voice::new(sample_rate, i, &mut rng)).collect();
        let global_mods = ModulatorBank::new(sample_rate, rng.next_u32());
        let capacity = (sample_rate * config.recorder_seconds.max(0.0)) as usize;
        let (recorder, recorder_handle) = recorder(capacity);

        tracing::debug!(
            voices = count,
            sample_rate,
            recorder_frames = capacity,
            "engine created"
        );

        let mut engine = Self {
            sample_rate,
            voices,
            note_to_voice: [None; 128],
            stopped: (0..count).collect(),
            released: VecDeque::with_capacity(count),
            steal_cursor: 0,
            params,
            // NaN bit pattern: the store never holds it, so the first sync
            // applies every parameter.
            applied: vec![u32::MAX; ParamId::COUNT],
            routing: ModRouting::new(),
            cc_map: CcMap::new(),
            global_mods,
            global_gate: false,
            delay: StereoDelay::new(sample_rate),
            recorder,
            recorder_handle: Some(recorder_handle),
            voice_buf: vec![[0.0; 2]; MAX_BLOCK],
            mix_buf: vec![[0.0; 2]; MAX_BLOCK],
        };
        engine.sync_params();
        engine.delay.clear();
        engine
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The voice pool.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Voice currently mapped to `note`.
    pub fn voice_for_note(&self, note: u8) -> Option<usize> {
        self.note_to_voice.get(note as usize).copied().flatten()
    }

    /// Number of voices with an open gate.
    pub fn active_voices(&self) -> usize {
        self.voices
            .iter()
            .filter(|v| v.status() == VoiceStatus::Active)
            .count()
    }

    /// Voices on the stopped list, oldest first.
    pub fn stopped_voices(&self) -> impl Iterator<Item = usize> + '_ {
        self.stopped.iter().copied()
    }

    /// Voices on the released list, oldest first.
    pub fn released_voices(&self) -> impl Iterator<Item = usize> + '_ {
        self.released.iter().copied()
    }

    /// The shared parameter store.
    pub fn params(&self) -> &Arc<ParamStore> {
        &self.params
    }

    /// Set a parameter and apply it immediately.
    pub fn set_param(&mut self, id: ParamId, value: f32) {
        self.params.set(id, value);
        self.sync_params();
    }

    /// Current value of a parameter.
    pub fn param(&self, id: ParamId) -> f32 {
        self.params.get(id)
    }

    /// Route a modulator to a target.
    pub fn set_route(&mut self, target: ModTarget, route: ModRoute) {
        self.params.set_route(target, route);
        self.routing.set(target, self.params.route(target));
    }

    /// The routing table in effect.
    pub fn routing(&self) -> &ModRouting {
        &self.routing
    }

    /// Replace the CC assignments.
    pub fn set_cc_map(&mut self, map: CcMap) {
        self.cc_map = map;
    }

    /// The CC assignments.
    pub fn cc_map(&self) -> &CcMap {
        &self.cc_map
    }

    /// The mix-bus delay.
    pub fn delay(&self) -> &StereoDelay {
        &self.delay
    }

    /// The looper.
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Take the looper's control handle. Only the first call returns it.
    pub fn take_recorder_handle(&mut self) -> Option<RecorderHandle> {
        self.recorder_handle.take()
    }

    /// Load a patch over the current state.
    pub fn apply(&mut self, patch: &Patch) {
        patch.apply_to(&self.params);
        self.sync_params();
    }

    /// Snapshot the current state as a patch.
    pub fn serialize(&self) -> Patch {
        Patch::from_store(&self.params)
    }

    /// Pull changed parameters and all routes from the store.
    pub fn sync_params(&mut self) {
        for id in ParamId::ALL {
            let bits = self.params.raw(id);
            if bits != self.applied[id.index()] {
                self.applied[id.index()] = bits;
                self.apply_param(id, f32::from_bits(bits));
            }
        }
        for target in ModTarget::ALL {
            self.routing.set(target, self.params.route(target));
        }
    }

    fn for_each_voice(&mut self, mut f: impl FnMut(&mut Voice)) {
        for voice in &mut self.voices {
            f(voice);
        }
    }

    fn for_each_bank(&mut self, mut f: impl FnMut(&mut ModulatorBank)) {
        for voice in &mut self.voices {
            f(voice.modulators_mut());
        }
        f(&mut self.global_mods);
    }

    fn apply_param(&mut self, id: ParamId, value: f32) {
        let index = value.max(0.0) as usize;
        match id {
            ParamId::OscDrift => self.for_each_voice(|v| {
                for i in 0..3 {
                    v.oscillator_mut(i).set_drift(value);
                }
            }),
            ParamId::OscFreq => self.for_each_voice(|v| v.set_octave(0, value)),
            ParamId::Osc2Freq => self.for_each_voice(|v| v.set_octave(1, value)),
            ParamId::Osc3Freq => self.for_each_voice(|v| v.set_octave(2, value)),
            ParamId::Osc2Det => self.for_each_voice(|v| v.set_detune(1, value)),
            ParamId::Osc3Det => self.for_each_voice(|v| v.set_detune(2, value)),
            ParamId::OscAmp => self.for_each_voice(|v| v.oscillator_mut(0).set_amplitude(value)),
            ParamId::Osc2Amp => self.for_each_voice(|v| v.oscillator_mut(1).set_amplitude(value)),
            ParamId::Osc3Amp => self.for_each_voice(|v| v.oscillator_mut(2).set_amplitude(value)),
            ParamId::OscWidth => self.for_each_voice(|v| v.oscillator_mut(0).set_width(value)),
            ParamId::Osc2Width => self.for_each_voice(|v| v.oscillator_mut(1).set_width(value)),
            ParamId::Osc3Width => self.for_each_voice(|v| v.oscillator_mut(2).set_width(value)),
            ParamId::OscWave | ParamId::Osc2Wave | ParamId::Osc3Wave => {
                let osc = osc_slot(id);
                let wave = waveform(index);
                self.for_each_voice(|v| v.oscillator_mut(osc).set_waveform(wave));
            }
            ParamId::OscQuality | ParamId::Osc2Quality | ParamId::Osc3Quality => {
                let osc = osc_slot(id);
                let aa = if index == 1 { AntiAlias::PolyBlep } else { AntiAlias::Blit };
                self.for_each_voice(|v| v.oscillator_mut(osc).set_anti_alias(aa));
            }
            ParamId::FiltFreq => self.for_each_voice(|v| v.filter_mut().set_cutoff(value)),
            ParamId::FiltRes => self.for_each_voice(|v| v.filter_mut().set_resonance(value)),
            ParamId::FiltDrive => self.for_each_voice(|v| v.filter_mut().set_drive(value)),
            ParamId::FiltSat => self.for_each_voice(|v| v.filter_mut().set_saturation(value)),
            ParamId::FiltKey => self.for_each_voice(|v| v.filter_mut().set_key_track(value)),
            ParamId::FiltType => {
                let mode = match index {
                    1 => FilterType::Highpass,
                    2 => FilterType::Bandpass,
                    3 => FilterType::Notch,
                    _ => FilterType::Lowpass,
                };
                self.for_each_voice(|v| v.filter_mut().set_filter_type(mode));
            }
            ParamId::FiltOversample => {
                let os = if index == 1 { Oversampling::X8 } else { Oversampling::X4 };
                self.for_each_voice(|v| v.filter_mut().set_oversampling(os));
            }
            ParamId::FenvAtt => self.for_each_voice(|v| v.filter_env_mut().set_attack(value)),
            ParamId::FenvDec => self.for_each_voice(|v| v.filter_env_mut().set_decay(value)),
            ParamId::FenvSus => self.for_each_voice(|v| v.filter_env_mut().set_sustain(value)),
            ParamId::FenvRel => self.for_each_voice(|v| v.filter_env_mut().set_release(value)),
            ParamId::FenvAmt => self.for_each_voice(|v| v.filter_mut().set_env_amount(value)),
            ParamId::EnvAtt => self.for_each_voice(|v| v.amp_env_mut().set_attack(value)),
            ParamId::EnvDec => self.for_each_voice(|v| v.amp_env_mut().set_decay(value)),
            ParamId::EnvSus => self.for_each_voice(|v| v.amp_env_mut().set_sustain(value)),
            ParamId::EnvRel => self.for_each_voice(|v| v.amp_env_mut().set_release(value)),
            ParamId::DelTime => self.delay.set_time(value),
            ParamId::DelFback => self.delay.set_feedback(value),
            ParamId::DelMix => self.delay.set_mix(value),
            ParamId::DelInterp => self.delay.set_interpolation(if index == 1 {
                Interpolation::Hermite
            } else {
                Interpolation::Linear
            }),
            ParamId::Lfo1Freq | ParamId::Lfo2Freq => {
                let lfo = usize::from(id == ParamId::Lfo2Freq);
                self.for_each_bank(|b| b.lfo_mut(lfo).set_frequency(value));
            }
            ParamId::Lfo1Phase | ParamId::Lfo2Phase => {
                let lfo = usize::from(id == ParamId::Lfo2Phase);
                self.for_each_bank(|b| b.lfo_mut(lfo).set_phase_offset(value));
            }
            ParamId::Lfo1Shape | ParamId::Lfo2Shape => {
                let lfo = usize::from(id == ParamId::Lfo2Shape);
                let shape = lfo_shape(index);
                self.for_each_bank(|b| b.lfo_mut(lfo).set_shape(shape));
            }
            ParamId::Menv1Att | ParamId::Menv2Att => {
                let env = usize::from(id == ParamId::Menv2Att);
                self.for_each_bank(|b| b.env_mut(env).set_attack(value));
            }
            ParamId::Menv1Rel | ParamId::Menv2Rel => {
                let env = usize::from(id == ParamId::Menv2Rel);
                self.for_each_bank(|b| b.env_mut(env).set_release(value));
            }
            ParamId::Menv1Mode | ParamId::Menv2Mode => {
                let env = usize::from(id == ParamId::Menv2Mode);
                let mode = match index {
                    1 => ModEnvMode::Hold,
                    2 => ModEnvMode::Loop,
                    _ => ModEnvMode::OneShot,
                };
                self.for_each_bank(|b| b.env_mut(env).set_mode(mode));
            }
        }
    }

    fn perform(&mut self, index: usize, action: PoolAction) {
        match action {
            PoolAction::None => {}
            PoolAction::Reclaim => self.released.retain(|&v| v != index),
            PoolAction::QueueReleased => self.released.push_back(index),
            PoolAction::Retire => {
                let note = self.voices[index].base_note() as usize;
                if self.note_to_voice[note] == Some(index) {
                    self.note_to_voice[note] = None;
                }
                self.released.retain(|&v| v != index);
                self.stopped.push_back(index);
            }
        }
    }

    fn unmap_voice(&mut self, index: usize) {
        let old = self.voices[index].base_note() as usize;
        if self.note_to_voice[old] == Some(index) {
            self.note_to_voice[old] = None;
        }
    }

    fn allocate(&mut self, note: u8) -> usize {
        if let Some(index) = self.note_to_voice[note as usize] {
            if self.voices[index].status() != VoiceStatus::Stopped {
                return index;
            }
        }
        if let Some(index) = self.stopped.pop_front() {
            self.unmap_voice(index);
            return index;
        }
        if let Some(index) = self.released.pop_front() {
            self.unmap_voice(index);
            return index;
        }
        let index = self.steal_cursor % self.voices.len();
        self.steal_cursor = (index + 1) % self.voices.len();
        self.unmap_voice(index);
        index
    }

    /// Start `note` `offset` samples into the next block. Velocity 0 is a
    /// note-off.
    pub fn note_on(&mut self, note: u8, velocity: u8, offset: usize) {
        if note > 127 {
            return;
        }
        if velocity == 0 {
            self.note_off(note, offset);
            return;
        }
        let index = self.allocate(note);
        let action = self.voices[index].apply_event(VoiceEvent::Trigger);
        self.perform(index, action);
        self.note_to_voice[note as usize] = Some(index);
        self.voices[index].trigger(note, f32::from(velocity.min(127)) / 127.0, offset);
    }

    /// Release `note` `offset` samples into the next block.
    pub fn note_off(&mut self, note: u8, offset: usize) {
        let Some(index) = self.voice_for_note(note) else {
            return;
        };
        if self.voices[index].status() != VoiceStatus::Active {
            return;
        }
        self.voices[index].release(offset);
        let action = self.voices[index].apply_event(VoiceEvent::Release);
        self.perform(index, action);
    }

    /// Release every held note.
    pub fn all_notes_off(&mut self, offset: usize) {
        for note in 0..128u8 {
            self.note_off(note, offset);
        }
    }

    /// Silence everything at once: voices, delay line, note map.
    pub fn panic(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }
        self.note_to_voice = [None; 128];
        self.stopped.clear();
        self.stopped.extend(0..self.voices.len());
        self.released.clear();
        self.steal_cursor = 0;
        self.global_mods.reset();
        self.global_gate = false;
        self.delay.clear();
    }

    /// Apply one scheduled command.
    pub fn handle(&mut self, command: VoiceCommand) {
        match command {
            VoiceCommand::NoteOn {
                note,
                velocity,
                offset,
            } => self.note_on(note, velocity, offset),
            VoiceCommand::NoteOff { note, offset } => self.note_off(note, offset),
            VoiceCommand::Control {
                controller,
                value,
                offset,
            } => {
                if controller == ALL_NOTES_OFF {
                    self.all_notes_off(offset);
                } else {
                    // Continuous parameters change at block boundaries.
                    self.cc_map.apply(controller, value, &self.params);
                }
            }
            VoiceCommand::AllNotesOff { offset } => self.all_notes_off(offset),
        }
    }

    /// Render `out.len()` frames of the mix.
    pub fn render(&mut self, out: &mut [[f32; 2]]) {
        for chunk in out.chunks_mut(MAX_BLOCK) {
            self.render_block(chunk);
        }
    }

    fn render_block(&mut self, out: &mut [[f32; 2]]) {
        let frames = out.len();
        self.sync_params();

        let any_active = self.voices.iter().any(|v| v.status() == VoiceStatus::Active);
        if any_active != self.global_gate {
            self.global_gate = any_active;
            if any_active {
                self.global_mods.gate_on(0);
            } else {
                self.global_mods.gate_off(0);
            }
        }
        self.global_mods.render(frames, &self.routing);

        let mix = &mut self.mix_buf[..frames];
        mix.fill([0.0; 2]);
        for voice in &mut self.voices {
            if voice.status() == VoiceStatus::Stopped {
                continue;
            }
            let buf = &mut self.voice_buf[..frames];
            voice.render(buf, &self.routing);
            for (m, v) in mix.iter_mut().zip(buf.iter()) {
                m[0] += v[0];
                m[1] += v[1];
            }
        }

        let src = self.global_mods.sources();
        let mods = DelayModulation {
            time: src.input(&self.routing, ModTarget::DelTime),
            feedback: src.input(&self.routing, ModTarget::DelFback),
            mix: src.input(&self.routing, ModTarget::DelMix),
        };
        self.delay.process(mix, &mods);
        self.recorder.process(mix);

        for (o, m) in out.iter_mut().zip(mix.iter()) {
            o[0] = (m[0] * HEADROOM).tanh();
            o[1] = (m[1] * HEADROOM).tanh();
        }

        for index in 0..self.voices.len() {
            let voice = &self.voices[index];
            if voice.status() != VoiceStatus::Stopped && voice.is_silent() {
                let action = self.voices[index].apply_event(VoiceEvent::Silent);
                self.perform(index, action);
            }
        }
    }

    /// Render into an interleaved buffer with `channels` channels.
    /// Channels past the second receive the left signal.
    pub fn render_interleaved(&mut self, out: &mut [f32], channels: usize, scratch: &mut [[f32; 2]]) {
        let channels = channels.max(1);
        for chunk in out.chunks_mut(channels * scratch.len().max(1)) {
            let frames = chunk.len() / channels;
            let block = &mut scratch[..frames];
            self.render(block);
            for (frame, s) in chunk.chunks_exact_mut(channels).zip(block.iter()) {
                for (ch, sample) in frame.iter_mut().enumerate() {
                    *sample = if ch == 1 { s[1] } else { s[0] };
                }
            }
        }
    }
}

fn osc_slot(id: ParamId) -> usize {
    match id {
        ParamId::Osc2Wave | ParamId::Osc2Quality => 1,
        ParamId::Osc3Wave | ParamId::Osc3Quality => 2,
        _ => 0,
    }
}

fn waveform(index: usize) -> Waveform {
    match index {
        0 => Waveform::Sine,
        1 => Waveform::Saw,
        3 => Waveform::Triangle,
        _ => Waveform::Pulse,
    }
}

fn lfo_shape(index: usize) -> LfoShape {
    match index {
        1 => LfoShape::Triangle,
        2 => LfoShape::Ramp,
        3 => LfoShape::Saw,
        4 => LfoShape::Square,
        5 => LfoShape::SampleAndHold,
        _ => LfoShape::Sine,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::ModSource;

    fn engine(voices: usize) -> Engine {
        Engine::new(EngineConfig {
            voices,
            recorder_seconds: 0.5,
            ..EngineConfig::default()
        })
    }

    fn render_blocks(engine: &mut Engine, blocks: usize) -> Vec<[f32; 2]> {
        let mut out = Vec::new();
        let mut block = vec![[0.0f32; 2]; 512];
        for _ in 0..blocks {
            engine.render(&mut block);
            out.extend_from_slice(&block);
        }
        out
    }

    #[test]
    fn test_allocates_stopped_voices_in_order() {
        let mut e = engine(4);
        for (i, note) in [60u8, 62, 64].iter().enumerate() {
            e.note_on(*note, 100, 0);
            assert_eq!(e.voice_for_note(*note), Some(i));
        }
        assert_eq!(e.active_voices(), 3);
        assert_eq!(e.stopped_voices().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_steal_is_round_robin() {
        let mut e = engine(2);
        e.note_on(60, 100, 0);
        e.note_on(62, 100, 0);
        e.note_on(64, 100, 0);
        assert_eq!(e.voice_for_note(64), Some(0));
        assert_eq!(e.voice_for_note(60), None);
        e.note_on(65, 100, 0);
        assert_eq!(e.voice_for_note(65), Some(1));
        assert_eq!(e.voice_for_note(62), None);
        e.note_on(67, 100, 0);
        assert_eq!(e.voice_for_note(67), Some(0));
    }

    #[test]
    fn test_released_voice_reused_before_stealing() {
        let mut e = engine(2);
        e.set_param(ParamId::EnvRel, 1.0);
        e.note_on(60, 100, 0);
        e.note_on(62, 100, 0);
        e.note_off(62, 0);
        assert_eq!(e.released_voices().collect::<Vec<_>>(), vec![1]);
        e.note_on(70, 100, 0);
        assert_eq!(e.voice_for_note(70), Some(1));
        assert_eq!(e.voice_for_note(62), None, "stale mapping removed");
        assert_eq!(e.voice_for_note(60), Some(0));
        assert_eq!(e.released_voices().count(), 0);
    }

    #[test]
    fn test_same_note_retrigger_reuses_voice() {
        let mut e = engine(4);
        e.note_on(60, 100, 0);
        render_blocks(&mut e, 2);
        e.note_off(60, 0);
        render_blocks(&mut e, 1);
        assert_eq!(e.voices()[0].status(), VoiceStatus::Releasing);
        e.note_on(60, 90, 0);
        assert_eq!(e.voice_for_note(60), Some(0));
        assert_eq!(e.voices()[0].status(), VoiceStatus::Active);
        assert_eq!(e.released_voices().count(), 0);
        assert_eq!(e.stopped_voices().count(), 3);
    }

    #[test]
    fn test_silent_voice_returns_to_pool() {
        let mut e = engine(2);
        e.set_param(ParamId::EnvRel, 0.01);
        e.note_on(60, 100, 0);
        render_blocks(&mut e, 2);
        e.note_off(60, 0);
        render_blocks(&mut e, 20);
        assert_eq!(e.voices()[0].status(), VoiceStatus::Stopped);
        assert_eq!(e.voice_for_note(60), None);
        assert_eq!(e.stopped_voices().collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(e.released_voices().count(), 0);
    }

    #[test]
    fn test_voice_retires_in_the_block_its_release_ends() {
        let mut e = engine(2);
        e.set_param(ParamId::EnvRel, 0.001);
        e.note_on(60, 127, 0);
        render_blocks(&mut e, 2);
        e.note_off(60, 0);
        let tail = render_blocks(&mut e, 1);
        assert!(tail[..64].iter().any(|f| f[0].abs() > 1e-4), "release tail rendered");
        assert_eq!(e.voices()[0].status(), VoiceStatus::Stopped);
        assert_eq!(e.stopped_voices().collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(e.voice_for_note(60), None);
    }

    #[test]
    fn test_osc_drift_audible_across_range() {
        let render = |drift: f32| {
            let mut e = engine(2);
            e.set_param(ParamId::OscDrift, drift);
            e.note_on(57, 100, 0);
            render_blocks(&mut e, 86)
        };
        let max_diff = |a: &[[f32; 2]], b: &[[f32; 2]]| {
            a.iter().zip(b).fold(0.0f32, |m, (x, y)| m.max((x[0] - y[0]).abs()))
        };
        let one = render(1.0);
        assert!(max_diff(&render(0.0), &one) > 1e-5);
        assert!(max_diff(&one, &render(10.0)) > 1e-3);
    }

    #[test]
    fn test_velocity_zero_is_note_off() {
        let mut e = engine(2);
        e.note_on(60, 100, 0);
        e.note_on(60, 0, 0);
        assert_eq!(e.voices()[0].status(), VoiceStatus::Releasing);
    }

    #[test]
    fn test_note_off_for_unknown_note_is_ignored() {
        let mut e = engine(2);
        e.note_off(30, 0);
        assert_eq!(e.released_voices().count(), 0);
        assert_eq!(e.active_voices(), 0);
    }

    #[test]
    fn test_output_is_soft_limited() {
        let mut e = engine(8);
        e.set_param(ParamId::Osc2Amp, 1.0);
        e.set_param(ParamId::Osc3Amp, 1.0);
        e.set_param(ParamId::FiltDrive, 9.0);
        for note in 40..48 {
            e.note_on(note, 127, 0);
        }
        for f in render_blocks(&mut e, 20) {
            assert!(f[0].abs() < 1.0 && f[1].abs() < 1.0);
        }
    }

    #[test]
    fn test_all_notes_off_releases_everything() {
        let mut e = engine(4);
        for note in [50, 55, 60] {
            e.note_on(note, 100, 0);
        }
        e.handle(VoiceCommand::Control {
            controller: ALL_NOTES_OFF,
            value: 0,
            offset: 0,
        });
        assert_eq!(e.active_voices(), 0);
        assert_eq!(e.released_voices().count(), 3);
    }

    #[test]
    fn test_panic_resets_pool() {
        let mut e = engine(3);
        for note in [50, 55, 60, 65] {
            e.note_on(note, 100, 0);
        }
        render_blocks(&mut e, 1);
        e.panic();
        assert_eq!(e.stopped_voices().collect::<Vec<_>>(), vec![0, 1, 2]);
        let out = render_blocks(&mut e, 1);
        assert!(out.iter().all(|f| f[0] == 0.0));
    }

    #[test]
    fn test_cc_writes_param_store() {
        let mut e = engine(2);
        let mut map = CcMap::new();
        map.assign(74, crate::cc::CcTarget::FilterCutoff);
        e.set_cc_map(map);
        e.handle(VoiceCommand::Control {
            controller: 74,
            value: 0,
            offset: 0,
        });
        assert!((e.param(ParamId::FiltFreq) - 27.5).abs() < 1e-3);
    }

    #[test]
    fn test_global_modulators_gate_with_voices() {
        let mut e = engine(2);
        e.set_param(ParamId::Menv1Att, 0.01);
        e.set_param(ParamId::EnvRel, 0.01);
        e.set_route(ModTarget::DelMix, ModRoute::new(ModSource::ModEnv1, 1.0));
        render_blocks(&mut e, 1);
        assert!(!e.global_gate);
        e.note_on(60, 100, 0);
        render_blocks(&mut e, 1);
        assert!(e.global_gate);
        assert!(e.global_mods.sources().buffer(ModSource::ModEnv1)[100] > 0.0);
        e.note_off(60, 0);
        render_blocks(&mut e, 1);
        assert!(!e.global_gate);
    }

    #[test]
    fn test_param_store_changes_picked_up_per_block() {
        let mut e = engine(2);
        e.params().set(ParamId::DelMix, 0.7);
        assert_eq!(e.delay().mix(), 0.0);
        render_blocks(&mut e, 1);
        assert_eq!(e.delay().mix(), 0.7);
    }

    #[test]
    fn test_interleaved_duplicates_extra_channels() {
        let mut e = engine(2);
        e.note_on(69, 127, 0);
        let mut scratch = vec![[0.0f32; 2]; 128];
        let mut out = vec![0.0f32; 300 * 4];
        e.render_interleaved(&mut out, 4, &mut scratch);
        assert!(out.iter().any(|&s| s != 0.0));
        for frame in out.chunks_exact(4) {
            assert_eq!(frame[2], frame[0]);
            assert_eq!(frame[3], frame[0]);
        }
    }
}
