//! Integration tests for subsnake-synth.
//!
//! Tests cover voice allocation and stealing, patch round trips, MIDI
//! scheduling into the engine, the looper, and the end-to-end envelope
//! timing of a rendered note.

use subsnake_core::{EnvelopeStage, THRESHOLD};
use subsnake_synth::{
    BlockWindow, ChannelFilter, Engine, EngineConfig, MidiEvent, ModRoute, ModSource, ModTarget,
    ParamId, Patch, PatchValue, Resolution, SchedulerClock, SchedulerCore, SynthProcessor,
    VoiceStatus, audio_queues, event_queue, resolve,
};

const SR: f32 = 44100.0;
const BLOCK: usize = 512;

fn engine(voices: usize) -> Engine {
    Engine::new(EngineConfig {
        sample_rate: SR,
        voices,
        recorder_seconds: 2.0,
        seed: 7,
    })
}

fn render(engine: &mut Engine, frames: usize) -> Vec<[f32; 2]> {
    let mut out = vec![[0.0f32; 2]; frames];
    for chunk in out.chunks_mut(BLOCK) {
        engine.render(chunk);
    }
    out
}

// ---------------------------------------------------------------------------
// 1. Voice allocation and stealing
// ---------------------------------------------------------------------------

#[test]
fn extra_note_steals_exactly_one_voice() {
    let mut e = engine(4);
    let notes = [60u8, 62, 64, 65];
    for &n in &notes {
        e.note_on(n, 100, 0);
    }
    render(&mut e, BLOCK);
    e.note_on(67, 100, 0);

    let still_mapped: Vec<u8> = notes
        .iter()
        .copied()
        .filter(|&n| e.voice_for_note(n).is_some())
        .collect();
    assert_eq!(still_mapped, vec![62, 64, 65], "only the first voice is stolen");
    assert_eq!(e.voice_for_note(67), Some(0));
    assert_eq!(e.active_voices(), 4);
}

#[test]
fn stealing_walks_the_pool_in_order() {
    let mut e = engine(3);
    for n in 40..43 {
        e.note_on(n, 100, 0);
    }
    let stolen: Vec<usize> = (50..56)
        .map(|n| {
            e.note_on(n, 100, 0);
            e.voice_for_note(n).unwrap_or(usize::MAX)
        })
        .collect();
    assert_eq!(stolen, vec![0, 1, 2, 0, 1, 2]);
}

#[test]
fn retrigger_while_releasing_reuses_voice() {
    let mut e = engine(4);
    e.set_param(ParamId::EnvRel, 1.0);
    e.note_on(48, 100, 0);
    e.note_on(52, 100, 0);
    render(&mut e, BLOCK);
    e.note_off(52, 0);
    render(&mut e, BLOCK);

    let index = e.voice_for_note(52);
    assert_eq!(index, Some(1));
    assert_eq!(e.voices()[1].status(), VoiceStatus::Releasing);

    e.note_on(52, 80, 0);
    assert_eq!(e.voice_for_note(52), index);
    assert_eq!(e.voices()[1].status(), VoiceStatus::Active);
    assert_eq!(e.released_voices().count(), 0);
}

#[test]
fn released_voices_are_taken_oldest_first() {
    let mut e = engine(3);
    e.set_param(ParamId::EnvRel, 1.0);
    for n in [60, 61, 62] {
        e.note_on(n, 100, 0);
    }
    e.note_off(62, 0);
    e.note_off(60, 0);
    e.note_on(70, 100, 0);
    assert_eq!(e.voice_for_note(70), Some(2));
    e.note_on(71, 100, 0);
    assert_eq!(e.voice_for_note(71), Some(0));
    assert_eq!(e.voice_for_note(60), None);
    assert_eq!(e.voice_for_note(62), None);
}

// ---------------------------------------------------------------------------
// 2. Patches
// ---------------------------------------------------------------------------

#[test]
fn applying_a_serialized_patch_reproduces_output() {
    let mut a = engine(4);
    a.set_param(ParamId::OscWave, 1.0);
    a.set_param(ParamId::Osc2Amp, 0.7);
    a.set_param(ParamId::Osc2Det, 3.0);
    a.set_param(ParamId::FiltFreq, 1200.0);
    a.set_param(ParamId::FiltType, 2.0);
    a.set_param(ParamId::DelMix, 0.3);
    a.set_param(ParamId::DelTime, 0.05);
    a.set_param(ParamId::Lfo1Freq, 4.0);
    a.set_route(ModTarget::FiltFreq, ModRoute::new(ModSource::Lfo1, 0.5));
    a.set_route(ModTarget::OscWidth, ModRoute::new(ModSource::ModEnv2, -0.3));

    let patch = a.serialize();
    let mut b = engine(4);
    b.apply(&patch);
    assert_eq!(b.serialize(), patch);

    for e in [&mut a, &mut b] {
        e.note_on(57, 110, 0);
        e.note_on(64, 90, 200);
    }
    let out_a = render(&mut a, 8 * BLOCK);
    let out_b = render(&mut b, 8 * BLOCK);
    assert_eq!(out_a, out_b);
    assert!(out_a.iter().any(|f| f[0] != 0.0));
}

#[test]
fn partial_patch_layers_over_current_state() {
    let mut e = engine(2);
    e.set_param(ParamId::EnvAtt, 0.3);
    let mut patch = Patch::new();
    patch.set("filt_type", PatchValue::Text("notch".into()));
    patch.set("no_such_key", PatchValue::Number(1.0));
    e.apply(&patch);
    assert_eq!(e.param(ParamId::FiltType), 3.0);
    assert_eq!(e.param(ParamId::EnvAtt), 0.3);
}

// ---------------------------------------------------------------------------
// 3. Scheduling
// ---------------------------------------------------------------------------

#[test]
fn scheduler_offset_matches_window_position() {
    let window = BlockWindow::new(2.0, BLOCK, SR, 0.0);
    let width = window.frame_end - window.frame_start;
    for frame in [0usize, 1, 100, 255, 511] {
        let ts = window.frame_start + width * frame as f64 / BLOCK as f64;
        assert_eq!(resolve(ts, &window), Resolution::Dispatch(frame));
    }
    assert_eq!(resolve(window.frame_end + 0.001, &window), Resolution::Defer);
}

#[test]
fn midi_reaches_engine_at_scheduled_offset() {
    let clock = SchedulerClock::new();
    let (audio, sched) = audio_queues(64);
    let (mut midi, events) = event_queue(64);
    let mut core = SchedulerCore::new(events, sched, ChannelFilter::Channel(0));
    let mut processor = SynthProcessor::new(engine(4), audio, clock);
    processor.engine_mut().set_param(ParamId::EnvAtt, 0.001);

    let mut data = vec![0.0f32; BLOCK * 2];
    processor.process_interleaved(&mut data, 2, 0.0);
    core.tick();
    let window = *core.window().unwrap_or(&BlockWindow::new(0.0, BLOCK, SR, 0.0));
    let ts = window.frame_start + 300.0 / f64::from(SR);

    midi.push(MidiEvent::new(&[0x90, 69, 127], ts)).unwrap();
    midi.push(MidiEvent::new(&[0x91, 40, 127], ts)).unwrap();
    assert_eq!(core.tick(), 1, "other channels are filtered");

    processor.process_interleaved(&mut data, 2, 0.0);
    let frames: Vec<f32> = data.chunks_exact(2).map(|f| f[0]).collect();
    assert!(frames[..300].iter().all(|&s| s == 0.0));
    assert!(frames[300..].iter().any(|&s| s != 0.0));
    assert_eq!(processor.engine().voice_for_note(69), Some(0));
    assert_eq!(processor.engine().voice_for_note(40), None);
}

// ---------------------------------------------------------------------------
// 4. Recorder
// ---------------------------------------------------------------------------

#[test]
fn recording_then_stopping_sets_heads() {
    let mut e = engine(2);
    let handle = e.take_recorder_handle();
    let Some(handle) = handle else {
        panic!("first take returns the handle");
    };
    assert!(e.take_recorder_handle().is_none());

    handle.set_record(true);
    handle.play();
    e.note_on(60, 100, 0);
    render(&mut e, 10 * BLOCK);
    handle.stop();
    render(&mut e, BLOCK);

    assert_eq!(e.recorder().end_heads(), [10 * BLOCK, 10 * BLOCK]);
    assert_eq!(e.recorder().play_heads(), [0, 0]);
    assert!(e.recorder().recorded().iter().any(|f| f[0] != 0.0));
    assert_eq!(handle.readout(SR), "00:00 / 00:00");
}

// ---------------------------------------------------------------------------
// 5. End to end: envelope timing of a rendered note
// ---------------------------------------------------------------------------

#[test]
fn rendered_note_follows_envelope_laws() {
    let attack = 0.05;
    let decay = 0.1;
    let sustain = 0.5;
    let mut e = engine(4);
    e.set_param(ParamId::EnvAtt, attack);
    e.set_param(ParamId::EnvDec, decay);
    e.set_param(ParamId::EnvSus, sustain);
    e.note_on(60, 127, 0);

    // One attack time constant.
    let tau = (attack * SR) as usize;
    render(&mut e, tau);
    let level = e.voices()[0].amp_env().level();
    let expected = 1.0 - (-1.0f32).exp();
    assert!((level - expected).abs() < 0.002, "level after tau: {level}");

    // Attack completes when within the threshold of full scale.
    let mut rendered = tau;
    let mut one = [[0.0f32; 2]; 1];
    while e.voices()[0].amp_env().stage() == EnvelopeStage::Attack {
        e.render(&mut one);
        rendered += 1;
        assert!(rendered < 20 * tau, "attack never completed");
    }
    let completion = (attack * SR * (1.0 / THRESHOLD).ln()) as usize;
    assert!(rendered.abs_diff(completion) <= 2, "attack finished at {rendered}");
    assert_eq!(e.voices()[0].amp_env().level(), 1.0);

    // Decay towards sustain.
    let steps = 2000;
    render(&mut e, steps);
    let tau_d = decay * SR;
    let expected = sustain + (1.0 - sustain) * (-(steps as f32) / tau_d).exp();
    let level = e.voices()[0].amp_env().level();
    assert!((level - expected).abs() < 1e-3, "decay level {level}, expected {expected}");
}

#[test]
fn released_note_returns_voice_to_pool() {
    let mut e = engine(2);
    e.set_param(ParamId::EnvRel, 0.02);
    e.note_on(60, 127, 0);
    render(&mut e, 4 * BLOCK);
    e.note_off(60, 37);
    let bound = (0.02 * SR * (1.0 / THRESHOLD).ln()) as usize + 37 + BLOCK;
    render(&mut e, bound);
    assert_eq!(e.voices()[0].status(), VoiceStatus::Stopped);
    assert_eq!(e.voice_for_note(60), None);
    let tail = render(&mut e, 2 * BLOCK);
    assert!(tail.iter().all(|f| f[0].abs() < 1e-3), "only the delay tail remains");
}
