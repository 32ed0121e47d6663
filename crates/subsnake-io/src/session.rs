//! A running instrument: audio stream, MIDI input and scheduler thread.
//!
//! The [`Session`] owns the long-lived state (parameter store, CC map,
//! scheduler clock) and swaps the device-bound parts around it. Opening a
//! new device is done completely before the old one is touched, so a
//! failed [`Session::start_audio`] or [`Session::set_midi_input`] leaves the
//! session exactly as it was.

use std::sync::Arc;
use std::time::Duration;

use subsnake_synth::{
    CcMap, ChannelFilter, DEFAULT_PERIOD, Engine, EngineConfig, MidiScheduler, ParamId,
    ParamStore, Patch, QUEUE_CAPACITY, RecorderHandle, SchedulerClock, SchedulerCore,
    ScopeReader, SynthProcessor, audio_queues, event_queue, scope,
};

use crate::Result;
use crate::midi::{MidiConnection, connect_midi};
use crate::stream::{StreamConfig, SynthOutput, resolve_output};

/// Frames kept for the oscilloscope.
const SCOPE_FRAMES: usize = 2048;

/// Session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Output device and buffer size.
    pub stream: StreamConfig,
    /// Voice pool size.
    pub voices: usize,
    /// Looper length in seconds.
    pub recorder_seconds: f32,
    /// Seed for per-voice randomness.
    pub seed: u32,
    /// MIDI channel filter.
    pub channel: ChannelFilter,
    /// Scheduler wake period.
    pub scheduler_period: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            stream: StreamConfig::default(),
            voices: engine.voices,
            recorder_seconds: engine.recorder_seconds,
            seed: engine.seed,
            channel: ChannelFilter::Omni,
            scheduler_period: DEFAULT_PERIOD,
        }
    }
}

/// The live instrument.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    params: Arc<ParamStore>,
    cc_map: CcMap,
    clock: SchedulerClock,
    scheduler: Option<MidiScheduler>,
    output: Option<SynthOutput>,
    midi: Option<MidiConnection>,
    recorder: Option<RecorderHandle>,
    scope: Option<ScopeReader>,
}

fn idle_core(channel: ChannelFilter) -> SchedulerCore {
    let (_events_tx, events_rx) = event_queue(1);
    let (_audio, commands) = audio_queues(1);
    SchedulerCore::new(events_rx, commands, channel)
}

impl Session {
    /// Create a session and start its scheduler thread. No device is
    /// opened yet.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let scheduler = MidiScheduler::spawn(idle_core(config.channel), config.scheduler_period)?;
        Ok(Self {
            config,
            params: Arc::new(ParamStore::new()),
            cc_map: CcMap::new(),
            clock: SchedulerClock::new(),
            scheduler: Some(scheduler),
            output: None,
            midi: None,
            recorder: None,
            scope: None,
        })
    }

    /// The shared parameter store. Writes reach the audio thread within
    /// one block.
    pub fn params(&self) -> &Arc<ParamStore> {
        &self.params
    }

    /// Set one parameter.
    pub fn set_param(&self, id: ParamId, value: f32) -> f32 {
        self.params.set(id, value)
    }

    /// Load a patch over the current state.
    pub fn apply_patch(&self, patch: &Patch) -> usize {
        patch.apply_to(&self.params)
    }

    /// Snapshot the current state.
    pub fn serialize(&self) -> Patch {
        Patch::from_store(&self.params)
    }

    /// CC assignments used by the next [`start_audio`](Self::start_audio).
    pub fn set_cc_map(&mut self, map: CcMap) {
        self.cc_map = map;
    }

    /// The CC assignments.
    pub fn cc_map(&self) -> &CcMap {
        &self.cc_map
    }

    /// Change the output device settings used by the next
    /// [`start_audio`](Self::start_audio).
    pub fn set_stream_config(&mut self, stream: StreamConfig) {
        self.config.stream = stream;
    }

    /// The running output, if any.
    pub fn output(&self) -> Option<&SynthOutput> {
        self.output.as_ref()
    }

    /// The open MIDI input, if any.
    pub fn midi(&self) -> Option<&MidiConnection> {
        self.midi.as_ref()
    }

    /// Looper transport of the running stream.
    pub fn recorder(&mut self) -> Option<&mut RecorderHandle> {
        self.recorder.as_mut()
    }

    /// Oscilloscope of the running stream.
    pub fn scope(&self) -> Option<&ScopeReader> {
        self.scope.as_ref()
    }

    /// Stop the scheduler, let `f` rewire it, and start it again.
    fn rewire(&mut self, f: impl FnOnce(&mut SchedulerCore)) -> Result<()> {
        let mut core = match self.scheduler.take().and_then(MidiScheduler::shutdown) {
            Some(core) => core,
            None => {
                tracing::warn!("scheduler state lost, starting from idle queues");
                idle_core(self.config.channel)
            }
        };
        f(&mut core);
        self.scheduler = Some(MidiScheduler::spawn(core, self.config.scheduler_period)?);
        Ok(())
    }

    /// Open the configured output and start a fresh engine on it. A running
    /// stream is replaced only once the new one is playing.
    pub fn start_audio(&mut self) -> Result<()> {
        let target = resolve_output(&self.config.stream)?;
        let mut engine = Engine::with_params(
            EngineConfig {
                sample_rate: target.sample_rate() as f32,
                voices: self.config.voices,
                recorder_seconds: self.config.recorder_seconds,
                seed: self.config.seed,
            },
            Arc::clone(&self.params),
        );
        engine.set_cc_map(self.cc_map.clone());
        let recorder = engine.take_recorder_handle();
        let (writer, reader) = scope(SCOPE_FRAMES);
        let (audio, commands) = audio_queues(QUEUE_CAPACITY);
        let processor = SynthProcessor::new(engine, audio, self.clock).with_scope(writer);

        let output = target.start(processor)?;

        if let Some(old) = self.output.take() {
            old.stop();
        }
        self.output = Some(output);
        self.recorder = recorder;
        self.scope = Some(reader);
        self.rewire(|core| core.rewire_audio(commands))
    }

    /// Stop the audio stream, if running.
    pub fn stop_audio(&mut self) {
        if let Some(output) = self.output.take() {
            output.stop();
        }
        self.recorder = None;
        self.scope = None;
    }

    /// Listen to the MIDI port matching `name_or_index`. The previous port
    /// is closed only once the new one is open.
    pub fn set_midi_input(&mut self, name_or_index: &str) -> Result<()> {
        let (events_tx, events_rx) = event_queue(QUEUE_CAPACITY);
        let connection = connect_midi(name_or_index, events_tx, self.clock)?;
        if let Some(old) = self.midi.replace(connection) {
            old.close();
        }
        // Events from the old port that were not yet dispatched are dropped.
        self.rewire(|core| core.rewire_events(events_rx))
    }

    /// Close the MIDI input, if open.
    pub fn close_midi(&mut self) {
        if let Some(midi) = self.midi.take() {
            midi.close();
        }
    }

    /// Change the MIDI channel filter.
    pub fn set_channel(&mut self, channel: ChannelFilter) -> Result<()> {
        self.config.channel = channel;
        self.rewire(|core| core.set_channel(channel))
    }

    /// Tear down in order: audio stream, MIDI port, scheduler thread.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.stop_audio();
        self.close_midi();
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.shutdown();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}
