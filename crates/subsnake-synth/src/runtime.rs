//! The audio-callback side of the synth.
//!
//! [`SynthProcessor`] owns the [`Engine`] once a stream is running. Every
//! callback it reports its block window to the scheduler, applies the
//! commands scheduled for this block, renders, and publishes the block to
//! the scope. No locks are taken apart from the scope's `try_lock`.

use subsnake_core::MAX_BLOCK;

use crate::engine::Engine;
use crate::scheduler::{AudioQueues, BlockWindow, SchedulerClock};
use crate::scope::ScopeWriter;

/// Engine plus the audio ends of the scheduler queues.
#[derive(Debug)]
pub struct SynthProcessor {
    engine: Engine,
    queues: AudioQueues,
    clock: SchedulerClock,
    scope: Option<ScopeWriter>,
    scratch: Vec<[f32; 2]>,
}

impl SynthProcessor {
    /// Wrap `engine`. `clock` must be the clock MIDI events are stamped with.
    pub fn new(engine: Engine, queues: AudioQueues, clock: SchedulerClock) -> Self {
        Self {
            engine,
            queues,
            clock,
            scope: None,
            scratch: vec![[0.0; 2]; MAX_BLOCK],
        }
    }

    /// Publish every block to `scope`.
    pub fn with_scope(mut self, scope: ScopeWriter) -> Self {
        self.scope = Some(scope);
        self
    }

    /// The engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The engine, mutably.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Release the engine.
    pub fn into_engine(self) -> Engine {
        self.engine
    }

    /// Fill an interleaved buffer of `channels` channels. `latency` is the
    /// time in seconds between this call and the first frame being heard.
    pub fn process_interleaved(&mut self, data: &mut [f32], channels: usize, latency: f64) {
        let channels = channels.max(1);
        let frames = data.len() / channels;
        let window = BlockWindow::new(self.clock.now(), frames, self.engine.sample_rate(), latency);
        // Full queue: the scheduler keeps resolving against the older window.
        let _ = self.queues.windows.push(window);

        while let Ok(command) = self.queues.commands.pop() {
            self.engine.handle(command);
        }

        self.engine.render_interleaved(data, channels, &mut self.scratch);

        if let Some(scope) = &self.scope {
            let shown = frames.min(self.scratch.len());
            for (frame, s) in data.chunks_exact(channels).zip(self.scratch[..shown].iter_mut()) {
                s[0] = frame[0];
                s[1] = if channels > 1 { frame[1] } else { frame[0] };
            }
            scope.write(&self.scratch[..shown]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::scheduler::{ChannelFilter, MidiEvent, SchedulerCore, audio_queues, event_queue};
    use crate::scope::scope;

    fn engine() -> Engine {
        Engine::new(EngineConfig {
            voices: 4,
            recorder_seconds: 0.1,
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_reports_window_and_applies_commands() {
        let clock = SchedulerClock::new();
        let (audio, sched) = audio_queues(16);
        let (mut events, events_rx) = event_queue(16);
        let mut core = SchedulerCore::new(events_rx, sched, ChannelFilter::Omni);
        let mut processor = SynthProcessor::new(engine(), audio, clock);

        let mut data = vec![0.0f32; 256 * 2];
        processor.process_interleaved(&mut data, 2, 0.0);
        assert!(data.iter().all(|&s| s == 0.0));

        // An event stamped inside the reported window.
        let start = core_window_start(&mut core);
        events.push(MidiEvent::new(&[0x90, 60, 127], start)).unwrap();
        assert_eq!(core.tick(), 1);

        processor.process_interleaved(&mut data, 2, 0.0);
        assert_eq!(processor.engine().active_voices(), 1);
        assert!(data.iter().any(|&s| s != 0.0));
    }

    fn core_window_start(core: &mut SchedulerCore) -> f64 {
        core.tick();
        core.window().map(|w| w.frame_start).unwrap_or_default()
    }

    #[test]
    fn test_scope_receives_block() {
        let (audio, _sched) = audio_queues(16);
        let (writer, reader) = scope(1024);
        let mut processor = SynthProcessor::new(engine(), audio, SchedulerClock::new()).with_scope(writer);
        processor.engine_mut().note_on(69, 127, 0);
        let mut data = vec![0.0f32; 128];
        processor.process_interleaved(&mut data, 1, 0.0);
        let mut shown = Vec::new();
        assert_eq!(reader.snapshot(&mut shown), 1);
        assert_eq!(shown.len(), 128);
        assert_eq!(shown[5][0], data[5]);
        assert_eq!(shown[5][1], data[5]);
    }
}
