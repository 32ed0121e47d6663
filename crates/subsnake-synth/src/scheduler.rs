//! MIDI event scheduling.
//!
//! Three threads meet here, joined by SPSC queues:
//!
//! ```text
//! MIDI callback ──MidiEvent──►            ┌──VoiceCommand──► audio callback
//!                              scheduler ─┤
//! audio callback ─BlockWindow─►           └ (resolves sample offsets)
//! ```
//!
//! The MIDI callback only stamps messages with a [`SchedulerClock`] and
//! pushes them. The audio callback reports the time span its block covers.
//! The scheduler thread wakes every few milliseconds, matches the oldest
//! event against the latest window, and hands the audio thread a command
//! carrying the exact frame offset inside the next block. Events that lie
//! past the window wait for a later tick; nothing is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rtrb::{Consumer, Producer, RingBuffer};

use crate::cc::ALL_NOTES_OFF;

/// Default wake period of the scheduler thread (128 frames at 44.1 kHz).
pub const DEFAULT_PERIOD: Duration = Duration::from_micros(2902);
/// Shortest allowed wake period.
pub const MIN_PERIOD: Duration = Duration::from_micros(1500);
/// Default capacity of every scheduler queue.
pub const QUEUE_CAPACITY: usize = 1024;

/// Monotonic clock shared by the MIDI, audio and scheduler threads.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerClock {
    origin: Instant,
}

impl Default for SchedulerClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Seconds since the clock started.
    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A raw MIDI message with its arrival time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiEvent {
    message: [u8; 3],
    len: u8,
    /// Arrival time on the [`SchedulerClock`], in seconds.
    pub timestamp: f64,
}

impl MidiEvent {
    /// Copy up to three bytes of `bytes`.
    pub fn new(bytes: &[u8], timestamp: f64) -> Self {
        let mut message = [0u8; 3];
        let len = bytes.len().min(3);
        message[..len].copy_from_slice(&bytes[..len]);
        Self {
            message,
            len: len as u8,
            timestamp,
        }
    }

    /// The message bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.message[..self.len as usize]
    }
}

/// The span of clock time one audio block covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockWindow {
    /// Clock time of the first frame.
    pub frame_start: f64,
    /// Clock time one past the last frame.
    pub frame_end: f64,
    /// Frames in the block.
    pub frames: usize,
    /// Output latency in seconds.
    pub latency: f64,
}

impl BlockWindow {
    /// Window of `frames` frames starting at `frame_start`.
    pub fn new(frame_start: f64, frames: usize, sample_rate: f32, latency: f64) -> Self {
        let width = frames as f64 / f64::from(sample_rate.max(1.0));
        Self {
            frame_start,
            frame_end: frame_start + width,
            frames,
            latency: latency.max(0.0),
        }
    }
}

/// Outcome of matching an event against a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Deliver at this frame offset.
    Dispatch(usize),
    /// The event belongs to a later block.
    Defer,
}

/// Resolve an event timestamp to a frame offset within `window`.
///
/// ```rust
/// use subsnake_synth::{BlockWindow, Resolution, resolve};
///
/// let window = BlockWindow {
///     frame_start: 1.0,
///     frame_end: 2.0,
///     frames: 100,
///     latency: 0.0,
/// };
/// assert_eq!(resolve(1.25, &window), Resolution::Dispatch(25));
/// assert_eq!(resolve(2.5, &window), Resolution::Defer);
/// ```
pub fn resolve(timestamp: f64, window: &BlockWindow) -> Resolution {
    if timestamp + window.latency >= window.frame_end {
        return Resolution::Defer;
    }
    let width = window.frame_end - window.frame_start;
    if window.frames == 0 || width <= 0.0 {
        return Resolution::Dispatch(0);
    }
    let position = (window.frames as f64 * (timestamp - window.frame_start) / width).round();
    let last = (window.frames - 1) as f64;
    Resolution::Dispatch(position.clamp(0.0, last) as usize)
}

/// What the audio thread is told to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    /// Start a note.
    NoteOn {
        /// MIDI note number.
        note: u8,
        /// MIDI velocity (1..=127).
        velocity: u8,
        /// Frame offset into the next block.
        offset: usize,
    },
    /// Release a note.
    NoteOff {
        /// MIDI note number.
        note: u8,
        /// Frame offset into the next block.
        offset: usize,
    },
    /// Controller change.
    Control {
        /// Controller number.
        controller: u8,
        /// Controller value.
        value: u8,
        /// Frame offset into the next block.
        offset: usize,
    },
    /// Release every held note.
    AllNotesOff {
        /// Frame offset into the next block.
        offset: usize,
    },
}

/// Which MIDI channels are listened to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelFilter {
    /// Every channel.
    #[default]
    Omni,
    /// One channel, zero-based (0..=15).
    Channel(u8),
}

impl ChannelFilter {
    /// Whether messages on `channel` pass.
    pub fn accepts(self, channel: u8) -> bool {
        match self {
            ChannelFilter::Omni => true,
            ChannelFilter::Channel(c) => c == channel,
        }
    }
}

/// Turn a channel-voice message into a command. Anything else is `None`.
pub fn decode(bytes: &[u8], offset: usize, filter: ChannelFilter) -> Option<VoiceCommand> {
    let (&status, data) = bytes.split_first()?;
    if !filter.accepts(status & 0x0F) {
        return None;
    }
    let a = data.first().copied()? & 0x7F;
    let b = data.get(1).copied().unwrap_or(0) & 0x7F;
    match status & 0xF0 {
        0x90 if b > 0 => Some(VoiceCommand::NoteOn {
            note: a,
            velocity: b,
            offset,
        }),
        0x80 | 0x90 => Some(VoiceCommand::NoteOff { note: a, offset }),
        0xB0 if a == ALL_NOTES_OFF => Some(VoiceCommand::AllNotesOff { offset }),
        0xB0 => Some(VoiceCommand::Control {
            controller: a,
            value: b,
            offset,
        }),
        _ => None,
    }
}

/// Audio-thread ends of the window and command queues.
#[derive(Debug)]
pub struct AudioQueues {
    /// Where the audio callback reports its block windows.
    pub windows: Producer<BlockWindow>,
    /// Where the audio callback collects scheduled commands.
    pub commands: Consumer<VoiceCommand>,
}

/// Scheduler ends of the window and command queues.
#[derive(Debug)]
pub struct CommandQueues {
    windows: Consumer<BlockWindow>,
    commands: Producer<VoiceCommand>,
}

/// Create a connected pair of window/command queue ends.
pub fn audio_queues(capacity: usize) -> (AudioQueues, CommandQueues) {
    let (windows_tx, windows_rx) = RingBuffer::new(capacity);
    let (commands_tx, commands_rx) = RingBuffer::new(capacity);
    (
        AudioQueues {
            windows: windows_tx,
            commands: commands_rx,
        },
        CommandQueues {
            windows: windows_rx,
            commands: commands_tx,
        },
    )
}

/// Create the MIDI event queue.
pub fn event_queue(capacity: usize) -> (Producer<MidiEvent>, Consumer<MidiEvent>) {
    RingBuffer::new(capacity)
}

/// Scheduler state, independent of the thread that drives it.
#[derive(Debug)]
pub struct SchedulerCore {
    events: Consumer<MidiEvent>,
    audio: CommandQueues,
    window: Option<BlockWindow>,
    pending: Option<MidiEvent>,
    channel: ChannelFilter,
}

impl SchedulerCore {
    /// Build a scheduler over its queue ends.
    pub fn new(events: Consumer<MidiEvent>, audio: CommandQueues, channel: ChannelFilter) -> Self {
        Self {
            events,
            audio,
            window: None,
            pending: None,
            channel,
        }
    }

    /// The channel filter.
    pub fn channel(&self) -> ChannelFilter {
        self.channel
    }

    /// Change the channel filter.
    pub fn set_channel(&mut self, channel: ChannelFilter) {
        self.channel = channel;
    }

    /// The event waiting for a later window, if any.
    pub fn pending(&self) -> Option<&MidiEvent> {
        self.pending.as_ref()
    }

    /// Latest window reported by the audio thread.
    pub fn window(&self) -> Option<&BlockWindow> {
        self.window.as_ref()
    }

    /// Attach a new audio stream. The old window is forgotten.
    pub fn rewire_audio(&mut self, audio: CommandQueues) {
        self.audio = audio;
        self.window = None;
    }

    /// Attach a new MIDI source. An event pending from the old one is dropped,
    /// along with anything left in the old queue. This is the one place the
    /// scheduler discards input; in steady state every event is deferred
    /// until a window covers it.
    pub fn rewire_events(&mut self, events: Consumer<MidiEvent>) {
        self.events = events;
        self.pending = None;
    }

    /// Dispatch every event that falls inside the latest window.
    /// Returns the number of commands sent.
    pub fn tick(&mut self) -> usize {
        while let Ok(window) = self.audio.windows.pop() {
            self.window = Some(window);
        }
        let Some(window) = self.window else {
            return 0;
        };

        let mut sent = 0;
        loop {
            let event = match self.pending.take() {
                Some(event) => event,
                None => match self.events.pop() {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };
            let offset = match resolve(event.timestamp, &window) {
                Resolution::Dispatch(offset) => offset,
                Resolution::Defer => {
                    self.pending = Some(event);
                    break;
                }
            };
            let Some(command) = decode(event.bytes(), offset, self.channel) else {
                continue;
            };
            if self.audio.commands.push(command).is_err() {
                self.pending = Some(event);
                break;
            }
            sent += 1;
        }
        sent
    }
}

/// The scheduler thread.
#[derive(Debug)]
pub struct MidiScheduler {
    run: Arc<AtomicBool>,
    thread: Option<JoinHandle<SchedulerCore>>,
}

impl MidiScheduler {
    /// Start a thread ticking `core` every `period`, clamped to
    /// [`MIN_PERIOD`]..=[`DEFAULT_PERIOD`].
    pub fn spawn(mut core: SchedulerCore, period: Duration) -> std::io::Result<Self> {
        let period = period.clamp(MIN_PERIOD, DEFAULT_PERIOD);
        let run = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&run);
        let thread = thread::Builder::new()
            .name("subsnake-scheduler".into())
            .spawn(move || {
                tracing::debug!(period_us = period.as_micros() as u64, "scheduler started");
                while flag.load(Ordering::Acquire) {
                    core.tick();
                    thread::sleep(period);
                }
                tracing::debug!("scheduler stopped");
                core
            })?;
        Ok(Self {
            run,
            thread: Some(thread),
        })
    }

    /// The shared run flag. Clearing it stops the loop at its next wake.
    pub fn run_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.run)
    }

    /// Whether the thread has been asked to keep running.
    pub fn is_running(&self) -> bool {
        self.run.load(Ordering::Acquire)
    }

    /// Stop the thread, join it and return its state.
    pub fn shutdown(mut self) -> Option<SchedulerCore> {
        self.join()
    }

    fn join(&mut self) -> Option<SchedulerCore> {
        self.run.store(false, Ordering::Release);
        let handle = self.thread.take()?;
        match handle.join() {
            Ok(core) => Some(core),
            Err(_) => {
                tracing::warn!("scheduler thread panicked");
                None
            }
        }
    }
}

impl Drop for MidiScheduler {
    fn drop(&mut self) {
        self.join();
    }
}
