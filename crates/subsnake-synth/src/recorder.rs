//! Looping recorder on the mix bus.
//!
//! The [`Recorder`] lives on the audio thread; the [`RecorderHandle`] is the
//! transport on the control side. They share a set of atomic flags, and the
//! recorder reports an automatic stop over an SPSC queue.
//!
//! Recording overdubs: input is summed into the buffer at the play head
//! while the previous contents play back, and the output is the input plus
//! the playback. While recording past the current end, the end head grows
//! by one block per block. Reaching the end of the loop (or of the buffer)
//! without looping stops the transport and emits [`RecorderEvent::Stopped`].
//!
//! [`RecorderHandle::stop`] only requests a rewind; the audio thread applies
//! it at the start of its next block so the play heads are never written
//! from two threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rtrb::{Consumer, Producer, RingBuffer};

/// Default recording length in seconds.
pub const DEFAULT_RECORD_SECONDS: f32 = 300.0;

/// Notification sent from the audio thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderEvent {
    /// The transport stopped by itself at the end of the loop.
    Stopped,
}

#[derive(Debug)]
struct Shared {
    record: AtomicBool,
    paused: AtomicBool,
    stopped: AtomicBool,
    looping: AtomicBool,
    rewind: AtomicBool,
    position: AtomicUsize,
    length: AtomicUsize,
}

/// Create a recorder with room for `capacity` stereo frames.
pub fn recorder(capacity: usize) -> (Recorder, RecorderHandle) {
    let shared = Arc::new(Shared {
        record: AtomicBool::new(false),
        paused: AtomicBool::new(false),
        stopped: AtomicBool::new(true),
        looping: AtomicBool::new(false),
        rewind: AtomicBool::new(false),
        position: AtomicUsize::new(0),
        length: AtomicUsize::new(0),
    });
    let (events_tx, events_rx) = RingBuffer::new(16);
    (
        Recorder {
            buffer: vec![[0.0; 2]; capacity.max(1)],
            play_heads: [0; 2],
            end_heads: [0; 2],
            shared: Arc::clone(&shared),
            events: events_tx,
        },
        RecorderHandle {
            shared,
            events: events_rx,
        },
    )
}

/// Audio-thread side of the looper.
#[derive(Debug)]
pub struct Recorder {
    buffer: Vec<[f32; 2]>,
    play_heads: [usize; 2],
    end_heads: [usize; 2],
    shared: Arc<Shared>,
    events: Producer<RecorderEvent>,
}

impl Recorder {
    /// Capacity in frames.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Play head of each channel.
    pub fn play_heads(&self) -> [usize; 2] {
        self.play_heads
    }

    /// End head of each channel.
    pub fn end_heads(&self) -> [usize; 2] {
        self.end_heads
    }

    /// The recorded frames.
    pub fn recorded(&self) -> &[[f32; 2]] {
        &self.buffer[..self.end_heads[0].min(self.buffer.len())]
    }

    fn halt(&mut self) {
        self.shared.stopped.store(true, Ordering::Relaxed);
        self.shared.record.store(false, Ordering::Relaxed);
        let _ = self.events.push(RecorderEvent::Stopped);
    }

    /// Mix the loop into `buffer` and overdub it when recording.
    pub fn process(&mut self, buffer: &mut [[f32; 2]]) {
        if self.shared.rewind.swap(false, Ordering::Relaxed) {
            self.play_heads = [0; 2];
        }
        if self.shared.stopped.load(Ordering::Relaxed) || self.shared.paused.load(Ordering::Relaxed) {
            self.publish();
            return;
        }

        let frames = buffer.len();
        let capacity = self.buffer.len();
        let looping = self.shared.looping.load(Ordering::Relaxed);

        if self.shared.record.load(Ordering::Relaxed) {
            if self.end_heads[0] + frames < capacity {
                if self.play_heads[0] + frames >= self.end_heads[0] && !looping {
                    for end in &mut self.end_heads {
                        *end += frames;
                    }
                }
            } else {
                if !looping {
                    self.halt();
                }
                self.play_heads = [0; 2];
            }
        }

        let record = self.shared.record.load(Ordering::Relaxed);
        for frame in buffer.iter_mut() {
            if self.shared.stopped.load(Ordering::Relaxed) {
                break;
            }
            let mut wrapped = false;
            for ch in 0..2 {
                let head = self.play_heads[ch].min(capacity - 1);
                let playback = self.buffer[head][ch];
                if record {
                    self.buffer[head][ch] += frame[ch];
                }
                if self.play_heads[ch] < self.end_heads[ch] {
                    self.play_heads[ch] += 1;
                } else {
                    wrapped = true;
                }
                frame[ch] += playback;
            }
            if wrapped {
                self.play_heads = [0; 2];
                if !looping {
                    self.halt();
                }
            }
        }
        self.publish();
    }

    fn publish(&self) {
        self.shared.position.store(self.play_heads[0], Ordering::Relaxed);
        self.shared.length.store(self.end_heads[0], Ordering::Relaxed);
    }
}

/// Control-side transport for the looper.
#[derive(Debug)]
pub struct RecorderHandle {
    shared: Arc<Shared>,
    events: Consumer<RecorderEvent>,
}

impl RecorderHandle {
    /// Start or resume playback.
    pub fn play(&self) {
        self.shared.paused.store(false, Ordering::Relaxed);
        self.shared.stopped.store(false, Ordering::Relaxed);
    }

    /// Hold the play heads where they are.
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Relaxed);
    }

    /// Stop and rewind to the start of the loop.
    pub fn stop(&self) {
        self.shared.paused.store(false, Ordering::Relaxed);
        self.shared.stopped.store(true, Ordering::Relaxed);
        self.shared.rewind.store(true, Ordering::Relaxed);
    }

    /// Arm or disarm recording.
    pub fn set_record(&self, record: bool) {
        self.shared.record.store(record, Ordering::Relaxed);
    }

    /// Loop at the end instead of stopping.
    pub fn set_loop(&self, looping: bool) {
        self.shared.looping.store(looping, Ordering::Relaxed);
    }

    /// Whether recording is armed.
    pub fn is_recording(&self) -> bool {
        self.shared.record.load(Ordering::Relaxed)
    }

    /// Whether the transport is stopped.
    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::Relaxed)
    }

    /// Whether the transport is paused.
    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Relaxed)
    }

    /// Play position in frames, as of the last block.
    pub fn position(&self) -> usize {
        self.shared.position.load(Ordering::Relaxed)
    }

    /// Loop length in frames, as of the last block.
    pub fn length(&self) -> usize {
        self.shared.length.load(Ordering::Relaxed)
    }

    /// `"mm:ss / mm:ss"` readout of position and length.
    pub fn readout(&self, sample_rate: f32) -> String {
        format!(
            "{} / {}",
            format_time(self.position(), sample_rate),
            format_time(self.length(), sample_rate)
        )
    }

    /// Next pending event, if any.
    pub fn poll_event(&mut self) -> Option<RecorderEvent> {
        self.events.pop().ok()
    }
}

/// Format a frame count as `mm:ss`.
pub fn format_time(frames: usize, sample_rate: f32) -> String {
    let seconds = if sample_rate > 0.0 { (frames as f64 / f64::from(sample_rate)) as u64 } else { 0 };
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(rec: &mut Recorder, blocks: usize, value: f32) -> Vec<[f32; 2]> {
        let mut out = Vec::new();
        for _ in 0..blocks {
            let mut block = [[value; 2]; 64];
            rec.process(&mut block);
            out.extend_from_slice(&block);
        }
        out
    }

    #[test]
    fn test_stopped_passes_through() {
        let (mut rec, _handle) = recorder(1000);
        let out = run(&mut rec, 2, 0.25);
        assert!(out.iter().all(|f| f[0] == 0.25 && f[1] == 0.25));
        assert_eq!(rec.end_heads(), [0, 0]);
    }

    #[test]
    fn test_record_then_stop_sets_heads() {
        let (mut rec, handle) = recorder(10_000);
        handle.set_record(true);
        handle.play();
        run(&mut rec, 5, 0.5);
        handle.stop();
        run(&mut rec, 1, 0.0);
        assert_eq!(rec.end_heads(), [320, 320]);
        assert_eq!(rec.play_heads(), [0, 0]);
        assert!(rec.recorded().iter().all(|f| f[0] == 0.5));
    }

    #[test]
    fn test_playback_adds_to_input() {
        let (mut rec, handle) = recorder(10_000);
        handle.set_record(true);
        handle.play();
        run(&mut rec, 4, 0.5);
        handle.stop();
        handle.set_record(false);
        run(&mut rec, 1, 0.0);
        handle.play();
        let out = run(&mut rec, 2, 0.1);
        assert!((out[10][0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_end_of_loop_stops_and_notifies() {
        let (mut rec, mut handle) = recorder(10_000);
        handle.set_record(true);
        handle.play();
        run(&mut rec, 2, 0.5);
        handle.set_record(false);
        run(&mut rec, 1, 0.0);
        assert!(handle.is_stopped());
        assert_eq!(handle.poll_event(), Some(RecorderEvent::Stopped));
        assert_eq!(handle.poll_event(), None);
    }

    #[test]
    fn test_loop_keeps_running() {
        let (mut rec, mut handle) = recorder(10_000);
        handle.set_record(true);
        handle.play();
        run(&mut rec, 2, 0.5);
        handle.set_record(false);
        handle.set_loop(true);
        run(&mut rec, 6, 0.0);
        assert!(!handle.is_stopped());
        assert_eq!(handle.poll_event(), None);
    }

    #[test]
    fn test_buffer_full_stops_recording() {
        let (mut rec, mut handle) = recorder(200);
        handle.set_record(true);
        handle.play();
        run(&mut rec, 10, 0.5);
        assert!(handle.is_stopped());
        assert!(!handle.is_recording());
        assert!(rec.end_heads()[0] < 200);
        assert_eq!(handle.poll_event(), Some(RecorderEvent::Stopped));
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0, 44100.0), "00:00");
        assert_eq!(format_time(44100 * 75, 44100.0), "01:15");
    }
}
