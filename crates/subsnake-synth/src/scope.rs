//! Oscilloscope tap: the last output block, shared with a display.
//!
//! The only lock on the audio path. The writer uses `try_lock` and skips the
//! update when a reader holds the buffer.

use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug)]
struct ScopeBuffer {
    frames: Vec<[f32; 2]>,
    len: usize,
    generation: u64,
}

/// Create a scope holding up to `capacity` frames.
pub fn scope(capacity: usize) -> (ScopeWriter, ScopeReader) {
    let shared = Arc::new(Mutex::new(ScopeBuffer {
        frames: vec![[0.0; 2]; capacity],
        len: 0,
        generation: 0,
    }));
    (
        ScopeWriter {
            shared: Arc::clone(&shared),
        },
        ScopeReader { shared },
    )
}

/// Audio-thread side.
#[derive(Debug)]
pub struct ScopeWriter {
    shared: Arc<Mutex<ScopeBuffer>>,
}

impl ScopeWriter {
    /// Publish `block`, truncated to capacity. Returns `false` if skipped.
    pub fn write(&self, block: &[[f32; 2]]) -> bool {
        let Some(mut buf) = self.shared.try_lock() else {
            return false;
        };
        let n = block.len().min(buf.frames.len());
        buf.frames[..n].copy_from_slice(&block[..n]);
        buf.len = n;
        buf.generation = buf.generation.wrapping_add(1);
        true
    }
}

/// Display side.
#[derive(Debug, Clone)]
pub struct ScopeReader {
    shared: Arc<Mutex<ScopeBuffer>>,
}

impl ScopeReader {
    /// Copy the latest block into `out`; returns its generation counter.
    pub fn snapshot(&self, out: &mut Vec<[f32; 2]>) -> u64 {
        let buf = self.shared.lock();
        out.clear();
        out.extend_from_slice(&buf.frames[..buf.len]);
        buf.generation
    }

    /// Peak absolute sample of the latest block.
    pub fn peak(&self) -> f32 {
        let buf = self.shared.lock();
        buf.frames[..buf.len]
            .iter()
            .fold(0.0f32, |m, f| m.max(f[0].abs()).max(f[1].abs()))
    }
}
