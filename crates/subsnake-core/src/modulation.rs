//! Per-sample modulation inputs.
//!
//! Every modulatable parameter takes the same shape of input: a control
//! buffer holding one value per sample, plus a depth that scales it. An
//! unassigned parameter gets [`ZERO_BLOCK`] so the render loops never branch
//! on "is this modulated?".
//!
//! ```rust
//! use subsnake_core::ModInput;
//!
//! let lfo = [0.5f32; 64];
//! let input = ModInput::new(&lfo, 0.5);
//! assert_eq!(input.at(3), 0.25);
//! assert_eq!(ModInput::none().at(3), 0.0);
//! ```

/// Largest block any render call processes at once.
///
/// Hosts with larger callbacks are rendered in chunks of this size.
pub const MAX_BLOCK: usize = 2048;

/// A silent control buffer used for unassigned modulation slots.
pub static ZERO_BLOCK: [f32; MAX_BLOCK] = [0.0; MAX_BLOCK];

/// A control buffer paired with the depth it is applied at.
#[derive(Debug, Clone, Copy)]
pub struct ModInput<'a> {
    buffer: &'a [f32],
    depth: f32,
}

impl Default for ModInput<'_> {
    fn default() -> Self {
        Self::none()
    }
}

impl<'a> ModInput<'a> {
    /// Pair a control buffer with a depth.
    pub fn new(buffer: &'a [f32], depth: f32) -> Self {
        Self { buffer, depth }
    }

    /// The "no modulation" input: zero buffer, zero depth.
    pub fn none() -> ModInput<'static> {
        ModInput {
            buffer: &ZERO_BLOCK,
            depth: 0.0,
        }
    }

    /// Scaled modulation value at sample `n`.
    ///
    /// Samples past the end of the buffer read as zero.
    #[inline]
    pub fn at(&self, n: usize) -> f32 {
        self.buffer.get(n).copied().unwrap_or(0.0) * self.depth
    }

    /// Modulation depth.
    pub fn depth(&self) -> f32 {
        self.depth
    }
}
