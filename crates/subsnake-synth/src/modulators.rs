//! Block-rate modulator bank: two LFOs and two modulation envelopes.
//!
//! Each voice owns one bank; the engine owns another for the delay. Sources
//! are rendered in the order LFO 1, LFO 2, mod env 1, mod env 2. A source
//! whose own parameters are modulated reads the buffers as they stand at
//! that moment, so sources earlier in the order are current and the source
//! itself and later ones lag one block.

use subsnake_core::{Lfo, LfoModulation, MAX_BLOCK, ModEnv, ModEnvModulation, ModInput};

use crate::routing::{ModRouting, ModSource, ModTarget};

/// The four most recent source blocks.
#[derive(Debug, Clone)]
pub struct ModSources {
    buffers: [Vec<f32>; 4],
}

impl ModSources {
    fn new() -> Self {
        Self {
            buffers: std::array::from_fn(|_| vec![0.0; MAX_BLOCK]),
        }
    }

    /// The last block of `source`. Unassigned reads as silence.
    pub fn buffer(&self, source: ModSource) -> &[f32] {
        match source.slot() {
            Some(k) => &self.buffers[k],
            None => &subsnake_core::ZERO_BLOCK,
        }
    }

    /// Resolve the route of `target` into a per-sample input.
    #[inline]
    pub fn input(&self, routing: &ModRouting, target: ModTarget) -> ModInput<'_> {
        let route = routing.get(target);
        match route.source.slot() {
            Some(k) if route.depth != 0.0 => ModInput::new(&self.buffers[k], route.depth),
            _ => ModInput::none(),
        }
    }
}

/// Two LFOs and two modulation envelopes rendered a block at a time.
#[derive(Debug, Clone)]
pub struct ModulatorBank {
    lfos: [Lfo; 2],
    envs: [ModEnv; 2],
    sources: ModSources,
    scratch: Vec<f32>,
}

impl ModulatorBank {
    /// Create a bank; `seed` feeds the sample-and-hold generators.
    pub fn new(sample_rate: f32, seed: u32) -> Self {
        Self {
            lfos: [
                Lfo::with_seed(sample_rate, 1.0, seed),
                Lfo::with_seed(sample_rate, 2.67, seed.rotate_left(16) ^ 0x5A5A),
            ],
            envs: [ModEnv::new(sample_rate), ModEnv::new(sample_rate)],
            sources: ModSources::new(),
            scratch: vec![0.0; MAX_BLOCK],
        }
    }

    /// LFO `index` (0 or 1).
    pub fn lfo_mut(&mut self, index: usize) -> &mut Lfo {
        &mut self.lfos[index]
    }

    /// Modulation envelope `index` (0 or 1).
    pub fn env_mut(&mut self, index: usize) -> &mut ModEnv {
        &mut self.envs[index]
    }

    /// Rendered source buffers.
    pub fn sources(&self) -> &ModSources {
        &self.sources
    }

    /// Whether the envelopes are gated.
    pub fn gated(&self) -> bool {
        self.envs[0].gate()
    }

    /// Open both envelope gates at `offset`.
    pub fn gate_on(&mut self, offset: usize) {
        for env in &mut self.envs {
            env.gate_on(offset);
        }
    }

    /// Close both envelope gates at `offset`.
    pub fn gate_off(&mut self, offset: usize) {
        for env in &mut self.envs {
            env.gate_off(offset);
        }
    }

    /// Silence the envelopes, restart the LFOs, zero the buffers.
    pub fn reset(&mut self) {
        for lfo in &mut self.lfos {
            lfo.reset();
        }
        for env in &mut self.envs {
            env.reset();
        }
        for buffer in &mut self.sources.buffers {
            buffer.fill(0.0);
        }
    }

    /// Render `frames` samples of every source.
    pub fn render(&mut self, frames: usize, routing: &ModRouting) {
        let frames = frames.min(MAX_BLOCK);
        for slot in 0..4 {
            let out = &mut self.scratch[..frames];
            match slot {
                0 | 1 => {
                    let (frequency, phase) = if slot == 0 {
                        (ModTarget::Lfo1Freq, ModTarget::Lfo1Phase)
                    } else {
                        (ModTarget::Lfo2Freq, ModTarget::Lfo2Phase)
                    };
                    let mods = LfoModulation {
                        frequency: self.sources.input(routing, frequency),
                        phase: self.sources.input(routing, phase),
                    };
                    self.lfos[slot].render(out, &mods);
                }
                _ => {
                    let (attack, release) = if slot == 2 {
                        (ModTarget::Menv1Att, ModTarget::Menv1Rel)
                    } else {
                        (ModTarget::Menv2Att, ModTarget::Menv2Rel)
                    };
                    let mods = ModEnvModulation {
                        attack: self.sources.input(routing, attack),
                        release: self.sources.input(routing, release),
                    };
                    self.envs[slot - 2].render(out, &mods);
                }
            }
            std::mem::swap(&mut self.sources.buffers[slot], &mut self.scratch);
        }
    }
}
