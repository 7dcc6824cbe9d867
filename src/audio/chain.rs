//! Effect chain run once per audio block.
//!
//! Effects are black boxes behind [`Effect`]. The chain owns the order, the
//! enable gating, bypass and master volume; each effect only ever sees the
//! flat bytes of its own layout.

use crate::fx::{FxId, FX_COUNT};
use crate::preset::SharedPreset;
use crate::system::SystemState;

use super::ParamQueue;

/// Samples per block.
pub const BLOCK_SIZE: usize = 256;

/// One DSP effect.
pub trait Effect {
    /// Apply a flat parameter block (`enable | knobs | dropdowns`).
    fn update_param(&mut self, params: &[u8]);

    /// Process a block in place.
    fn process_block(&mut self, block: &mut [f32]);

    /// Clear internal state (delay lines, envelopes).
    fn reset(&mut self) {}
}

/// Effect slots plus the state they read.
pub struct EffectChain<'a> {
    slots: [Option<&'a mut dyn Effect>; FX_COUNT],
    preset: &'a SharedPreset,
    system: &'a SystemState,
    queue: &'a ParamQueue,
    /// Gain applied at the end of the previous block, for ramping.
    gain: f32,
    updates_applied: u32,
}

impl<'a> EffectChain<'a> {
    pub fn new(preset: &'a SharedPreset, system: &'a SystemState, queue: &'a ParamQueue) -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            preset,
            system,
            queue,
            gain: volume_gain(preset.master_volume()),
            updates_applied: 0,
        }
    }

    /// Put `effect` in the slot for `fx`. It is brought up to date with the live preset.
    pub fn install(&mut self, fx: FxId, effect: &'a mut dyn Effect) {
        let flat = self.preset.params(fx).to_flat(fx.layout());
        effect.update_param(flat.as_slice());
        self.slots[fx.index()] = Some(effect);
    }

    pub fn is_installed(&self, fx: FxId) -> bool {
        self.slots[fx.index()].is_some()
    }

    /// Parameter updates delivered to effects since creation.
    pub fn updates_applied(&self) -> u32 {
        self.updates_applied
    }

    /// Deliver every queued parameter update.
    pub fn drain_updates(&mut self) -> usize {
        let mut count = 0;
        while let Some(update) = self.queue.dequeue() {
            if let Some(effect) = self.slots[update.fx.index()].as_mut() {
                effect.update_param(update.flat.as_slice());
            }
            count += 1;
        }
        self.updates_applied = self.updates_applied.wrapping_add(count as u32);
        count
    }

    /// Process one block. `input` and `output` are truncated to the shorter of the two.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        self.drain_updates();

        let n = input.len().min(output.len());
        let (input, output) = (&input[..n], &mut output[..n]);
        output.copy_from_slice(input);

        if self.system.is_bypassed() {
            return;
        }

        for fx in FxId::ALL {
            if !self.preset.is_enabled(fx) {
                continue;
            }
            if let Some(effect) = self.slots[fx.index()].as_mut() {
                effect.process_block(output);
            }
        }

        self.apply_gain(output);
    }

    /// Linear ramp from last block's gain to the current one.
    fn apply_gain(&mut self, block: &mut [f32]) {
        let target = volume_gain(self.preset.master_volume());
        if block.is_empty() {
            self.gain = target;
            return;
        }
        let step = (target - self.gain) / block.len() as f32;
        let mut gain = self.gain;
        for sample in block.iter_mut() {
            gain += step;
            *sample *= gain;
        }
        self.gain = target;
    }

    /// Reset every installed effect.
    pub fn reset(&mut self) {
        for effect in self.slots.iter_mut().flatten() {
            effect.reset();
        }
        self.gain = volume_gain(self.preset.master_volume());
    }
}

#[inline]
fn volume_gain(volume: u8) -> f32 {
    f32::from(volume.min(100)) / 100.0
}
