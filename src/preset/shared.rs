//! Live preset shared between the controller, the UI and the audio domain.
//!
//! Every field is its own atomic. Writers never hold a lock and readers never
//! wait; a reader may observe a multi-field update half applied, which is
//! acceptable for continuous controls. Two orderings are relied upon:
//!
//! - an effect's `enabled` flag is stored last with `Release`, so a reader
//!   that sees the flag with `Acquire` also sees the knobs written before it;
//! - `apply` stores bank/number last, so the UI reacting to a slot change
//!   reads the new effect states.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::fx::{EffectParams, FxId, FX_COUNT, MAX_DROPDOWNS, MAX_KNOBS, PRESET_FX_COUNT};

use super::model::{Preset, PresetName, MAX_NAME_LEN};
use super::PresetError;

const NAME_CAP: usize = MAX_NAME_LEN + 1;

/// One effect slot.
pub struct SharedEffect {
    enabled: AtomicBool,
    knobs: [AtomicU8; MAX_KNOBS],
    dropdowns: [AtomicU8; MAX_DROPDOWNS],
}

impl SharedEffect {
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            knobs: [const { AtomicU8::new(0) }; MAX_KNOBS],
            dropdowns: [const { AtomicU8::new(0) }; MAX_DROPDOWNS],
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    #[inline]
    pub fn knob(&self, index: usize) -> u8 {
        self.knobs.get(index).map_or(0, |k| k.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn dropdown(&self, index: usize) -> u8 {
        self.dropdowns.get(index).map_or(0, |d| d.load(Ordering::Relaxed))
    }

    pub fn load(&self) -> EffectParams {
        let mut params = EffectParams {
            enabled: self.is_enabled(),
            ..Default::default()
        };
        for (dst, src) in params.knobs.iter_mut().zip(&self.knobs) {
            *dst = src.load(Ordering::Relaxed);
        }
        for (dst, src) in params.dropdowns.iter_mut().zip(&self.dropdowns) {
            *dst = src.load(Ordering::Relaxed);
        }
        params
    }

    pub fn store(&self, params: &EffectParams) {
        for (dst, &src) in self.knobs.iter().zip(&params.knobs) {
            dst.store(src, Ordering::Relaxed);
        }
        for (dst, &src) in self.dropdowns.iter().zip(&params.dropdowns) {
            dst.store(src, Ordering::Relaxed);
        }
        self.set_enabled(params.enabled);
    }
}

impl Default for SharedEffect {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide live preset.
pub struct SharedPreset {
    name: [AtomicU8; NAME_CAP],
    bank: AtomicU8,
    number: AtomicU8,
    master_volume: AtomicU8,
    bpm: AtomicU8,
    effects: [SharedEffect; FX_COUNT],
}

impl SharedPreset {
    /// Empty preset at slot 0/0, volume 100, 120 bpm.
    pub const fn new() -> Self {
        Self {
            name: [const { AtomicU8::new(0) }; NAME_CAP],
            bank: AtomicU8::new(0),
            number: AtomicU8::new(0),
            master_volume: AtomicU8::new(100),
            bpm: AtomicU8::new(120),
            effects: [const { SharedEffect::new() }; FX_COUNT],
        }
    }

    #[inline]
    pub fn effect(&self, fx: FxId) -> &SharedEffect {
        &self.effects[fx.index()]
    }

    #[inline]
    pub fn is_enabled(&self, fx: FxId) -> bool {
        self.effect(fx).is_enabled()
    }

    pub fn params(&self, fx: FxId) -> EffectParams {
        self.effect(fx).load()
    }

    pub fn set_params(&self, fx: FxId, params: &EffectParams) {
        self.effect(fx).store(params);
    }

    #[inline]
    pub fn master_volume(&self) -> u8 {
        self.master_volume.load(Ordering::Relaxed)
    }

    /// Clamped to 100.
    #[inline]
    pub fn set_master_volume(&self, volume: u8) {
        self.master_volume.store(volume.min(100), Ordering::Relaxed);
    }

    #[inline]
    pub fn bpm(&self) -> u8 {
        self.bpm.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_bpm(&self, bpm: u8) {
        self.bpm.store(bpm, Ordering::Relaxed);
    }

    /// `(bank, number)` as last stored.
    #[inline]
    pub fn slot(&self) -> (u8, u8) {
        (self.bank.load(Ordering::Acquire), self.number.load(Ordering::Acquire))
    }

    pub fn name(&self) -> PresetName {
        let mut bytes = [0u8; NAME_CAP];
        for (dst, src) in bytes.iter_mut().zip(&self.name) {
            *dst = src.load(Ordering::Relaxed);
        }
        PresetName::from_bytes(&bytes)
    }

    pub fn set_name(&self, name: &PresetName) {
        let src = name.as_bytes();
        for (i, dst) in self.name.iter().enumerate() {
            dst.store(src.get(i).copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Replace the whole live state with a validated preset.
    ///
    /// `GNRC` is not part of a preset and keeps its live value.
    pub fn apply(&self, preset: &Preset) -> Result<(), PresetError> {
        preset.validate()?;
        for (fx, params) in FxId::ALL.iter().zip(&preset.effects) {
            self.set_params(*fx, &params.normalized(fx.layout()));
        }
        self.set_name(&preset.name);
        self.set_master_volume(preset.master_volume);
        self.set_bpm(preset.bpm);
        self.bank.store(preset.bank, Ordering::Release);
        self.number.store(preset.number, Ordering::Release);
        Ok(())
    }

    /// Copy of the persisted part of the live state.
    pub fn snapshot(&self) -> Preset {
        let (bank, number) = self.slot();
        let mut preset = Preset {
            name: self.name(),
            bank,
            number,
            master_volume: self.master_volume(),
            bpm: self.bpm(),
            ..Default::default()
        };
        for (fx, params) in FxId::ALL[..PRESET_FX_COUNT].iter().zip(preset.effects.iter_mut()) {
            *params = self.params(*fx);
        }
        preset
    }
}

impl Default for SharedPreset {
    fn default() -> Self {
        Self::new()
    }
}
