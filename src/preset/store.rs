//! Preset storage.
//!
//! Banks 0 to 4 hold factory content generated on demand; banks 5 and 6 are
//! backed by a [`PresetStore`] that keeps encoded [`PresetBinary`] blobs.

use crate::fx::{EffectParams, FxId};

use super::codec::PresetBinary;
use super::model::{Preset, PresetSlot, FIRST_USER_BANK, PRESETS_PER_BANK};
use super::PresetError;

/// Somewhere presets live between boots.
pub trait PresetStore {
    /// Load the preset at `slot`. An empty user slot yields [`Preset::blank`].
    fn load(&mut self, slot: PresetSlot) -> Result<Preset, PresetError>;

    /// Persist `preset` at its own bank/number. Factory banks are refused.
    fn save(&mut self, preset: &Preset) -> Result<(), PresetError>;
}

/// Check a preset may be written; returns its slot.
pub fn writable_slot(preset: &Preset) -> Result<PresetSlot, PresetError> {
    preset.validate()?;
    let slot = preset.slot()?;
    if !slot.is_user_writable() {
        return Err(PresetError::ReadOnlyBank(slot.bank()));
    }
    Ok(slot)
}

/// Index of a user slot within user storage.
pub fn user_index(slot: PresetSlot) -> Option<usize> {
    slot.is_user_writable().then(|| {
        usize::from(slot.bank() - FIRST_USER_BANK) * usize::from(PRESETS_PER_BANK)
            + usize::from(slot.number())
    })
}

/// Number of user-writable slots.
pub const USER_SLOTS: usize = 10;

/// In-memory store. Used on the host and as the fallback when flash is unavailable.
pub struct RamPresetStore {
    slots: [Option<PresetBinary>; USER_SLOTS],
}

impl RamPresetStore {
    pub const fn new() -> Self {
        Self {
            slots: [None; USER_SLOTS],
        }
    }

    /// Stored blob for a user slot, if any.
    pub fn raw(&self, slot: PresetSlot) -> Option<&PresetBinary> {
        user_index(slot).and_then(|i| self.slots[i].as_ref())
    }

    /// Overwrite a user slot with raw bytes, valid or not.
    pub fn put_raw(&mut self, slot: PresetSlot, blob: PresetBinary) -> Result<(), PresetError> {
        let index = user_index(slot).ok_or(PresetError::ReadOnlyBank(slot.bank()))?;
        self.slots[index] = Some(blob);
        Ok(())
    }
}

impl Default for RamPresetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PresetStore for RamPresetStore {
    fn load(&mut self, slot: PresetSlot) -> Result<Preset, PresetError> {
        let Some(index) = user_index(slot) else {
            return Ok(factory_preset(slot));
        };
        match &self.slots[index] {
            Some(blob) => blob.decode(),
            None => Ok(Preset::blank(slot)),
        }
    }

    fn save(&mut self, preset: &Preset) -> Result<(), PresetError> {
        let slot = writable_slot(preset)?;
        let index = user_index(slot).ok_or(PresetError::ReadOnlyBank(slot.bank()))?;
        self.slots[index] = Some(PresetBinary::encode(preset));
        Ok(())
    }
}

/// Effects switched on in each factory bank.
const CLEAN: &[FxId] = &[FxId::Comp, FxId::Chorus, FxId::Reverb];
const CRUNCH: &[FxId] = &[FxId::Comp, FxId::Overdrive, FxId::AmpCab, FxId::Reverb];
const OVERDRIVE: &[FxId] = &[FxId::Gate, FxId::Overdrive, FxId::AmpCab, FxId::Delay];
const DISTORT: &[FxId] = &[FxId::Gate, FxId::Distortion, FxId::Equalizer, FxId::AmpCab];
const MODULATION: [FxId; PRESETS_PER_BANK as usize] =
    [FxId::Chorus, FxId::Phaser, FxId::Flanger, FxId::Tremolo, FxId::Vibrato];

/// Built-in content of a slot. User slots come back blank.
pub fn factory_preset(slot: PresetSlot) -> Preset {
    let mut preset = Preset::blank(slot);

    let modulation = [MODULATION[usize::from(slot.number())], FxId::Delay, FxId::Reverb];
    let enabled: &[FxId] = match slot.bank() {
        0 => CLEAN,
        1 => CRUNCH,
        2 => OVERDRIVE,
        3 => DISTORT,
        4 => &modulation,
        _ => &[],
    };

    for fx in enabled {
        let layout = fx.layout();
        let mut params = EffectParams {
            enabled: true,
            ..Default::default()
        };
        params.knobs[..layout.knob_count()].fill(50);
        preset.effects[fx.index()] = params;
    }
    preset
}
