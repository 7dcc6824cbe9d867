//! Preset value types.

use core::fmt::Write;

use heapless::String;

use crate::fx::{EffectParams, FxId, PRESET_FX_COUNT};

use super::PresetError;

/// Banks on the device.
pub const BANK_COUNT: u8 = 7;

/// Presets per bank.
pub const PRESETS_PER_BANK: u8 = 5;

/// First bank the user may overwrite.
pub const FIRST_USER_BANK: u8 = 5;

/// Longest preset name in bytes (the binary field adds a terminator).
pub const MAX_NAME_LEN: usize = 31;

/// Bank labels shown on the preset bar.
pub const BANK_NAMES: [&str; BANK_COUNT as usize] =
    ["CLEAN", "CRUNCH", "OVERDRV", "DISTORT", "MODUL", "CUSTM1", "CUSTM2"];

/// A validated bank/number pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PresetSlot {
    bank: u8,
    number: u8,
}

impl PresetSlot {
    /// Rejects `bank > 6` or `number > 4`.
    pub fn new(bank: u8, number: u8) -> Result<Self, PresetError> {
        if bank >= BANK_COUNT || number >= PRESETS_PER_BANK {
            return Err(PresetError::SlotOutOfRange { bank, number });
        }
        Ok(Self { bank, number })
    }

    #[inline]
    pub fn bank(&self) -> u8 {
        self.bank
    }

    #[inline]
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Linear index `0..35`.
    #[inline]
    pub fn index(&self) -> usize {
        usize::from(self.bank) * usize::from(PRESETS_PER_BANK) + usize::from(self.number)
    }

    /// Banks 5 and 6 are user-writable; the rest are factory content.
    #[inline]
    pub fn is_user_writable(&self) -> bool {
        self.bank >= FIRST_USER_BANK
    }

    /// `"OVERDRV-4"` style label (numbers shown 1-based).
    pub fn label(&self) -> String<12> {
        let mut label = String::new();
        let _ = write!(label, "{}-{}", BANK_NAMES[usize::from(self.bank)], self.number + 1);
        label
    }
}

/// Preset name, at most 31 bytes of UTF-8 with no interior NUL.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PresetName(String<MAX_NAME_LEN>);

impl PresetName {
    /// Truncates at the first NUL and at the last char boundary within 31 bytes.
    pub fn new(name: &str) -> Self {
        let name = name.split('\0').next().unwrap_or("");
        let mut out = String::new();
        for c in name.chars() {
            if out.push(c).is_err() {
                break;
            }
        }
        Self(out)
    }

    /// Decode a NUL-padded byte field. Invalid UTF-8 keeps the valid prefix.
    pub fn from_bytes(field: &[u8]) -> Self {
        let field = &field[..field.len().min(MAX_NAME_LEN)];
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        let text = match core::str::from_utf8(&field[..end]) {
            Ok(text) => text,
            Err(e) => core::str::from_utf8(&field[..e.valid_up_to()]).unwrap_or(""),
        };
        Self::new(text)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl core::fmt::Display for PresetName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete machine state: identity, globals and every persisted effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preset {
    pub name: PresetName,
    pub bank: u8,
    pub number: u8,
    /// 0..=100
    pub master_volume: u8,
    pub bpm: u8,
    /// Canonical effect order, `GATE` first.
    pub effects: [EffectParams; PRESET_FX_COUNT],
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            name: PresetName::default(),
            bank: 0,
            number: 0,
            master_volume: 100,
            bpm: 120,
            effects: [EffectParams::default(); PRESET_FX_COUNT],
        }
    }
}

impl Preset {
    /// Empty preset addressed to `slot`, named after it.
    pub fn blank(slot: PresetSlot) -> Self {
        Self {
            name: PresetName::new(slot.label().as_str()),
            bank: slot.bank(),
            number: slot.number(),
            ..Default::default()
        }
    }

    /// Bank/number as a validated slot.
    pub fn slot(&self) -> Result<PresetSlot, PresetError> {
        PresetSlot::new(self.bank, self.number)
    }

    #[inline]
    pub fn effect(&self, fx: FxId) -> Option<&EffectParams> {
        self.effects.get(fx.index())
    }

    /// Check every invariant a preset must hold before it may replace live state.
    pub fn validate(&self) -> Result<(), PresetError> {
        self.slot()?;
        if self.master_volume > 100 {
            return Err(PresetError::VolumeOutOfRange(self.master_volume));
        }
        for (fx, params) in FxId::ALL.iter().zip(&self.effects) {
            params
                .validate(fx.layout())
                .map_err(|error| PresetError::BadEffect { fx: *fx, error })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_bounds() {
        assert!(PresetSlot::new(6, 4).is_ok());
        assert_eq!(
            PresetSlot::new(7, 0),
            Err(PresetError::SlotOutOfRange { bank: 7, number: 0 })
        );
        assert!(PresetSlot::new(0, 5).is_err());
    }

    #[test]
    fn test_slot_label_and_writability() {
        let slot = PresetSlot::new(2, 3).unwrap();
        assert_eq!(slot.label().as_str(), "OVERDRV-4");
        assert!(!slot.is_user_writable());
        assert!(PresetSlot::new(5, 0).unwrap().is_user_writable());
        assert_eq!(PresetSlot::new(6, 4).unwrap().index(), 34);
    }

    #[test]
    fn test_name_truncation() {
        let long = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
        assert_eq!(PresetName::new(long).as_str().len(), MAX_NAME_LEN);
        assert_eq!(PresetName::new("AB\0CD").as_str(), "AB");
        // multi-byte char straddling the limit is dropped whole
        let edgy = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\u{e9}";
        assert_eq!(PresetName::new(edgy).as_str().len(), 30);
    }

    #[test]
    fn test_name_from_bytes_keeps_valid_prefix() {
        let mut field = [0u8; 32];
        field[..4].copy_from_slice(b"LEAD");
        field[4] = 0xFF;
        assert_eq!(PresetName::from_bytes(&field).as_str(), "LEAD");
    }

    #[test]
    fn test_validate_volume() {
        let p = Preset { master_volume: 101, ..Default::default() };
        assert_eq!(p.validate(), Err(PresetError::VolumeOutOfRange(101)));
    }
}
