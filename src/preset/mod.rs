//! Presets: value model, binary codec, shared live state and storage.

pub mod codec;
pub mod crc;
pub mod model;
pub mod shared;
pub mod store;

pub use codec::{PresetBinary, PRESET_BINARY_SIZE, PRESET_MAGIC, PRESET_VERSION};
pub use model::{
    Preset, PresetName, PresetSlot, BANK_COUNT, BANK_NAMES, FIRST_USER_BANK, PRESETS_PER_BANK,
};
pub use shared::{SharedEffect, SharedPreset};
pub use store::{factory_preset, user_index, writable_slot, PresetStore, RamPresetStore, USER_SLOTS};

use crate::fx::{FxId, ParamError};

/// Preset decode, validation and storage errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresetError {
    /// R01: buffer is not 297 bytes
    BadLength(usize),
    /// R02: magic bytes do not match
    BadMagic([u8; 2]),
    /// R03: effect count field is not 17
    BadEffectCount(u8),
    /// R04: CRC16 mismatch
    ChecksumMismatch { stored: u16, computed: u16 },
    /// R05: bank > 6 or number > 4
    SlotOutOfRange { bank: u8, number: u8 },
    /// R06: master volume above 100
    VolumeOutOfRange(u8),
    /// R07: an effect block violates its layout
    BadEffect { fx: FxId, error: ParamError },
    /// R08: factory banks cannot be overwritten
    ReadOnlyBank(u8),
    /// R09: backing storage failed
    Storage,
}

impl PresetError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadLength(_) => "R01",
            Self::BadMagic(_) => "R02",
            Self::BadEffectCount(_) => "R03",
            Self::ChecksumMismatch { .. } => "R04",
            Self::SlotOutOfRange { .. } => "R05",
            Self::VolumeOutOfRange(_) => "R06",
            Self::BadEffect { .. } => "R07",
            Self::ReadOnlyBank(_) => "R08",
            Self::Storage => "R09",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::BadLength(_) => "wrong preset size",
            Self::BadMagic(_) => "bad magic",
            Self::BadEffectCount(_) => "wrong effect count",
            Self::ChecksumMismatch { .. } => "checksum mismatch",
            Self::SlotOutOfRange { .. } => "bank/number out of range",
            Self::VolumeOutOfRange(_) => "volume out of range",
            Self::BadEffect { .. } => "invalid effect parameters",
            Self::ReadOnlyBank(_) => "bank is read-only",
            Self::Storage => "storage error",
        }
    }

    /// Errors that mean the data itself was bad (as opposed to where it was going).
    pub fn is_invalid_data(&self) -> bool {
        !matches!(self, Self::ReadOnlyBank(_) | Self::Storage)
    }
}

impl core::fmt::Display for PresetError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ChecksumMismatch { stored, computed } => write!(
                f,
                "{}: {} (stored {:04X}, computed {:04X})",
                self.code(),
                self.message(),
                stored,
                computed
            ),
            Self::SlotOutOfRange { bank, number } => {
                write!(f, "{}: {} ({}/{})", self.code(), self.message(), bank, number)
            }
            Self::BadEffect { fx, error } => {
                write!(f, "{}: {} ({}: {})", self.code(), self.message(), fx.tag(), error)
            }
            _ => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}
