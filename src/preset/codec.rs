//! Fixed 297-byte preset binary.
//!
//! ```text
//! off  size  field
//!   0     2  magic 0x50 0x4D ("PM")
//!   2     1  version (0x02)
//!   3     1  bank
//!   4     1  number
//!   5     1  master volume
//!   6     1  bpm
//!   7     1  effect count (17)
//!   8    32  name, NUL padded
//!  40   255  17 × { enabled, knobs[10], dropdowns[4] }
//! 295     2  CRC16 over bytes 0..295, little-endian
//! ```
//!
//! Decoding validates everything before producing a [`Preset`]; a failure
//! leaves the caller's state untouched.

use crate::fx::{EffectParams, MAX_DROPDOWNS, MAX_KNOBS, PRESET_FX_COUNT};

use super::crc::crc16;
use super::model::{Preset, PresetName};
use super::PresetError;

pub const PRESET_MAGIC: [u8; 2] = [0x50, 0x4D];
pub const PRESET_VERSION: u8 = 0x02;

const OFF_VERSION: usize = 2;
const OFF_BANK: usize = 3;
const OFF_NUMBER: usize = 4;
const OFF_VOLUME: usize = 5;
const OFF_BPM: usize = 6;
const OFF_COUNT: usize = 7;
const OFF_NAME: usize = 8;
const NAME_FIELD_LEN: usize = 32;
const OFF_EFFECTS: usize = OFF_NAME + NAME_FIELD_LEN;

/// Bytes per effect block: enabled + knobs + dropdowns.
pub const EFFECT_BLOCK_LEN: usize = 1 + MAX_KNOBS + MAX_DROPDOWNS;

const OFF_CRC: usize = OFF_EFFECTS + PRESET_FX_COUNT * EFFECT_BLOCK_LEN;

/// Total encoded size.
pub const PRESET_BINARY_SIZE: usize = OFF_CRC + 2;

const _: () = assert!(PRESET_BINARY_SIZE == 297);

/// Encoded preset.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PresetBinary([u8; PRESET_BINARY_SIZE]);

impl PresetBinary {
    /// Wrap received bytes. Only the length is checked here.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PresetError> {
        let raw: [u8; PRESET_BINARY_SIZE] =
            bytes.try_into().map_err(|_| PresetError::BadLength(bytes.len()))?;
        Ok(Self(raw))
    }

    /// True if `bytes` has the size and magic of a preset binary.
    pub fn looks_like(bytes: &[u8]) -> bool {
        bytes.len() == PRESET_BINARY_SIZE && bytes[..2] == PRESET_MAGIC
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; PRESET_BINARY_SIZE] {
        &self.0
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.0[OFF_VERSION]
    }

    pub fn stored_checksum(&self) -> u16 {
        u16::from_le_bytes([self.0[OFF_CRC], self.0[OFF_CRC + 1]])
    }

    pub fn computed_checksum(&self) -> u16 {
        crc16(&self.0[..OFF_CRC])
    }

    /// Serialize `preset`. Effect blocks are written byte for byte.
    pub fn encode(preset: &Preset) -> Self {
        let mut b = [0u8; PRESET_BINARY_SIZE];
        b[..2].copy_from_slice(&PRESET_MAGIC);
        b[OFF_VERSION] = PRESET_VERSION;
        b[OFF_BANK] = preset.bank;
        b[OFF_NUMBER] = preset.number;
        b[OFF_VOLUME] = preset.master_volume;
        b[OFF_BPM] = preset.bpm;
        b[OFF_COUNT] = PRESET_FX_COUNT as u8;

        let name = preset.name.as_bytes();
        b[OFF_NAME..OFF_NAME + name.len()].copy_from_slice(name);

        for (i, p) in preset.effects.iter().enumerate() {
            let off = OFF_EFFECTS + i * EFFECT_BLOCK_LEN;
            b[off] = u8::from(p.enabled);
            b[off + 1..off + 1 + MAX_KNOBS].copy_from_slice(&p.knobs);
            b[off + 1 + MAX_KNOBS..off + EFFECT_BLOCK_LEN].copy_from_slice(&p.dropdowns);
        }

        let crc = crc16(&b[..OFF_CRC]);
        b[OFF_CRC..].copy_from_slice(&crc.to_le_bytes());
        Self(b)
    }

    /// Validate and decode.
    ///
    /// Order: magic, effect count, checksum, then preset invariants. A version
    /// other than [`PRESET_VERSION`] is accepted; callers may warn about it.
    pub fn decode(&self) -> Result<Preset, PresetError> {
        let b = &self.0;
        if b[..2] != PRESET_MAGIC {
            return Err(PresetError::BadMagic([b[0], b[1]]));
        }
        if usize::from(b[OFF_COUNT]) != PRESET_FX_COUNT {
            return Err(PresetError::BadEffectCount(b[OFF_COUNT]));
        }
        let stored = self.stored_checksum();
        let computed = self.computed_checksum();
        if stored != computed {
            return Err(PresetError::ChecksumMismatch { stored, computed });
        }

        let mut preset = Preset {
            name: PresetName::from_bytes(&b[OFF_NAME..OFF_NAME + NAME_FIELD_LEN]),
            bank: b[OFF_BANK],
            number: b[OFF_NUMBER],
            master_volume: b[OFF_VOLUME],
            bpm: b[OFF_BPM],
            effects: [EffectParams::default(); PRESET_FX_COUNT],
        };
        for (i, params) in preset.effects.iter_mut().enumerate() {
            let off = OFF_EFFECTS + i * EFFECT_BLOCK_LEN;
            params.enabled = b[off] != 0;
            params.knobs.copy_from_slice(&b[off + 1..off + 1 + MAX_KNOBS]);
            params.dropdowns.copy_from_slice(&b[off + 1 + MAX_KNOBS..off + EFFECT_BLOCK_LEN]);
        }

        preset.validate()?;
        Ok(preset)
    }
}

impl core::fmt::Debug for PresetBinary {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PresetBinary")
            .field("version", &self.version())
            .field("bank", &self.0[OFF_BANK])
            .field("number", &self.0[OFF_NUMBER])
            .field("crc", &self.stored_checksum())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(OFF_EFFECTS, 40);
        assert_eq!(OFF_CRC, 295);
    }

    #[test]
    fn test_header_bytes() {
        let bin = PresetBinary::encode(&Preset::default());
        let b = bin.as_bytes();
        assert_eq!(&b[..3], &[0x50, 0x4D, 0x02]);
        assert_eq!(b[OFF_COUNT], 17);
        assert_eq!(bin.stored_checksum(), bin.computed_checksum());
    }

    #[test]
    fn test_version_mismatch_tolerated() {
        let mut raw = *PresetBinary::encode(&Preset::default()).as_bytes();
        raw[OFF_VERSION] = 0x01;
        let crc = crc16(&raw[..OFF_CRC]);
        raw[OFF_CRC..].copy_from_slice(&crc.to_le_bytes());

        let bin = PresetBinary::from_bytes(&raw).unwrap();
        assert_eq!(bin.version(), 0x01);
        assert_eq!(bin.decode(), Ok(Preset::default()));
    }

    #[test]
    fn test_wrong_length() {
        assert_eq!(
            PresetBinary::from_bytes(&[0u8; 296]),
            Err(PresetError::BadLength(296))
        );
    }
}
