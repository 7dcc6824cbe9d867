//! Preset binary codec tests

use jammate_core::fx::{EffectParams, FxId, PRESET_FX_COUNT};
use jammate_core::preset::{
    Preset, PresetBinary, PresetError, PresetName, PresetSlot, PRESET_BINARY_SIZE, PRESET_MAGIC,
    PRESET_VERSION,
};

/// OVERDRV-4: gate, overdrive, amp/cab and delay on.
fn overdrive_preset() -> Preset {
    let mut preset = Preset::blank(PresetSlot::new(2, 3).unwrap());
    preset.master_volume = 85;
    preset.bpm = 132;
    for (fx, block) in [
        (FxId::Gate, &[1u8, 40, 10, 10, 30, 90][..]),
        (FxId::Overdrive, &[1, 70, 55, 0, 20, 30, 60, 40, 50, 45, 100, 1, 0][..]),
        (FxId::AmpCab, &[1, 80, 50, 60, 40, 50, 70, 3, 2, 1, 0][..]),
        (FxId::Delay, &[1, 60, 35, 50, 70, 100, 40, 10, 10, 0, 2, 7, 0][..]),
    ] {
        preset.effects[fx.index()] = EffectParams::from_flat(fx.layout(), block).unwrap();
    }
    preset
}

#[test]
fn test_round_trip_overdrive_preset() {
    let preset = overdrive_preset();
    let blob = PresetBinary::encode(&preset);
    let bytes = blob.as_bytes();

    assert_eq!(bytes.len(), PRESET_BINARY_SIZE);
    assert_eq!(&bytes[..2], &PRESET_MAGIC);
    assert_eq!(bytes[2], PRESET_VERSION);
    assert_eq!(&bytes[3..8], &[2, 3, 85, 132, 17]);
    assert_eq!(&bytes[8..17], b"OVERDRV-4");
    assert_eq!(bytes[17], 0);

    let decoded = PresetBinary::from_bytes(bytes).unwrap().decode().unwrap();
    assert_eq!(decoded, preset);
    assert_eq!(decoded.effect(FxId::Overdrive).unwrap().knobs[0], 70);
}

#[test]
fn test_effect_blocks_at_fixed_offsets() {
    let bytes = *PresetBinary::encode(&overdrive_preset()).as_bytes();

    // Gate is block 0 at offset 40; overdrive is block 3.
    assert_eq!(&bytes[40..46], &[1, 40, 10, 10, 30, 90]);
    let ovrd = 40 + 3 * 15;
    assert_eq!(bytes[ovrd], 1);
    assert_eq!(bytes[ovrd + 1], 70);
    assert_eq!(&bytes[ovrd + 11..ovrd + 15], &[1, 0, 0, 0]);

    // Disabled reverb block is all zero.
    let rvrb = 40 + FxId::Reverb.index() * 15;
    assert!(bytes[rvrb..rvrb + 15].iter().all(|&b| b == 0));
}

#[test]
fn test_checksum_is_little_endian_over_body() {
    let blob = PresetBinary::encode(&overdrive_preset());
    let bytes = blob.as_bytes();
    let stored = u16::from_le_bytes([bytes[295], bytes[296]]);
    assert_eq!(stored, blob.stored_checksum());
    assert_eq!(stored, blob.computed_checksum());
}

#[test]
fn test_any_single_bit_flip_is_detected() {
    let good = *PresetBinary::encode(&overdrive_preset()).as_bytes();
    for i in (2..PRESET_BINARY_SIZE).step_by(7) {
        let mut bytes = good;
        bytes[i] ^= 0x10;
        let err = PresetBinary::from_bytes(&bytes).unwrap().decode().unwrap_err();
        assert!(
            matches!(
                err,
                PresetError::ChecksumMismatch { .. } | PresetError::BadEffectCount(_)
            ),
            "byte {} gave {:?}",
            i,
            err
        );
    }
}

#[test]
fn test_bad_magic() {
    let mut bytes = *PresetBinary::encode(&overdrive_preset()).as_bytes();
    bytes[0] = b'X';
    let err = PresetBinary::from_bytes(&bytes).unwrap().decode().unwrap_err();
    assert_eq!(err, PresetError::BadMagic([b'X', 0x4D]));
    assert!(!PresetBinary::looks_like(&bytes));
}

#[test]
fn test_valid_checksum_but_invalid_content() {
    // Re-sign a blob whose dropdown is out of range: checksum passes, validation fails.
    let mut preset = overdrive_preset();
    preset.effects[FxId::Delay.index()].dropdowns[0] = 7;
    let blob = PresetBinary::encode(&preset);
    assert_eq!(blob.stored_checksum(), blob.computed_checksum());

    let err = blob.decode().unwrap_err();
    assert!(matches!(err, PresetError::BadEffect { fx: FxId::Delay, .. }));
}

#[test]
fn test_out_of_range_slot_rejected_after_checksum() {
    let mut preset = overdrive_preset();
    preset.bank = 7;
    let err = PresetBinary::encode(&preset).decode().unwrap_err();
    assert_eq!(err, PresetError::SlotOutOfRange { bank: 7, number: 3 });
}

#[test]
fn test_volume_above_100_rejected() {
    let mut preset = overdrive_preset();
    preset.master_volume = 101;
    let err = PresetBinary::encode(&preset).decode().unwrap_err();
    assert_eq!(err, PresetError::VolumeOutOfRange(101));
}

#[test]
fn test_long_name_truncated() {
    let mut preset = overdrive_preset();
    preset.name = PresetName::new("a name that is far too long for the thirty-one byte field");
    let decoded = PresetBinary::encode(&preset).decode().unwrap();
    assert_eq!(decoded.name.as_str().len(), 31);
    assert!(decoded.name.as_str().starts_with("a name that"));
}

#[test]
fn test_stored_bytes_survive_round_trip() {
    let mut preset = overdrive_preset();
    // Vibrato declares 3 knobs and no dropdowns; the rest is stored as given.
    preset.effects[FxId::Vibrato.index()] = EffectParams {
        enabled: true,
        knobs: [10, 20, 30, 99, 99, 99, 99, 99, 99, 7],
        dropdowns: [5, 5, 5, 5],
    };
    // Above the gate's knob scale.
    preset.effects[FxId::Gate.index()].knobs[0] = 150;
    assert!(preset.validate().is_ok());

    let blob = PresetBinary::encode(&preset);
    let off = 40 + FxId::Vibrato.index() * 15;
    assert_eq!(&blob.as_bytes()[off..off + 15], &[1, 10, 20, 30, 99, 99, 99, 99, 99, 99, 7, 5, 5, 5, 5]);

    let decoded = blob.decode().unwrap();
    assert_eq!(decoded.effect(FxId::Gate).unwrap().knobs[0], 150);
    assert_eq!(decoded, preset);
}

#[test]
fn test_every_effect_present() {
    let decoded = PresetBinary::encode(&overdrive_preset()).decode().unwrap();
    assert_eq!(decoded.effects.len(), PRESET_FX_COUNT);
    let enabled: Vec<FxId> = FxId::ALL[..PRESET_FX_COUNT]
        .iter()
        .copied()
        .filter(|fx| decoded.effect(*fx).unwrap().enabled)
        .collect();
    assert_eq!(enabled, vec![FxId::Gate, FxId::Overdrive, FxId::AmpCab, FxId::Delay]);
}
