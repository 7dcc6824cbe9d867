//! Preset store and shared preset tests

use jammate_core::config::nvs::{check_schema, slot_key, MigrationResult, NvsError, CURRENT_SCHEMA_VERSION};
use jammate_core::fx::{EffectParams, FxId};
use jammate_core::preset::{
    factory_preset, writable_slot, Preset, PresetBinary, PresetError, PresetSlot, PresetStore,
    RamPresetStore, SharedPreset, BANK_NAMES,
};

fn user_preset(bank: u8, number: u8) -> Preset {
    let mut preset = Preset::blank(PresetSlot::new(bank, number).unwrap());
    preset.master_volume = 42;
    preset.effects[FxId::Chorus.index()] = EffectParams {
        enabled: true,
        knobs: [10, 20, 30, 40, 50, 60, 70, 0, 0, 0],
        dropdowns: [0; 4],
    };
    preset
}

#[test]
fn test_bank_names() {
    assert_eq!(BANK_NAMES, ["CLEAN", "CRUNCH", "OVERDRV", "DISTORT", "MODUL", "CUSTM1", "CUSTM2"]);
}

#[test]
fn test_save_and_load_user_slot() {
    let mut store = RamPresetStore::new();
    let preset = user_preset(6, 4);

    store.save(&preset).unwrap();
    assert_eq!(store.load(PresetSlot::new(6, 4).unwrap()), Ok(preset));
}

#[test]
fn test_factory_banks_are_read_only() {
    let mut store = RamPresetStore::new();
    let mut preset = user_preset(5, 0);
    preset.bank = 3;

    assert_eq!(store.save(&preset), Err(PresetError::ReadOnlyBank(3)));
    assert_eq!(writable_slot(&preset), Err(PresetError::ReadOnlyBank(3)));
    assert!(!PresetError::ReadOnlyBank(3).is_invalid_data());
}

#[test]
fn test_invalid_preset_not_saved() {
    let mut store = RamPresetStore::new();
    let mut preset = user_preset(5, 2);
    preset.master_volume = 150;

    assert_eq!(store.save(&preset), Err(PresetError::VolumeOutOfRange(150)));
    let slot = PresetSlot::new(5, 2).unwrap();
    assert!(store.raw(slot).is_none());
    assert_eq!(store.load(slot), Ok(Preset::blank(slot)));
}

#[test]
fn test_corrupt_stored_blob_reported_on_load() {
    let mut store = RamPresetStore::new();
    let slot = PresetSlot::new(5, 0).unwrap();
    let mut bytes = *PresetBinary::encode(&user_preset(5, 0)).as_bytes();
    bytes[50] ^= 0xFF;
    store.put_raw(slot, PresetBinary::from_bytes(&bytes).unwrap()).unwrap();

    let err = store.load(slot).unwrap_err();
    assert!(matches!(err, PresetError::ChecksumMismatch { .. }));
    assert!(err.is_invalid_data());
}

#[test]
fn test_factory_content() {
    let slot = PresetSlot::new(4, 1).unwrap();
    let preset = factory_preset(slot);
    assert_eq!(preset.name.as_str(), "MODUL-2");
    assert!(preset.effect(FxId::Phaser).unwrap().enabled);
    assert!(preset.effect(FxId::Reverb).unwrap().enabled);
    assert!(!preset.effect(FxId::Chorus).unwrap().enabled);
    assert!(preset.validate().is_ok());

    let mut store = RamPresetStore::new();
    assert_eq!(store.load(slot), Ok(preset));
}

#[test]
fn test_shared_preset_apply_is_all_or_nothing() {
    let shared = SharedPreset::new();
    shared.apply(&user_preset(5, 3)).unwrap();
    let before = shared.snapshot();

    let mut bad = user_preset(6, 0);
    bad.effects[FxId::Phaser.index()].dropdowns[0] = 4;
    assert!(matches!(
        shared.apply(&bad),
        Err(PresetError::BadEffect { fx: FxId::Phaser, .. })
    ));
    assert_eq!(shared.snapshot(), before);
    assert_eq!(shared.slot(), (5, 3));
}

#[test]
fn test_nvs_slot_keys() {
    assert_eq!(slot_key(PresetSlot::new(5, 0).unwrap()).as_str(), "p50");
    assert_eq!(slot_key(PresetSlot::new(6, 4).unwrap()).as_str(), "p64");
}

#[test]
fn test_nvs_schema_check() {
    assert!(matches!(check_schema(None), Ok(MigrationResult::FreshInstall)));
    assert!(matches!(
        check_schema(Some(CURRENT_SCHEMA_VERSION)),
        Ok(MigrationResult::UpToDate)
    ));
    assert!(matches!(
        check_schema(Some(CURRENT_SCHEMA_VERSION + 1)),
        Err(NvsError::TooNew { .. })
    ));
}
