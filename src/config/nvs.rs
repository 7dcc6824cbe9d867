//! NVS persistence for user presets with schema versioning.
//!
//! Each user slot is one raw blob holding the 297-byte preset binary, so the
//! checksum travels with the data and a torn write is caught on load.
//!
//! # Version History
//!
//! - **v1** (current): one `PresetBinary` blob per user slot, key `p{bank}{number}`
//!
//! # Adding a schema version
//!
//! 1. Increment `CURRENT_SCHEMA_VERSION`
//! 2. Implement the `migrate_vN_to_vM()` step
//! 3. Route it in `migrate_path()`

use core::cmp::Ordering;
use core::fmt::Write;

use heapless::String;

use crate::preset::PresetSlot;

#[cfg(target_os = "espidf")]
use crate::preset::{
    factory_preset, writable_slot, Preset, PresetBinary, PresetError, PresetStore,
    PRESET_BINARY_SIZE,
};
#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;

/// Current NVS schema version for presets
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// NVS namespace for presets
pub const NVS_NAMESPACE: &str = "jm_presets";

/// NVS key for schema version
const VERSION_KEY: &str = "schema_ver";

/// Migration result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationResult {
    /// Fresh install, nothing stored yet
    FreshInstall,
    /// Schema up-to-date
    UpToDate,
    /// Migrated from older version
    Migrated { from_version: u32, to_version: u32 },
}

/// NVS operation errors
#[derive(Debug, Clone, Copy)]
pub enum NvsError {
    /// N01: NVS initialization failed
    #[cfg(target_os = "espidf")]
    InitFailed(EspError),
    /// N02: schema version too new (downgrade not supported)
    TooNew { stored_version: u32 },
    /// N03: NVS read/write error
    #[cfg(target_os = "espidf")]
    IoError(EspError),
    /// N04: unsupported migration path
    UnsupportedMigration { from: u32, to: u32 },
    /// N05: feature not available on this platform
    #[cfg(not(target_os = "espidf"))]
    NotAvailable,
}

impl NvsError {
    pub fn code(&self) -> &'static str {
        match self {
            #[cfg(target_os = "espidf")]
            Self::InitFailed(_) => "N01",
            Self::TooNew { .. } => "N02",
            #[cfg(target_os = "espidf")]
            Self::IoError(_) => "N03",
            Self::UnsupportedMigration { .. } => "N04",
            #[cfg(not(target_os = "espidf"))]
            Self::NotAvailable => "N05",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            #[cfg(target_os = "espidf")]
            Self::InitFailed(_) => "NVS init failed",
            Self::TooNew { .. } => "stored schema is newer than firmware",
            #[cfg(target_os = "espidf")]
            Self::IoError(_) => "NVS I/O error",
            Self::UnsupportedMigration { .. } => "unsupported schema migration",
            #[cfg(not(target_os = "espidf"))]
            Self::NotAvailable => "NVS not available",
        }
    }
}

impl core::fmt::Display for NvsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooNew { stored_version } => {
                write!(f, "{}: {} (v{})", self.code(), self.message(), stored_version)
            }
            Self::UnsupportedMigration { from, to } => {
                write!(f, "{}: {} (v{} -> v{})", self.code(), self.message(), from, to)
            }
            _ => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}

#[cfg(target_os = "espidf")]
impl From<EspError> for NvsError {
    fn from(e: EspError) -> Self {
        NvsError::IoError(e)
    }
}

/// NVS key of a slot: `p{bank}{number}`.
pub fn slot_key(slot: PresetSlot) -> String<4> {
    let mut key = String::new();
    let _ = write!(key, "p{}{}", slot.bank(), slot.number());
    key
}

/// Decide what to do with the stored schema version (`None` when absent).
pub fn check_schema(stored: Option<u32>) -> Result<MigrationResult, NvsError> {
    let stored_version = stored.unwrap_or(0);
    match stored_version.cmp(&CURRENT_SCHEMA_VERSION) {
        Ordering::Equal => Ok(MigrationResult::UpToDate),
        Ordering::Less if stored_version == 0 => Ok(MigrationResult::FreshInstall),
        Ordering::Less => {
            migrate_path(stored_version, CURRENT_SCHEMA_VERSION)?;
            Ok(MigrationResult::Migrated {
                from_version: stored_version,
                to_version: CURRENT_SCHEMA_VERSION,
            })
        }
        Ordering::Greater => Err(NvsError::TooNew { stored_version }),
    }
}

/// Known migration routes. v1 is the first schema, so there are none yet.
fn migrate_path(from: u32, to: u32) -> Result<(), NvsError> {
    Err(NvsError::UnsupportedMigration { from, to })
}

/// Preset store on the default NVS partition.
#[cfg(target_os = "espidf")]
pub struct NvsPresetStore {
    storage: EspNvs<NvsDefault>,
}

#[cfg(target_os = "espidf")]
impl NvsPresetStore {
    /// Open the namespace and bring the schema up to date.
    pub fn open(partition: EspDefaultNvsPartition) -> Result<(Self, MigrationResult), NvsError> {
        let mut storage =
            EspNvs::new(partition, NVS_NAMESPACE, true).map_err(NvsError::InitFailed)?;

        let result = check_schema(storage.get_u32(VERSION_KEY)?)?;
        if result != MigrationResult::UpToDate {
            storage.set_u32(VERSION_KEY, CURRENT_SCHEMA_VERSION)?;
        }
        Ok((Self { storage }, result))
    }

    /// Erase a user slot.
    pub fn clear(&mut self, slot: PresetSlot) -> Result<bool, NvsError> {
        Ok(self.storage.remove(&slot_key(slot))?)
    }
}

#[cfg(target_os = "espidf")]
impl PresetStore for NvsPresetStore {
    fn load(&mut self, slot: PresetSlot) -> Result<Preset, PresetError> {
        if !slot.is_user_writable() {
            return Ok(factory_preset(slot));
        }
        let mut buf = [0u8; PRESET_BINARY_SIZE];
        let stored = self
            .storage
            .get_raw(&slot_key(slot), &mut buf)
            .map_err(|_| PresetError::Storage)?;
        match stored {
            Some(bytes) => PresetBinary::from_bytes(bytes)?.decode(),
            None => Ok(Preset::blank(slot)),
        }
    }

    fn save(&mut self, preset: &Preset) -> Result<(), PresetError> {
        let slot = writable_slot(preset)?;
        let blob = PresetBinary::encode(preset);
        self.storage
            .set_raw(&slot_key(slot), blob.as_bytes())
            .map_err(|_| PresetError::Storage)?;
        Ok(())
    }
}

/// Stub for non-ESP platforms
#[cfg(not(target_os = "espidf"))]
pub struct NvsPresetStore;

#[cfg(not(target_os = "espidf"))]
impl NvsPresetStore {
    pub fn open() -> Result<(Self, MigrationResult), NvsError> {
        Err(NvsError::NotAvailable)
    }
}
