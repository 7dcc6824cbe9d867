//! Module: config
//!
//! Purpose: link and channel configuration for the control core.
//!
//! Architecture:
//! - [`LinkConfig`]: compile-time defaults (wire constants, timings)
//! - [`RuntimeConfig`]: values that may change while running, all atomics
//! - [`nvs`]: preset persistence in ESP-IDF NVS
//!
//! Safety: RT-safe. All runtime access via atomics, no locks.

pub mod nvs;

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Compile-time defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    /// UART baud rate between front-end and DSP.
    pub baud_rate: u32,
    /// Idle time before the receive watchdog expires.
    pub watchdog_timeout_ms: u32,
    /// Default BLE chunk size for `send_chunked`.
    pub ble_chunk_size: usize,
    /// Pause between BLE notify chunks.
    pub ble_chunk_delay_ms: u32,
    /// Delay between a BLE disconnect and restarting advertising.
    pub readvertise_delay_ms: u32,
    /// Negotiated ATT MTU requested from the client.
    pub ble_mtu: u16,
    pub device_name: &'static str,
}

impl LinkConfig {
    pub const DEFAULT: LinkConfig = LinkConfig {
        baud_rate: 115_200,
        watchdog_timeout_ms: 5_000,
        ble_chunk_size: 512,
        ble_chunk_delay_ms: 20,
        readvertise_delay_ms: 100,
        ble_mtu: 517,
        device_name: "JamMate",
    };
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Runtime-adjustable configuration.
///
/// Read by the receive task and the BLE channel on every poll, written by
/// the controller. Each field is independent; no cross-field consistency
/// is needed.
pub struct RuntimeConfig {
    /// Force-reset the receiver when the watchdog expires.
    pub watchdog_enabled: AtomicBool,
    pub watchdog_timeout_ms: AtomicU32,
    pub ble_chunk_delay_ms: AtomicU32,
    pub readvertise_delay_ms: AtomicU32,
}

impl RuntimeConfig {
    /// Runtime configuration seeded from `defaults`. The watchdog starts disabled.
    pub const fn from_defaults(defaults: &LinkConfig) -> Self {
        Self {
            watchdog_enabled: AtomicBool::new(false),
            watchdog_timeout_ms: AtomicU32::new(defaults.watchdog_timeout_ms),
            ble_chunk_delay_ms: AtomicU32::new(defaults.ble_chunk_delay_ms),
            readvertise_delay_ms: AtomicU32::new(defaults.readvertise_delay_ms),
        }
    }

    pub const fn new() -> Self {
        Self::from_defaults(&LinkConfig::DEFAULT)
    }

    #[inline]
    pub fn watchdog_enabled(&self) -> bool {
        self.watchdog_enabled.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn watchdog_timeout_ms(&self) -> u32 {
        self.watchdog_timeout_ms.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn ble_chunk_delay_ms(&self) -> u32 {
        self.ble_chunk_delay_ms.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn readvertise_delay_ms(&self) -> u32 {
        self.readvertise_delay_ms.load(Ordering::Relaxed)
    }

    pub fn set_watchdog(&self, enabled: bool, timeout_ms: u32) {
        self.watchdog_timeout_ms.store(timeout_ms, Ordering::Relaxed);
        self.watchdog_enabled.store(enabled, Ordering::Relaxed);
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide runtime configuration used by the firmware binary.
pub static CONFIG: RuntimeConfig = RuntimeConfig::new();
