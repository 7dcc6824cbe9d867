//! # jammate-core
//!
//! Control core of the JamMate multi-effects processor.
//!
//! ## Architecture
//!
//! ```text
//! UART ISR/task ──▶ FrameReceiver ──▶ SerialQueue ─┐
//!                                                  ├──▶ Controller ──▶ Dispatcher
//! GATT callbacks ──▶ BleLink ───────▶ BleQueue ────┘         │             │
//!                                                            │             ▼
//!                                   PresetStore ◀────────────┤      SharedPreset
//!                                   UiSync ◀─────────────────┘      SystemState
//!                                                                   ParamQueue ──▶ EffectChain
//! ```
//!
//! Receive contexts only frame and enqueue. All decoding and state changes
//! happen in the controller. The audio side sees parameter changes through a
//! bounded queue and reads the shared preset without locks.

#![cfg_attr(not(test), no_std)]

pub mod audio;
pub mod ble;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod fx;
pub mod ir;
pub mod log_globals;
pub mod logging;
pub mod preset;
pub mod protocol;
pub mod stats;
pub mod system;
pub mod uart_logger;
pub mod ui;

pub use audio::{Effect, EffectChain, ParamQueue};
pub use ble::{BleChannel, BleError, BleLink, DisabledGatt, GattServer};
pub use config::{LinkConfig, RuntimeConfig, CONFIG};
pub use controller::{Controller, Platform, PollReport};
pub use dispatch::{Context, DispatchError, Dispatcher, Outcome};
pub use fx::{EffectParams, FxId, FxLayout, FX_LAYOUTS};
pub use preset::{Preset, PresetBinary, PresetError, PresetSlot, PresetStore, SharedPreset};
pub use protocol::{FrameReceiver, FrameTransmitter, SerialQueue, Tag, TxSlot, UartTx};
pub use stats::{LinkFault, LinkStats};
pub use system::SystemState;
pub use ui::{Redraw, UiNotice, UiSync};
