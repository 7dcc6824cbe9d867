//! BLE control channel.
//!
//! ```text
//! GATT stack task                    controller
//! ───────────────                    ──────────
//! on_write ──▶ BleLink queue ──────▶ Dispatcher (same as serial)
//! on_connect / on_disconnect ─┐
//!                             └────▶ BleChannel::poll ──▶ re-advertise
//!                                    BleChannel::send / send_chunked ──▶ notify
//! ```
//!
//! The radio stack is behind [`GattServer`]. Callback context only touches
//! [`BleLink`] atomics and its packet queue; every call into the stack is
//! made from the controller.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embedded_hal::delay::DelayNs;

use crate::config::{LinkConfig, RuntimeConfig};
use crate::protocol::PacketQueue;

/// Nordic UART service.
pub const SERVICE_UUID: &str = "6e400001-b5a3-f393-e0a9-e50e24dcca9f";

/// Control characteristic (write, read, notify, write without response).
pub const CHARACTERISTIC_UUID: &str = "6e400002-b5a3-f393-e0a9-e50e24dcca9f";

/// Characteristic value after start-up.
pub const READY_VALUE: &[u8] = b"JamMate_Ready";

/// Single-byte acknowledgement of a saved preset.
pub const PRESET_ACK: u8 = 0xAA;

/// Largest characteristic value (MTU 517 minus ATT header).
pub const MAX_VALUE_LEN: usize = 514;

/// BLE write queue.
pub type BleQueue = PacketQueue<MAX_VALUE_LEN, 4>;

/// BLE errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BleError {
    /// B01: value longer than one notify can carry
    TooLarge { size: usize },
    /// B02: chunk size of zero
    BadChunkSize,
    /// B03: the GATT stack refused the operation
    Stack,
    /// B04: this build has no radio binding
    Disabled,
}

impl BleError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooLarge { .. } => "B01",
            Self::BadChunkSize => "B02",
            Self::Stack => "B03",
            Self::Disabled => "B04",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::TooLarge { .. } => "value too large",
            Self::BadChunkSize => "chunk size must be non-zero",
            Self::Stack => "GATT stack error",
            Self::Disabled => "BLE disabled",
        }
    }
}

impl core::fmt::Display for BleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooLarge { size } => write!(f, "{}: {} ({} bytes)", self.code(), self.message(), size),
            _ => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}

/// The GATT server as seen by the channel.
pub trait GattServer {
    /// Set the characteristic value read by clients.
    fn set_value(&mut self, value: &[u8]) -> Result<(), BleError>;

    /// Set the value and notify subscribed clients.
    fn notify(&mut self, value: &[u8]) -> Result<(), BleError>;

    fn start_advertising(&mut self) -> Result<(), BleError>;
}

/// Server for boards built without a radio binding. Every stack call fails
/// with [`BleError::Disabled`]; with no connection ever reported, sends are
/// no-ops and the channel never re-advertises.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledGatt;

impl GattServer for DisabledGatt {
    fn set_value(&mut self, _value: &[u8]) -> Result<(), BleError> {
        Err(BleError::Disabled)
    }

    fn notify(&mut self, _value: &[u8]) -> Result<(), BleError> {
        Err(BleError::Disabled)
    }

    fn start_advertising(&mut self) -> Result<(), BleError> {
        Err(BleError::Disabled)
    }
}

/// Connection state and inbound queue, written from GATT callbacks.
pub struct BleLink {
    queue: BleQueue,
    connected: AtomicBool,
    readvertise_pending: AtomicBool,
    /// Wrapping millisecond time of the last disconnect.
    disconnected_at: AtomicU32,
}

impl BleLink {
    pub const fn new() -> Self {
        Self {
            queue: BleQueue::new(),
            connected: AtomicBool::new(false),
            readvertise_pending: AtomicBool::new(false),
            disconnected_at: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn on_connect(&self) {
        self.readvertise_pending.store(false, Ordering::Release);
        self.connected.store(true, Ordering::Release);
    }

    /// Mark disconnected and request advertising once the configured delay has passed.
    pub fn on_disconnect(&self, now_ms: u64) {
        self.connected.store(false, Ordering::Release);
        self.disconnected_at.store(now_ms as u32, Ordering::Relaxed);
        self.readvertise_pending.store(true, Ordering::Release);
    }

    /// Characteristic write. Returns `false` if the write was dropped.
    pub fn on_write(&self, data: &[u8]) -> bool {
        self.queue.push(data)
    }

    #[inline]
    pub fn queue(&self) -> &BleQueue {
        &self.queue
    }

    /// Take the re-advertise request if `delay_ms` has passed since the disconnect.
    fn take_readvertise(&self, now_ms: u64, delay_ms: u32) -> bool {
        if !self.readvertise_pending.load(Ordering::Acquire) {
            return false;
        }
        let since = self.disconnected_at.load(Ordering::Relaxed);
        if (now_ms as u32).wrapping_sub(since) < delay_ms {
            return false;
        }
        self.readvertise_pending
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for BleLink {
    fn default() -> Self {
        Self::new()
    }
}

/// Outbound side of the BLE channel, owned by the controller.
pub struct BleChannel<'a, G: GattServer, D: DelayNs> {
    link: &'a BleLink,
    config: &'a RuntimeConfig,
    gatt: G,
    delay: D,
}

impl<'a, G: GattServer, D: DelayNs> BleChannel<'a, G, D> {
    pub fn new(link: &'a BleLink, config: &'a RuntimeConfig, gatt: G, delay: D) -> Self {
        Self {
            link,
            config,
            gatt,
            delay,
        }
    }

    /// Publish the ready value and start advertising.
    pub fn begin(&mut self) -> Result<(), BleError> {
        self.gatt.set_value(READY_VALUE)?;
        self.gatt.start_advertising()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    #[inline]
    pub fn link(&self) -> &'a BleLink {
        self.link
    }

    /// One notify. Returns bytes sent, 0 when nobody is connected or `data` is empty.
    pub fn send(&mut self, data: &[u8]) -> Result<usize, BleError> {
        if data.is_empty() || !self.is_connected() {
            return Ok(0);
        }
        if data.len() > MAX_VALUE_LEN {
            return Err(BleError::TooLarge { size: data.len() });
        }
        self.gatt.notify(data)?;
        Ok(data.len())
    }

    /// Sequential notifies of at most `chunk` bytes with the configured pause
    /// between them. Returns the number of chunks sent.
    pub fn send_chunked(&mut self, data: &[u8], chunk: usize) -> Result<usize, BleError> {
        if chunk == 0 {
            return Err(BleError::BadChunkSize);
        }
        if !self.is_connected() {
            return Ok(0);
        }
        let chunk = chunk.min(MAX_VALUE_LEN);
        let pause = self.config.ble_chunk_delay_ms();

        let mut sent = 0;
        for (i, part) in data.chunks(chunk).enumerate() {
            if i > 0 {
                self.delay.delay_ms(pause);
            }
            self.gatt.notify(part)?;
            sent += 1;
        }
        Ok(sent)
    }

    /// [`send_chunked`](Self::send_chunked) with the default chunk size.
    pub fn send_large(&mut self, data: &[u8]) -> Result<usize, BleError> {
        self.send_chunked(data, LinkConfig::DEFAULT.ble_chunk_size)
    }

    /// Acknowledge a saved preset.
    pub fn send_ack(&mut self) -> Result<usize, BleError> {
        self.send(&[PRESET_ACK])
    }

    /// Restart advertising once the post-disconnect delay has passed.
    pub fn poll(&mut self, now_ms: u64) -> Result<bool, BleError> {
        if !self.link.take_readvertise(now_ms, self.config.readvertise_delay_ms()) {
            return Ok(false);
        }
        self.gatt.start_advertising()?;
        Ok(true)
    }

    pub fn gatt(&self) -> &G {
        &self.gatt
    }

    pub fn gatt_mut(&mut self) -> &mut G {
        &mut self.gatt
    }
}
