//! Single-slot frame transmitter.
//!
//! Only one outbound frame may be in flight. A send while the slot is busy is
//! dropped and counted rather than queued or blocked on, so a flood of
//! telemetry can never stall the controller.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::stats::{LinkFault, LinkStats};

use super::{Tag, FRAME_OVERHEAD, SYNC_BYTE, TAG_LEN, TX_BUFFER_SIZE};

/// How the port accepted a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStart {
    /// Bytes are already on the wire (blocking driver).
    Complete,
    /// Transfer started; [`TxSlot::complete`] is called when it finishes.
    Pending,
}

/// Outbound half of a serial port.
pub trait UartTx {
    /// Begin writing `frame`. Must not block for longer than one frame time.
    fn start_write(&mut self, frame: &[u8]) -> Result<TxStart, LinkFault>;
}

/// Transmit errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxError {
    /// T01: a frame is already in flight
    Busy,
    /// T02: frame would exceed the transmit buffer
    TooLarge { size: usize },
    /// T03: port refused the write
    Port(LinkFault),
}

impl TxError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Busy => "T01",
            Self::TooLarge { .. } => "T02",
            Self::Port(_) => "T03",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Busy => "transmitter busy",
            Self::TooLarge { .. } => "frame too large",
            Self::Port(_) => "port error",
        }
    }
}

impl core::fmt::Display for TxError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooLarge { size } => write!(f, "{}: {} ({} bytes)", self.code(), self.message(), size),
            Self::Port(fault) => write!(f, "{}: {} ({})", self.code(), self.message(), fault),
            Self::Busy => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}

/// In-flight flag, shared with the transfer-complete callback.
pub struct TxSlot {
    busy: AtomicBool,
}

impl TxSlot {
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Transfer-complete callback.
    #[inline]
    pub fn complete(&self) {
        self.busy.store(false, Ordering::Release);
    }

    /// Claim the slot; `false` if already claimed.
    #[inline]
    fn try_claim(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for TxSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds `SYNC | 4+len | tag | params` and hands it to the port.
pub struct FrameTransmitter<'a, T: UartTx> {
    port: T,
    slot: &'a TxSlot,
    stats: &'a LinkStats,
    buf: [u8; TX_BUFFER_SIZE],
}

impl<'a, T: UartTx> FrameTransmitter<'a, T> {
    pub fn new(port: T, slot: &'a TxSlot, stats: &'a LinkStats) -> Self {
        Self {
            port,
            slot,
            stats,
            buf: [0; TX_BUFFER_SIZE],
        }
    }

    /// Send one frame. Returns the number of bytes handed to the port.
    pub fn send(&mut self, tag: Tag, params: &[u8]) -> Result<usize, TxError> {
        let total = FRAME_OVERHEAD + TAG_LEN + params.len();
        if total > TX_BUFFER_SIZE {
            self.stats.record_tx_error();
            return Err(TxError::TooLarge { size: total });
        }
        if !self.slot.try_claim() {
            self.stats.record_tx_dropped();
            return Err(TxError::Busy);
        }

        self.buf[0] = SYNC_BYTE;
        self.buf[1] = (TAG_LEN + params.len()) as u8;
        self.buf[2..2 + TAG_LEN].copy_from_slice(tag.as_bytes());
        self.buf[2 + TAG_LEN..total].copy_from_slice(params);

        match self.port.start_write(&self.buf[..total]) {
            Ok(TxStart::Complete) => {
                self.slot.complete();
                self.stats.record_sent();
                Ok(total)
            }
            Ok(TxStart::Pending) => {
                self.stats.record_sent();
                Ok(total)
            }
            Err(fault) => {
                self.slot.complete();
                self.stats.record_tx_error();
                Err(TxError::Port(fault))
            }
        }
    }

    /// Tuner pitch report (`TUNE`, f32 little-endian).
    pub fn send_tuner_freq(&mut self, hz: f32) -> Result<usize, TxError> {
        self.send(Tag::new(b"TUNE"), &hz.to_le_bytes())
    }

    /// DSP load report (`LOAD`, f32 little-endian).
    pub fn send_cpu_load(&mut self, load: f32) -> Result<usize, TxError> {
        self.send(Tag::new(b"LOAD"), &load.to_le_bytes())
    }

    /// Tell the peer to empty a name list (`NAML`/`IRFL` with index 255).
    pub fn send_list_clear(&mut self, tag: Tag) -> Result<usize, TxError> {
        self.send(tag, &[LIST_CLEAR])
    }

    /// One name-list entry: `[index, name…]`, name capped at 30 bytes.
    pub fn send_list_entry(&mut self, tag: Tag, index: u8, name: &str) -> Result<usize, TxError> {
        let name = name.as_bytes();
        let len = name.len().min(MAX_LIST_NAME);
        let mut payload = [0u8; MAX_LIST_NAME + 1];
        payload[0] = index;
        payload[1..=len].copy_from_slice(&name[..len]);
        self.send(tag, &payload[..=len])
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.slot.is_busy()
    }

    pub fn port(&self) -> &T {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut T {
        &mut self.port
    }
}

/// List index meaning "clear the list".
pub const LIST_CLEAR: u8 = 255;

/// Longest name carried in a list entry.
pub const MAX_LIST_NAME: usize = 30;

#[cfg(test)]
mod tests {
    use super::*;

    struct Capture {
        frames: std::vec::Vec<std::vec::Vec<u8>>,
        mode: TxStart,
    }

    impl UartTx for Capture {
        fn start_write(&mut self, frame: &[u8]) -> Result<TxStart, LinkFault> {
            self.frames.push(frame.to_vec());
            Ok(self.mode)
        }
    }

    #[test]
    fn test_frame_layout() {
        let slot = TxSlot::new();
        let stats = LinkStats::new();
        let mut tx = FrameTransmitter::new(
            Capture { frames: vec![], mode: TxStart::Complete },
            &slot,
            &stats,
        );

        assert_eq!(tx.send(Tag::new(b"GEN "), &[80, 0, 120, 0]), Ok(10));
        assert_eq!(tx.port().frames[0], [0xAA, 8, b'G', b'E', b'N', b' ', 80, 0, 120, 0]);
    }

    #[test]
    fn test_list_entry_truncates_name() {
        let slot = TxSlot::new();
        let stats = LinkStats::new();
        let mut tx = FrameTransmitter::new(
            Capture { frames: vec![], mode: TxStart::Complete },
            &slot,
            &stats,
        );

        let long = "x".repeat(40);
        tx.send_list_entry(Tag::new(b"NAML"), 3, &long).unwrap();
        let frame = &tx.port().frames[0];
        assert_eq!(frame[1] as usize, 4 + 1 + MAX_LIST_NAME);
        assert_eq!(frame[6], 3);
    }
}
