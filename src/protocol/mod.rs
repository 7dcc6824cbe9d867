//! Framed serial protocol between the front-end and the DSP module.
//!
//! ```text
//! ┌──────┬─────┬──────────┬──────────────────┐
//! │ 0xAA │ LEN │ TAG (4)  │ PARAMS (LEN - 4) │
//! └──────┴─────┴──────────┴──────────────────┘
//! ```
//!
//! - [`receiver`]: byte-driven sync/length/payload state machine
//! - [`transmitter`]: single-slot frame sender
//! - [`queue`]: lock-free packet hand-off from receive context to the controller

pub mod queue;
pub mod receiver;
pub mod transmitter;

pub use queue::{PacketQueue, SerialQueue};
pub use receiver::{FrameReceiver, RxEvent, RxState};
pub use transmitter::{FrameTransmitter, TxError, TxSlot, TxStart, UartTx};

/// Frame start marker.
pub const SYNC_BYTE: u8 = 0xAA;

/// Largest payload a length byte can announce.
pub const MAX_PAYLOAD: usize = 255;

/// Transmit buffer capacity, sync and length bytes included.
pub const TX_BUFFER_SIZE: usize = 256;

/// Tag width in bytes.
pub const TAG_LEN: usize = 4;

/// Sync + length.
pub const FRAME_OVERHEAD: usize = 2;

/// Largest parameter block a single outbound frame can carry.
pub const MAX_TX_PARAMS: usize = TX_BUFFER_SIZE - FRAME_OVERHEAD - TAG_LEN;

/// Four ASCII bytes selecting a command handler.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub [u8; TAG_LEN]);

impl Tag {
    pub const fn new(bytes: &[u8; TAG_LEN]) -> Self {
        Self(*bytes)
    }

    /// First four bytes of a payload, if present.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        let head = payload.get(..TAG_LEN)?;
        let mut bytes = [0u8; TAG_LEN];
        bytes.copy_from_slice(head);
        Some(Self(bytes))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }

    /// First two bytes, used for legacy short aliases.
    #[inline]
    pub fn prefix2(&self) -> [u8; 2] {
        [self.0[0], self.0[1]]
    }
}

impl core::fmt::Display for Tag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use core::fmt::Write;
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' };
            f.write_char(c)?;
        }
        Ok(())
    }
}

impl core::fmt::Debug for Tag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Tag(\"{}\")", self)
    }
}

/// One received payload (tag + params), copied out of the receive buffer.
#[derive(Clone, Copy)]
pub struct Packet<const CAP: usize> {
    len: u16,
    bytes: [u8; CAP],
}

impl<const CAP: usize> Packet<CAP> {
    pub const EMPTY: Self = Self { len: 0, bytes: [0; CAP] };

    /// Copy `data` into a packet; `None` if it does not fit.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        if data.len() > CAP {
            return None;
        }
        let mut packet = Self::EMPTY;
        packet.bytes[..data.len()].copy_from_slice(data);
        packet.len = data.len() as u16;
        Some(packet)
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn tag(&self) -> Option<Tag> {
        Tag::from_payload(self.as_slice())
    }
}

/// Payload received over the serial link.
pub type SerialPacket = Packet<MAX_PAYLOAD>;
