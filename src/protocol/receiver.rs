//! Receive-side frame state machine.
//!
//! ```text
//!            0xAA              len 1..=255          len bytes
//! WaitSync ────────▶ WaitLen ─────────────▶ WaitPayload ─────────▶ WaitSync
//!    ▲  │ other         │ len 0                                    (packet queued)
//!    └──┘               └────────▶ WaitSync
//! ```
//!
//! Once a length is accepted the receiver commits to it: a sync byte inside
//! the payload is stored as data. Completed payloads are copied onto a
//! [`PacketQueue`] and the machine is immediately ready for the next sync
//! byte, so reception never waits for dispatch.

use crate::config::RuntimeConfig;
use crate::logging::{ms_to_us, LogStream};
use crate::stats::{LinkFault, LinkStats};
use crate::{log_trace, log_warn};

use super::{PacketQueue, MAX_PAYLOAD, SYNC_BYTE};

/// Receiver state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RxState {
    WaitSync,
    WaitLen,
    WaitPayload,
}

/// What a single byte did to the receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RxEvent {
    /// Byte consumed, no frame boundary.
    Consumed,
    /// Non-sync byte discarded while hunting.
    Discarded,
    /// Length byte of zero; back to hunting.
    InvalidLength,
    /// Frame complete and queued for the controller.
    FrameQueued,
    /// Frame complete but the queue was full.
    FrameDropped,
}

/// Byte-driven frame receiver.
///
/// Owned by the receive task. Everything it shares with the rest of the
/// system (queue, counters, config, log) is borrowed.
pub struct FrameReceiver<'a, const N: usize> {
    queue: &'a PacketQueue<MAX_PAYLOAD, N>,
    stats: &'a LinkStats,
    config: &'a RuntimeConfig,
    log: &'a LogStream,
    state: RxState,
    expected: usize,
    received: usize,
    buf: [u8; MAX_PAYLOAD],
    last_byte_ms: u64,
}

impl<'a, const N: usize> FrameReceiver<'a, N> {
    pub fn new(
        queue: &'a PacketQueue<MAX_PAYLOAD, N>,
        stats: &'a LinkStats,
        config: &'a RuntimeConfig,
        log: &'a LogStream,
    ) -> Self {
        Self {
            queue,
            stats,
            config,
            log,
            state: RxState::WaitSync,
            expected: 0,
            received: 0,
            buf: [0; MAX_PAYLOAD],
            last_byte_ms: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Payload bytes collected for the frame in progress.
    #[inline]
    pub fn pending_bytes(&self) -> usize {
        self.received
    }

    /// Feed one received byte.
    pub fn feed(&mut self, byte: u8, now_ms: u64) -> RxEvent {
        self.last_byte_ms = now_ms;

        match self.state {
            RxState::WaitSync => {
                if byte == SYNC_BYTE {
                    self.state = RxState::WaitLen;
                    RxEvent::Consumed
                } else {
                    RxEvent::Discarded
                }
            }
            RxState::WaitLen => {
                if byte == 0 {
                    self.stats.record_invalid_length();
                    log_trace!(self.log, ms_to_us(now_ms), "rx: zero length, resync");
                    self.reset();
                    return RxEvent::InvalidLength;
                }
                self.expected = byte as usize;
                self.received = 0;
                self.state = RxState::WaitPayload;
                RxEvent::Consumed
            }
            RxState::WaitPayload => {
                self.buf[self.received] = byte;
                self.received += 1;
                if self.received < self.expected {
                    return RxEvent::Consumed;
                }
                self.complete(now_ms)
            }
        }
    }

    /// Feed a chunk delivered by the driver. Returns the number of frames queued.
    pub fn feed_slice(&mut self, bytes: &[u8], now_ms: u64) -> usize {
        bytes
            .iter()
            .filter(|&&b| self.feed(b, now_ms) == RxEvent::FrameQueued)
            .count()
    }

    /// Report a transport error from the driver. The frame in progress is lost.
    pub fn on_error(&mut self, fault: LinkFault, now_ms: u64) {
        self.stats.record_fault(fault);
        log_warn!(self.log, ms_to_us(now_ms), "rx: {} in {:?}, resync", fault, self.state);
        self.reset();
    }

    /// True when no byte has arrived for longer than the configured timeout.
    pub fn watchdog_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_byte_ms) > u64::from(self.config.watchdog_timeout_ms())
    }

    /// Apply the watchdog policy.
    ///
    /// Returns `true` if the receiver was force-reset; the caller may then
    /// reinitialize the driver. Does nothing while the policy is disabled.
    pub fn check_watchdog(&mut self, now_ms: u64) -> bool {
        if !self.config.watchdog_enabled() || !self.watchdog_expired(now_ms) {
            return false;
        }
        self.stats.record_fault(LinkFault::Watchdog);
        log_warn!(
            self.log,
            ms_to_us(now_ms),
            "rx: idle {} ms, watchdog reset",
            now_ms.saturating_sub(self.last_byte_ms)
        );
        self.reset();
        self.last_byte_ms = now_ms;
        true
    }

    /// Drop any partial frame and hunt for the next sync byte.
    pub fn reset(&mut self) {
        self.state = RxState::WaitSync;
        self.expected = 0;
        self.received = 0;
    }

    fn complete(&mut self, now_ms: u64) -> RxEvent {
        let len = self.expected;
        self.reset();

        self.stats.record_frame();
        if self.queue.push(&self.buf[..len]) {
            RxEvent::FrameQueued
        } else {
            self.stats.record_queue_drop();
            log_warn!(self.log, ms_to_us(now_ms), "rx: queue full, frame dropped");
            RxEvent::FrameDropped
        }
    }
}
