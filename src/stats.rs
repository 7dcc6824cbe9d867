//! Link health counters.
//!
//! Transport faults are never fatal: the receiver resets to hunting for the
//! next sync byte and the fault is only counted here. The counters are
//! process-wide atomics so the receive task, the transmit path and the
//! controller can all update them without coordination.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Reason for the most recent receive-side reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkFault {
    /// No fault recorded.
    #[default]
    None = 0,
    /// Stop bit missing.
    Framing = 1,
    Parity = 2,
    /// Driver FIFO overflowed; bytes were lost.
    Overrun = 3,
    Noise = 4,
    /// Driver call returned an error.
    Driver = 5,
    /// No byte received within the watchdog timeout.
    Watchdog = 6,
}

impl LinkFault {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => LinkFault::Framing,
            2 => LinkFault::Parity,
            3 => LinkFault::Overrun,
            4 => LinkFault::Noise,
            5 => LinkFault::Driver,
            6 => LinkFault::Watchdog,
            _ => LinkFault::None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::None => "L00",
            Self::Framing => "L01",
            Self::Parity => "L02",
            Self::Overrun => "L03",
            Self::Noise => "L04",
            Self::Driver => "L05",
            Self::Watchdog => "L06",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::None => "no fault",
            Self::Framing => "framing error",
            Self::Parity => "parity error",
            Self::Overrun => "receive overrun",
            Self::Noise => "line noise",
            Self::Driver => "driver error",
            Self::Watchdog => "receive watchdog expired",
        }
    }
}

impl core::fmt::Display for LinkFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Thread-safe link statistics.
///
/// ```ignore
/// static STATS: LinkStats = LinkStats::new();
///
/// // receive task
/// STATS.record_fault(LinkFault::Overrun);
///
/// // diagnostics
/// let s = STATS.snapshot();
/// ```
pub struct LinkStats {
    frames_received: AtomicU32,
    /// Transport errors (framing, parity, overrun, noise, driver).
    rx_errors: AtomicU32,
    invalid_lengths: AtomicU32,
    /// Complete frames discarded because the packet queue was full.
    queue_drops: AtomicU32,
    watchdog_resets: AtomicU32,
    last_fault: AtomicU8,

    packets_sent: AtomicU32,
    /// Sends refused because a frame was already in flight.
    packets_dropped: AtomicU32,
    /// Sends refused for size or failed in the port.
    tx_errors: AtomicU32,

    commands_applied: AtomicU32,
    unknown_tags: AtomicU32,
    rejected_commands: AtomicU32,
    /// Parameter updates lost because the DSP queue was full.
    param_drops: AtomicU32,
}

impl LinkStats {
    pub const fn new() -> Self {
        Self {
            frames_received: AtomicU32::new(0),
            rx_errors: AtomicU32::new(0),
            invalid_lengths: AtomicU32::new(0),
            queue_drops: AtomicU32::new(0),
            watchdog_resets: AtomicU32::new(0),
            last_fault: AtomicU8::new(LinkFault::None as u8),
            packets_sent: AtomicU32::new(0),
            packets_dropped: AtomicU32::new(0),
            tx_errors: AtomicU32::new(0),
            commands_applied: AtomicU32::new(0),
            unknown_tags: AtomicU32::new(0),
            rejected_commands: AtomicU32::new(0),
            param_drops: AtomicU32::new(0),
        }
    }

    /// Count a transport error and remember its kind.
    #[inline]
    pub fn record_fault(&self, fault: LinkFault) {
        self.last_fault.store(fault as u8, Ordering::Release);
        if fault == LinkFault::Watchdog {
            self.watchdog_resets.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rx_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_invalid_length(&self) {
        self.invalid_lengths.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_queue_drop(&self) {
        self.queue_drops.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_tx_dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_tx_error(&self) {
        self.tx_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_applied(&self) {
        self.commands_applied.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unknown_tag(&self) {
        self.unknown_tags.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.rejected_commands.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_param_drop(&self) {
        self.param_drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Kind of the most recent transport fault.
    #[inline]
    pub fn last_fault(&self) -> LinkFault {
        LinkFault::from_u8(self.last_fault.load(Ordering::Acquire))
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> LinkSnapshot {
        LinkSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            rx_errors: self.rx_errors.load(Ordering::Relaxed),
            invalid_lengths: self.invalid_lengths.load(Ordering::Relaxed),
            queue_drops: self.queue_drops.load(Ordering::Relaxed),
            watchdog_resets: self.watchdog_resets.load(Ordering::Relaxed),
            last_fault: self.last_fault(),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
            commands_applied: self.commands_applied.load(Ordering::Relaxed),
            unknown_tags: self.unknown_tags.load(Ordering::Relaxed),
            rejected_commands: self.rejected_commands.load(Ordering::Relaxed),
            param_drops: self.param_drops.load(Ordering::Relaxed),
        }
    }
}

impl Default for LinkStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of link statistics at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub frames_received: u32,
    pub rx_errors: u32,
    pub invalid_lengths: u32,
    pub queue_drops: u32,
    pub watchdog_resets: u32,
    pub last_fault: LinkFault,
    pub packets_sent: u32,
    pub packets_dropped: u32,
    pub tx_errors: u32,
    pub commands_applied: u32,
    pub unknown_tags: u32,
    pub rejected_commands: u32,
    pub param_drops: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_recording() {
        let stats = LinkStats::new();
        assert_eq!(stats.last_fault(), LinkFault::None);

        stats.record_fault(LinkFault::Parity);
        stats.record_fault(LinkFault::Overrun);

        let snap = stats.snapshot();
        assert_eq!(snap.rx_errors, 2);
        assert_eq!(snap.last_fault, LinkFault::Overrun);
        assert_eq!(snap.watchdog_resets, 0);
    }

    #[test]
    fn test_watchdog_counted_separately() {
        let stats = LinkStats::new();
        stats.record_fault(LinkFault::Watchdog);

        let snap = stats.snapshot();
        assert_eq!(snap.watchdog_resets, 1);
        assert_eq!(snap.rx_errors, 0);
        assert_eq!(snap.last_fault, LinkFault::Watchdog);
    }

    #[test]
    fn test_fault_roundtrip_and_display() {
        for raw in 0..=6u8 {
            assert_eq!(LinkFault::from_u8(raw) as u8, raw);
        }
        assert_eq!(LinkFault::from_u8(200), LinkFault::None);

        let text = format!("{}", LinkFault::Framing);
        assert_eq!(text, "L01: framing error");
    }
}
