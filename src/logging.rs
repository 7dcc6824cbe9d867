//! Non-blocking logging for the control core.
//!
//! ```text
//! receiver / dispatcher       LogStream              log drain task
//! ─────────────────────       ─────────              ──────────────
//!
//! log_warn!() ─────────────▶ [E0][E1][E2] ─────────▶ UART TX
//! stack-formatted             lock-free queue        blocking ok
//! never blocks                drops when full
//! ```
//!
//! Producers format into a stack buffer and enqueue a fixed-size [`LogEntry`].
//! Nothing on the receive or dispatch path ever waits on the log sink: when
//! the queue is full the entry is discarded and counted.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use heapless::mpmc::MpMcQueue;

/// Maximum message length.
pub const MAX_MSG_LEN: usize = 120;

/// Queue depth per stream (power of two, at most 128).
pub const LOG_QUEUE_DEPTH: usize = 64;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Convert to string for output.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Convert from raw u8 value, saturating at `Trace`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// A single log entry.
#[derive(Clone, Copy)]
pub struct LogEntry {
    /// Timestamp in microseconds.
    pub timestamp_us: i64,
    pub level: LogLevel,
    /// Message length.
    pub len: u8,
    /// Message bytes (not null-terminated).
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    /// Build an entry, truncating `msg` to [`MAX_MSG_LEN`].
    pub fn new(timestamp_us: i64, level: LogLevel, msg: &[u8]) -> Self {
        let len = msg.len().min(MAX_MSG_LEN);
        let mut entry = Self {
            timestamp_us,
            level,
            len: len as u8,
            msg: [0; MAX_MSG_LEN],
        };
        entry.msg[..len].copy_from_slice(&msg[..len]);
        entry
    }

    /// Message text, or a placeholder if the bytes are not UTF-8.
    pub fn text(&self) -> &str {
        core::str::from_utf8(&self.msg[..self.len as usize]).unwrap_or("<invalid utf8>")
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::new(0, LogLevel::Info, &[])
    }
}

/// Lock-free log stream.
///
/// Any number of producers may push concurrently; the drain side is expected
/// to be a single low-priority task. Entries above the stream's level are
/// filtered before formatting by the logging macros.
pub struct LogStream<const N: usize = LOG_QUEUE_DEPTH> {
    queue: MpMcQueue<LogEntry, N>,
    dropped: AtomicU32,
    max_level: AtomicU8,
}

impl<const N: usize> LogStream<N> {
    /// Create a new empty log stream at `Info` level.
    pub const fn new() -> Self {
        Self {
            queue: MpMcQueue::new(),
            dropped: AtomicU32::new(0),
            max_level: AtomicU8::new(LogLevel::Info as u8),
        }
    }

    /// True if entries at `level` are currently recorded.
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level as u8 <= self.max_level.load(Ordering::Relaxed)
    }

    /// Change the most verbose level that is recorded.
    pub fn set_level(&self, level: LogLevel) {
        self.max_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.max_level.load(Ordering::Relaxed))
    }

    /// Push a log entry without blocking.
    ///
    /// Returns `true` if the entry was queued, `false` if it was filtered out
    /// or dropped because the queue is full.
    #[inline]
    pub fn push(&self, timestamp_us: i64, level: LogLevel, msg: &[u8]) -> bool {
        if !self.enabled(level) {
            return false;
        }
        match self.queue.enqueue(LogEntry::new(timestamp_us, level, msg)) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Take the oldest queued entry.
    #[inline]
    pub fn drain(&self) -> Option<LogEntry> {
        self.queue.dequeue()
    }

    /// Number of entries dropped since the last [`take_dropped`](Self::take_dropped).
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Read and reset the drop counter (e.g. after reporting).
    #[inline]
    pub fn take_dropped(&self) -> u32 {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Millisecond control-plane time to a log timestamp.
#[inline]
pub fn ms_to_us(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX).saturating_mul(1000)
}

/// Format a message into a buffer, truncating on overflow.
///
/// Returns the number of bytes written.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    use core::fmt::Write;

    struct BufWriter<'a> {
        buf: &'a mut [u8],
        pos: usize,
    }

    impl Write for BufWriter<'_> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            let bytes = s.as_bytes();
            let remaining = self.buf.len() - self.pos;
            let to_write = bytes.len().min(remaining);
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
            Ok(())
        }
    }

    let mut writer = BufWriter { buf, pos: 0 };
    let _ = core::fmt::write(&mut writer, args);
    writer.pos
}

/// Non-blocking log macro.
///
/// ```ignore
/// jm_log!(LogLevel::Warn, self.log, now_us, "unknown tag {}", tag);
/// ```
#[macro_export]
macro_rules! jm_log {
    ($level:expr, $stream:expr, $timestamp:expr, $($arg:tt)*) => {{
        let stream = &$stream;
        if stream.enabled($level) {
            let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
            let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
            stream.push($timestamp, $level, &buf[..len]);
        }
    }};
}

#[macro_export]
macro_rules! log_error {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::jm_log!($crate::logging::LogLevel::Error, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::jm_log!($crate::logging::LogLevel::Warn, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::jm_log!($crate::logging::LogLevel::Info, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::jm_log!($crate::logging::LogLevel::Debug, $stream, $timestamp, $($arg)*)
    };
}

/// Maximum verbosity; per-byte transport tracing lives here.
#[macro_export]
macro_rules! log_trace {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::jm_log!($crate::logging::LogLevel::Trace, $stream, $timestamp, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_stream_basic() {
        let stream = LogStream::<16>::new();

        assert!(stream.push(1000, LogLevel::Info, b"frame ok"));

        let entry = stream.drain().unwrap();
        assert_eq!(entry.timestamp_us, 1000);
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.text(), "frame ok");

        assert!(stream.drain().is_none());
    }

    #[test]
    fn test_log_stream_full_counts_drops() {
        let stream = LogStream::<4>::new();

        for i in 0..4 {
            assert!(stream.push(i, LogLevel::Warn, b"x"));
        }
        assert!(!stream.push(5, LogLevel::Warn, b"overflow"));
        assert_eq!(stream.dropped(), 1);

        stream.drain();
        assert!(stream.push(6, LogLevel::Warn, b"fits again"));
        assert_eq!(stream.take_dropped(), 1);
        assert_eq!(stream.dropped(), 0);
    }

    #[test]
    fn test_level_filter() {
        let stream = LogStream::<8>::new();

        assert!(!stream.push(0, LogLevel::Debug, b"hidden"));
        assert_eq!(stream.dropped(), 0, "filtered entries are not drops");

        stream.set_level(LogLevel::Trace);
        assert!(stream.push(0, LogLevel::Debug, b"visible"));
        assert_eq!(stream.level(), LogLevel::Trace);
    }

    #[test]
    fn test_macro_formats_and_truncates() {
        let stream = LogStream::<8>::new();
        crate::log_warn!(stream, 7, "tag {} len {}", "OVRD", 13);
        let entry = stream.drain().unwrap();
        assert_eq!(entry.text(), "tag OVRD len 13");

        let long = [b'a'; 200];
        stream.push(0, LogLevel::Error, &long);
        assert_eq!(stream.drain().unwrap().len as usize, MAX_MSG_LEN);
    }

    #[test]
    fn test_format_to_buffer() {
        let mut buf = [0u8; 8];
        let len = format_to_buffer(&mut buf, format_args!("crc {:04X}", 0xBEEFu16));
        assert_eq!(&buf[..len], b"crc BEEF");
    }

    #[test]
    fn test_concurrent_producers() {
        use std::sync::Arc;
        use std::thread;

        let stream = Arc::new(LogStream::<128>::new());
        let mut handles = vec![];

        for i in 0..4 {
            let stream = Arc::clone(&stream);
            handles.push(thread::spawn(move || {
                for j in 0..20 {
                    let msg = format!("producer {} msg {}", i, j);
                    stream.push(j, LogLevel::Info, msg.as_bytes());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let mut count = 0;
        while stream.drain().is_some() {
            count += 1;
        }
        assert_eq!(count, 80);
    }
}
