//! Log drain.
//!
//! Empties the receive and controller log streams into a text sink. On the
//! board the sink is a TX-only UART on a spare pin.
//!
//! ```text
//! RX_LOG_STREAM ───┐
//!                  ├──▶ drain_once ──▶ "[   1234567] WARN rx: message\n" ──▶ UART
//! MAIN_LOG_STREAM ─┘
//! ```
//!
//! Receive-context entries are drained first.

use core::fmt::Write;

use crate::logging::{LogEntry, LogStream};

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::gpio;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::peripheral::Peripheral;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::uart::{self, UartTxDriver};

/// Interval between drop reports.
pub const DROP_REPORT_INTERVAL_US: i64 = 10_000_000;

/// UART configuration for logging.
pub struct UartLoggerConfig {
    pub baud_rate: u32,
    pub tx_pin: u8,
}

impl Default for UartLoggerConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            tx_pin: 43,
        }
    }
}

/// Write one entry as `[timestamp_us] LEVEL source: message`.
pub fn write_entry<W: Write>(out: &mut W, source: &str, entry: &LogEntry) -> core::fmt::Result {
    writeln!(
        out,
        "[{:10}] {} {}: {}",
        entry.timestamp_us,
        entry.level.as_str(),
        source,
        entry.text()
    )
}

/// Drains named log streams into a sink.
pub struct LogDrain<'a> {
    streams: [(&'static str, &'a LogStream); 2],
    last_report_us: i64,
}

impl<'a> LogDrain<'a> {
    pub fn new(rx: &'a LogStream, main: &'a LogStream) -> Self {
        Self {
            streams: [("rx", rx), ("main", main)],
            last_report_us: 0,
        }
    }

    /// Write every queued entry. Returns the number written.
    pub fn drain_once<W: Write>(&mut self, out: &mut W, now_us: i64) -> usize {
        let mut written = 0;
        for (source, stream) in self.streams.iter() {
            while let Some(entry) = stream.drain() {
                let _ = write_entry(out, source, &entry);
                written += 1;
            }
        }

        if now_us - self.last_report_us >= DROP_REPORT_INTERVAL_US {
            self.last_report_us = now_us;
            let rx = self.streams[0].1.take_dropped();
            let main = self.streams[1].1.take_dropped();
            if rx > 0 || main > 0 {
                let _ = writeln!(out, "[{:10}] WARN log: dropped rx={} main={}", now_us, rx, main);
            }
        }
        written
    }
}

/// `core::fmt::Write` over the logging UART.
#[cfg(target_os = "espidf")]
pub struct UartSink<'d>(pub UartTxDriver<'d>);

#[cfg(target_os = "espidf")]
impl Write for UartSink<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.0.write(s.as_bytes()).map(|_| ()).map_err(|_| core::fmt::Error)
    }
}

/// UART1 TX-only for log output.
#[cfg(target_os = "espidf")]
pub fn init_uart_logger<'d>(
    uart: impl Peripheral<P = esp_idf_svc::hal::uart::UART1> + 'd,
    tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
    config: &UartLoggerConfig,
) -> Result<UartSink<'d>, esp_idf_svc::sys::EspError> {
    let uart_config =
        uart::config::Config::default().baudrate(esp_idf_svc::hal::units::Hertz(config.baud_rate));

    UartTxDriver::new(
        uart,
        tx_pin,
        Option::<gpio::AnyIOPin>::None,
        Option::<gpio::AnyIOPin>::None,
        &uart_config,
    )
    .map(UartSink)
}

/// Log task body. Never returns.
#[cfg(target_os = "espidf")]
pub fn uart_logger_task(sink: &mut UartSink<'_>) -> ! {
    use crate::log_globals::{MAIN_LOG_STREAM, RX_LOG_STREAM};

    let mut drain = LogDrain::new(&RX_LOG_STREAM, &MAIN_LOG_STREAM);
    loop {
        let now = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        if drain.drain_once(sink, now) == 0 {
            unsafe {
                esp_idf_svc::sys::vTaskDelay(10);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;

    #[test]
    fn test_entry_format() {
        let entry = LogEntry::new(1_234_567, LogLevel::Warn, b"unknown tag 'ABCD'");
        let mut out: heapless::String<128> = heapless::String::new();
        write_entry(&mut out, "main", &entry).unwrap();
        assert_eq!(out.as_str(), "[   1234567] WARN main: unknown tag 'ABCD'\n");
    }

    #[test]
    fn test_rx_stream_drained_first() {
        let rx: LogStream = LogStream::new();
        let main: LogStream = LogStream::new();
        main.push(2, LogLevel::Info, b"second");
        rx.push(1, LogLevel::Info, b"first");

        let mut drain = LogDrain::new(&rx, &main);
        let mut out: heapless::String<256> = heapless::String::new();
        assert_eq!(drain.drain_once(&mut out, 1), 2);
        let first = out.find("first").unwrap();
        let second = out.find("second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_drop_report_resets_counter() {
        let rx: LogStream = LogStream::new();
        let main: LogStream = LogStream::new();
        for _ in 0..crate::logging::LOG_QUEUE_DEPTH + 3 {
            rx.push(0, LogLevel::Info, b"x");
        }
        let dropped = rx.dropped();
        assert!(dropped >= 3);

        let mut drain = LogDrain::new(&rx, &main);
        let mut sink: heapless::String<8192> = heapless::String::new();
        drain.drain_once(&mut sink, DROP_REPORT_INTERVAL_US);
        let expected: heapless::String<32> = {
            let mut s = heapless::String::new();
            write!(s, "dropped rx={} main=0", dropped).unwrap();
            s
        };
        assert!(sink.contains(expected.as_str()));
        assert_eq!(rx.dropped(), 0);
    }
}
