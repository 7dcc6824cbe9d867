//! Global log stream instances.
//!
//! One stream per execution context so a burst of receive errors cannot
//! starve the controller's own diagnostics.

use crate::logging::LogStream;

/// Receive context: UART driver task and BLE write callbacks.
pub static RX_LOG_STREAM: LogStream = LogStream::new();

/// Controller main loop: dispatch, preset I/O, pending loads.
pub static MAIN_LOG_STREAM: LogStream = LogStream::new();
