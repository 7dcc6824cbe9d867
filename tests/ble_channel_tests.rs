//! BLE channel integration tests

use std::cell::RefCell;

use embedded_hal::delay::DelayNs;

use jammate_core::ble::{BleChannel, BleError, BleLink, GattServer, MAX_VALUE_LEN, PRESET_ACK, READY_VALUE};
use jammate_core::config::RuntimeConfig;

#[derive(Default)]
struct MockGatt {
    value: Vec<u8>,
    notified: Vec<Vec<u8>>,
    advertising_starts: usize,
    fail_notify: bool,
}

impl GattServer for MockGatt {
    fn set_value(&mut self, value: &[u8]) -> Result<(), BleError> {
        self.value = value.to_vec();
        Ok(())
    }

    fn notify(&mut self, value: &[u8]) -> Result<(), BleError> {
        if self.fail_notify {
            return Err(BleError::Stack);
        }
        self.value = value.to_vec();
        self.notified.push(value.to_vec());
        Ok(())
    }

    fn start_advertising(&mut self) -> Result<(), BleError> {
        self.advertising_starts += 1;
        Ok(())
    }
}

/// Records requested pauses instead of sleeping.
struct MockDelay<'a>(&'a RefCell<Vec<u32>>);

impl DelayNs for MockDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().push(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().push(ms);
    }
}

#[test]
fn test_begin_publishes_ready_value() {
    let link = BleLink::new();
    let config = RuntimeConfig::new();
    let pauses = RefCell::new(Vec::new());
    let mut ble = BleChannel::new(&link, &config, MockGatt::default(), MockDelay(&pauses));

    ble.begin().unwrap();
    assert_eq!(ble.gatt().value, READY_VALUE);
    assert_eq!(ble.gatt().advertising_starts, 1);
}

#[test]
fn test_send_requires_connection() {
    let link = BleLink::new();
    let config = RuntimeConfig::new();
    let pauses = RefCell::new(Vec::new());
    let mut ble = BleChannel::new(&link, &config, MockGatt::default(), MockDelay(&pauses));

    assert_eq!(ble.send(b"hello"), Ok(0));
    assert!(ble.gatt().notified.is_empty());

    link.on_connect();
    assert_eq!(ble.send(b"hello"), Ok(5));
    assert_eq!(ble.send_ack(), Ok(1));
    assert_eq!(ble.gatt().notified, vec![b"hello".to_vec(), vec![PRESET_ACK]]);
}

#[test]
fn test_empty_send_touches_nothing() {
    let link = BleLink::new();
    let config = RuntimeConfig::new();
    let pauses = RefCell::new(Vec::new());
    let mut ble = BleChannel::new(&link, &config, MockGatt::default(), MockDelay(&pauses));
    link.on_connect();
    ble.begin().unwrap();

    assert_eq!(ble.send(&[]), Ok(0));
    assert!(ble.gatt().notified.is_empty());
    assert_eq!(ble.gatt().value, READY_VALUE);
}

#[test]
fn test_oversized_single_send_rejected() {
    let link = BleLink::new();
    let config = RuntimeConfig::new();
    let pauses = RefCell::new(Vec::new());
    let mut ble = BleChannel::new(&link, &config, MockGatt::default(), MockDelay(&pauses));
    link.on_connect();

    let big = vec![0u8; MAX_VALUE_LEN + 1];
    assert_eq!(ble.send(&big), Err(BleError::TooLarge { size: MAX_VALUE_LEN + 1 }));
}

#[test]
fn test_chunked_send_pauses_between_chunks() {
    let link = BleLink::new();
    let config = RuntimeConfig::new();
    let pauses = RefCell::new(Vec::new());
    let mut ble = BleChannel::new(&link, &config, MockGatt::default(), MockDelay(&pauses));
    link.on_connect();

    let data: Vec<u8> = (0..1100u32).map(|i| i as u8).collect();
    assert_eq!(ble.send_chunked(&data, 500), Ok(3));

    let sizes: Vec<usize> = ble.gatt().notified.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![500, 500, 100]);
    assert_eq!(ble.gatt().notified.concat(), data);
    assert_eq!(*pauses.borrow(), vec![20, 20]);

    assert_eq!(ble.send_chunked(&data, 0), Err(BleError::BadChunkSize));
}

#[test]
fn test_large_send_uses_default_chunk() {
    let link = BleLink::new();
    let config = RuntimeConfig::new();
    let pauses = RefCell::new(Vec::new());
    let mut ble = BleChannel::new(&link, &config, MockGatt::default(), MockDelay(&pauses));
    link.on_connect();

    assert_eq!(ble.send_large(&[1u8; 1024]), Ok(2));
    assert_eq!(ble.send_large(&[]), Ok(0));
}

#[test]
fn test_stack_failure_propagates() {
    let link = BleLink::new();
    let config = RuntimeConfig::new();
    let pauses = RefCell::new(Vec::new());
    let gatt = MockGatt {
        fail_notify: true,
        ..Default::default()
    };
    let mut ble = BleChannel::new(&link, &config, gatt, MockDelay(&pauses));
    link.on_connect();

    assert_eq!(ble.send(b"x"), Err(BleError::Stack));
    assert_eq!(ble.send_chunked(b"xyz", 1), Err(BleError::Stack));
}

#[test]
fn test_readvertise_after_disconnect_delay() {
    let link = BleLink::new();
    let config = RuntimeConfig::new();
    let pauses = RefCell::new(Vec::new());
    let mut ble = BleChannel::new(&link, &config, MockGatt::default(), MockDelay(&pauses));

    link.on_connect();
    link.on_disconnect(10_000);
    assert!(!ble.is_connected());

    assert_eq!(ble.poll(10_050), Ok(false));
    assert_eq!(ble.poll(10_100), Ok(true));
    assert_eq!(ble.poll(10_200), Ok(false));
    assert_eq!(ble.gatt().advertising_starts, 1);
}

#[test]
fn test_writes_queue_for_controller() {
    let link = BleLink::new();
    assert!(link.on_write(b"BYPS\x01"));
    assert!(link.on_write(&[0u8; MAX_VALUE_LEN]));
    assert!(!link.on_write(&[0u8; MAX_VALUE_LEN + 1]));

    assert_eq!(link.queue().pop().unwrap().as_slice(), b"BYPS\x01");
    assert_eq!(link.queue().pop().unwrap().len(), MAX_VALUE_LEN);
    assert!(link.queue().pop().is_none());
}
