//! Frame receiver integration tests

use jammate_core::config::RuntimeConfig;
use jammate_core::logging::LogStream;
use jammate_core::protocol::{FrameReceiver, RxEvent, RxState, SerialQueue};
use jammate_core::stats::{LinkFault, LinkStats};

fn frame(tag: &[u8; 4], params: &[u8]) -> Vec<u8> {
    let mut out = vec![0xAA, (4 + params.len()) as u8];
    out.extend_from_slice(tag);
    out.extend_from_slice(params);
    out
}

struct Rig {
    queue: SerialQueue,
    stats: LinkStats,
    config: RuntimeConfig,
    log: LogStream,
}

impl Rig {
    fn new() -> Self {
        Self {
            queue: SerialQueue::new(),
            stats: LinkStats::new(),
            config: RuntimeConfig::new(),
            log: LogStream::new(),
        }
    }

    fn receiver(&self) -> FrameReceiver<'_, 8> {
        FrameReceiver::new(&self.queue, &self.stats, &self.config, &self.log)
    }
}

#[test]
fn test_garbage_before_sync_is_discarded() {
    let rig = Rig::new();
    let mut rx = rig.receiver();

    assert_eq!(rx.feed(0x00, 0), RxEvent::Discarded);
    assert_eq!(rx.feed(0x55, 0), RxEvent::Discarded);
    let frames = rx.feed_slice(&frame(b"BYPS", &[1]), 0);

    assert_eq!(frames, 1);
    assert_eq!(rig.queue.pop().unwrap().as_slice(), b"BYPS\x01");
}

#[test]
fn test_back_to_back_frames() {
    let rig = Rig::new();
    let mut rx = rig.receiver();

    let mut bytes = frame(b"BYPS", &[1]);
    bytes.extend(frame(b"GEN ", &[80, 0, 120]));
    bytes.extend(frame(b"REQL", &[]));

    assert_eq!(rx.feed_slice(&bytes, 0), 3);
    assert_eq!(rig.queue.pop().unwrap().as_slice(), b"BYPS\x01");
    assert_eq!(rig.queue.pop().unwrap().as_slice(), b"GEN \x50\x00\x78");
    assert_eq!(rig.queue.pop().unwrap().as_slice(), b"REQL");
    assert!(rig.queue.pop().is_none());
    assert_eq!(rig.stats.snapshot().frames_received, 3);
}

#[test]
fn test_sync_byte_inside_payload_is_data() {
    let rig = Rig::new();
    let mut rx = rig.receiver();

    let bytes = frame(b"OVRD", &[0xAA, 0xAA, 0xAA]);
    assert_eq!(rx.feed_slice(&bytes, 0), 1);
    assert_eq!(rig.queue.pop().unwrap().as_slice(), b"OVRD\xAA\xAA\xAA");
}

#[test]
fn test_maximum_length_frame() {
    let rig = Rig::new();
    let mut rx = rig.receiver();

    let params = [7u8; 251];
    let bytes = frame(b"GNRC", &params);
    assert_eq!(bytes[1], 255);
    assert_eq!(rx.feed_slice(&bytes, 0), 1);
    assert_eq!(rig.queue.pop().unwrap().len(), 255);
}

#[test]
fn test_zero_length_then_recover() {
    let rig = Rig::new();
    let mut rx = rig.receiver();

    let mut bytes = vec![0xAA, 0x00];
    bytes.extend(frame(b"BYPS", &[0]));
    assert_eq!(rx.feed_slice(&bytes, 0), 1);

    let snap = rig.stats.snapshot();
    assert_eq!(snap.invalid_lengths, 1);
    assert_eq!(snap.frames_received, 1);
}

#[test]
fn test_short_payload_is_queued_as_is() {
    // Length smaller than a tag is the dispatcher's problem, not the framer's.
    let rig = Rig::new();
    let mut rx = rig.receiver();

    assert_eq!(rx.feed_slice(&[0xAA, 2, b'X', b'Y'], 0), 1);
    assert_eq!(rig.queue.pop().unwrap().as_slice(), b"XY");
}

#[test]
fn test_queue_full_drops_newest() {
    let rig = Rig::new();
    let mut rx = rig.receiver();

    for i in 0..8u8 {
        assert_eq!(rx.feed_slice(&frame(b"BYPS", &[i]), 0), 1);
    }
    let last = frame(b"BYPS", &[99]);
    let (head, tail) = last.split_at(last.len() - 1);
    rx.feed_slice(head, 0);
    assert_eq!(rx.feed(tail[0], 0), RxEvent::FrameDropped);

    assert_eq!(rig.stats.snapshot().queue_drops, 1);
    assert_eq!(rig.queue.pop().unwrap().as_slice(), b"BYPS\x00");
}

#[test]
fn test_driver_error_discards_partial_frame() {
    let rig = Rig::new();
    let mut rx = rig.receiver();

    rx.feed_slice(&[0xAA, 9, b'G', b'E', b'N'], 0);
    rx.on_error(LinkFault::Overrun, 1);
    assert_eq!(rx.state(), RxState::WaitSync);

    assert_eq!(rx.feed_slice(&frame(b"BYPS", &[1]), 2), 1);
    assert_eq!(rig.queue.pop().unwrap().as_slice(), b"BYPS\x01");
    assert_eq!(rig.stats.last_fault(), LinkFault::Overrun);
}

#[test]
fn test_watchdog_resets_stalled_frame_when_enabled() {
    let rig = Rig::new();
    rig.config.set_watchdog(true, 100);
    let mut rx = rig.receiver();

    rx.feed_slice(&[0xAA, 9, b'G'], 0);
    assert!(!rx.check_watchdog(50));
    assert_eq!(rx.state(), RxState::WaitPayload);

    assert!(rx.check_watchdog(101));
    assert_eq!(rx.state(), RxState::WaitSync);
    assert_eq!(rig.stats.snapshot().watchdog_resets, 1);

    // Fresh timer after the reset.
    assert!(!rx.check_watchdog(150));
}
