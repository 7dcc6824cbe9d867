//! Packet hand-off between receive context and the controller.
//!
//! The receive side (UART driver task, GATT write callback) only enqueues a
//! copy of the payload and returns; the controller drains the queue in
//! arrival order. A full queue drops the newest packet.

use core::sync::atomic::{AtomicU32, Ordering};

use heapless::mpmc::MpMcQueue;

use super::{Packet, MAX_PAYLOAD};

/// Bounded lock-free packet queue. `N` must be a power of two.
pub struct PacketQueue<const CAP: usize, const N: usize> {
    queue: MpMcQueue<Packet<CAP>, N>,
    dropped: AtomicU32,
}

/// Serial receive queue.
pub type SerialQueue = PacketQueue<MAX_PAYLOAD, 8>;

impl<const CAP: usize, const N: usize> PacketQueue<CAP, N> {
    pub const fn new() -> Self {
        Self {
            queue: MpMcQueue::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Copy `payload` into the queue.
    ///
    /// Returns `false` if the payload is too large or the queue is full.
    pub fn push(&self, payload: &[u8]) -> bool {
        match Packet::from_slice(payload) {
            Some(packet) => self.push_packet(packet),
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn push_packet(&self, packet: Packet<CAP>) -> bool {
        if self.queue.enqueue(packet).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Oldest pending packet.
    #[inline]
    pub fn pop(&self) -> Option<Packet<CAP>> {
        self.queue.dequeue()
    }

    /// Packets refused since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<const CAP: usize, const N: usize> Default for PacketQueue<CAP, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let q = PacketQueue::<16, 4>::new();
        assert!(q.push(b"GATE\x01"));
        assert!(q.push(b"BYPS\x00"));

        assert_eq!(q.pop().unwrap().as_slice(), b"GATE\x01");
        assert_eq!(q.pop().unwrap().as_slice(), b"BYPS\x00");
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let q = PacketQueue::<8, 2>::new();
        assert!(q.push(b"A"));
        assert!(q.push(b"B"));
        assert!(!q.push(b"C"));
        assert_eq!(q.dropped(), 1);
        assert_eq!(q.pop().unwrap().as_slice(), b"A");
    }

    #[test]
    fn test_oversize_rejected() {
        let q = PacketQueue::<4, 2>::new();
        assert!(!q.push(b"TOO LONG"));
        assert_eq!(q.dropped(), 1);
    }
}
