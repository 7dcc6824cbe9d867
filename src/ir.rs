//! Impulse-response upload.
//!
//! The app streams a cabinet IR as `IRLR` packets of three little-endian
//! `f32` points and closes the transfer with `IREN`. Points past
//! [`MAX_IR_POINTS`] are counted and dropped.

use heapless::Vec;

/// Longest IR the cabinet convolver accepts.
pub const MAX_IR_POINTS: usize = 8192;

/// Points carried by one `IRLR` packet.
pub const IR_POINTS_PER_PACKET: usize = 3;

/// Bytes of one `IRLR` packet after the tag.
pub const IR_PACKET_LEN: usize = IR_POINTS_PER_PACKET * 4;

/// Bounded accumulator for an IR in transit.
pub struct IrUpload {
    points: Vec<f32, MAX_IR_POINTS>,
    overflow: u32,
}

impl IrUpload {
    pub const fn new() -> Self {
        Self {
            points: Vec::new(),
            overflow: 0,
        }
    }

    /// Append one packet. Returns the number of points stored.
    pub fn push_packet(&mut self, packet: &[u8; IR_PACKET_LEN]) -> usize {
        let mut stored = 0;
        for raw in packet.chunks_exact(4) {
            let point = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            if self.points.push(point).is_ok() {
                stored += 1;
            } else {
                self.overflow += 1;
            }
        }
        stored
    }

    #[inline]
    pub fn points(&self) -> &[f32] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points dropped because the buffer was full.
    pub fn overflow(&self) -> u32 {
        self.overflow
    }

    /// Forget the current transfer.
    pub fn clear(&mut self) {
        self.points.clear();
        self.overflow = 0;
    }
}

impl Default for IrUpload {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(points: [f32; 3]) -> [u8; IR_PACKET_LEN] {
        let mut out = [0u8; IR_PACKET_LEN];
        for (dst, p) in out.chunks_exact_mut(4).zip(points) {
            dst.copy_from_slice(&p.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_points_decoded_in_order() {
        let mut ir = IrUpload::new();
        assert_eq!(ir.push_packet(&packet([1.0, -0.5, 0.25])), 3);
        assert_eq!(ir.push_packet(&packet([0.125, 0.0, -1.0])), 3);
        assert_eq!(ir.points(), &[1.0, -0.5, 0.25, 0.125, 0.0, -1.0]);
    }

    #[test]
    fn test_full_buffer_counts_overflow() {
        let mut ir = IrUpload::new();
        let p = packet([0.5; 3]);
        for _ in 0..MAX_IR_POINTS / IR_POINTS_PER_PACKET {
            ir.push_packet(&p);
        }
        // 8192 is not a multiple of 3: two slots left.
        assert_eq!(ir.push_packet(&p), 2);
        assert_eq!(ir.len(), MAX_IR_POINTS);
        assert_eq!(ir.overflow(), 1);

        ir.clear();
        assert!(ir.is_empty());
        assert_eq!(ir.overflow(), 0);
    }
}
