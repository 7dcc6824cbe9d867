//! CRC16 used by the preset binary (poly 0xA001 reflected, init 0xFFFF).
//!
//! Must match the mobile app bit for bit.

/// Polynomial 0x8005 in reflected form.
const POLY: u16 = 0xA001;

/// CRC over `data`, processing each byte LSB first.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}
