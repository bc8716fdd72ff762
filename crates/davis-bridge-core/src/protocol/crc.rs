//! CCITT CRC-16
//!
//! The station uses the CCITT polynomial (0x1021) with a zero seed and no
//! reflection, which is the XMODEM parameter set. The CRC is appended to
//! each packet most significant byte first, so running the checksum over
//! payload and CRC together leaves a zero remainder for a good packet.

use crc::{Crc, CRC_16_XMODEM};

/// Table-driven engine (256-entry lookup table built at compile time)
const CCITT: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Calculate the CCITT CRC-16 of a byte span
pub fn crc16(bytes: &[u8]) -> u16 {
    CCITT.checksum(bytes)
}

/// Check a span that ends with its own big-endian CRC
pub fn crc_ok(frame: &[u8]) -> bool {
    crc16(frame) == 0
}
