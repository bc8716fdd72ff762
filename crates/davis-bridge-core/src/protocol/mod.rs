//! Davis Serial Protocol
//!
//! Implements the textual command protocol spoken by Davis Vantage stations:
//! newline wakeup, `LOOP`/`HILOWS`/`GETEE` commands and fixed-size binary
//! replies protected by a CCITT CRC-16.

pub mod commands;
mod crc;
mod error;
mod link;
mod packet;
pub mod serial;

pub use commands::DeviceCommand;
pub use crc::{crc16, crc_ok};
pub use error::{FrameError, LinkError};
pub use link::DeviceLink;
pub use packet::{read_u16_le, read_u32_le, read_u8, RawFrame, ValidatedPacket, Verdict};
pub use serial::{list_ports, SerialPortTransport, SerialTransport};

/// Fixed line speed of the station console
pub const DEFAULT_BAUD_RATE: u32 = 19200;

/// Acknowledgement byte that prefixes replies to binary commands
pub const ACK: u8 = 0x06;

/// Size of the accumulation buffer; longer than any station reply
pub const MAX_PACKET_SIZE: usize = 4100;
