//! Shared fixtures for integration tests

#![allow(dead_code)]

use davis_bridge_core::protocol::{crc16, ACK};
use davis_bridge_core::realtime::LOOP_PAYLOAD_LEN;

pub use davis_bridge_core::testing::capture::LogCapture;

/// A `LOOP` payload with known field values
pub fn sample_payload() -> [u8; LOOP_PAYLOAD_LEN] {
    let mut p = [0u8; LOOP_PAYLOAD_LEN];
    p[..3].copy_from_slice(b"LOO");
    p[3] = 0x14;
    p[7..9].copy_from_slice(&29921u16.to_le_bytes());
    p[9..11].copy_from_slice(&705u16.to_le_bytes());
    p[11] = 41;
    p[12..14].copy_from_slice(&523u16.to_le_bytes());
    p[14] = 7;
    p[15] = 5;
    p[16..18].copy_from_slice(&270u16.to_le_bytes());
    p[33] = 86;
    p[41..43].copy_from_slice(&12u16.to_le_bytes());
    p[44..46].copy_from_slice(&455u16.to_le_bytes());
    p[48..50].copy_from_slice(&0x7217u16.to_le_bytes());
    p[50..52].copy_from_slice(&25u16.to_le_bytes());
    p[52..54].copy_from_slice(&310u16.to_le_bytes());
    p[54..56].copy_from_slice(&1234u16.to_le_bytes());
    p[70..74].copy_from_slice(&258u32.to_le_bytes());
    p[87..89].copy_from_slice(&840u16.to_le_bytes());
    p[91..93].copy_from_slice(&614u16.to_le_bytes());
    p[93..95].copy_from_slice(&0xFFFFu16.to_le_bytes());
    p
}

/// ACK + payload + big-endian CRC, as the console sends it
pub fn loop_reply(payload: &[u8]) -> Vec<u8> {
    let mut reply = Vec::with_capacity(payload.len() + 3);
    reply.push(ACK);
    reply.extend_from_slice(payload);
    reply.extend_from_slice(&crc16(payload).to_be_bytes());
    reply
}
