//! Station commands
//!
//! Defines the textual commands the bridge sends to the console and the
//! size of the binary reply each one produces.

use serde::{Deserialize, Serialize};

/// Commands issued to the weather station console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceCommand {
    /// One real-time sample (`LOOP 1`)
    Loop,

    /// Daily/monthly/yearly highs and lows (`HILOWS`)
    HiLows,

    /// Full EEPROM image including graph data (`GETEE`)
    GetEeprom,
}

impl DeviceCommand {
    /// Command text including the terminating newline
    pub fn text(&self) -> &'static str {
        match self {
            DeviceCommand::Loop => "LOOP 1\n",
            DeviceCommand::HiLows => "HILOWS\n",
            DeviceCommand::GetEeprom => "GETEE\n",
        }
    }

    /// Number of bytes to collect for the reply, including the ACK byte
    pub fn reply_len(&self) -> usize {
        match self {
            DeviceCommand::Loop => 100,
            DeviceCommand::HiLows => 438,
            DeviceCommand::GetEeprom => 4098,
        }
    }

    /// Length of the frame handed to the decoder or dump
    pub fn frame_len(&self) -> usize {
        match self {
            DeviceCommand::Loop => 99,
            DeviceCommand::HiLows => 436,
            DeviceCommand::GetEeprom => 4098,
        }
    }

    /// Whether the reply starts with an ACK byte that must be checked and stripped
    pub fn expects_ack(&self) -> bool {
        matches!(self, DeviceCommand::Loop)
    }

    /// Name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            DeviceCommand::Loop => "loop",
            DeviceCommand::HiLows => "hilow",
            DeviceCommand::GetEeprom => "graph",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_text_is_newline_terminated() {
        for cmd in [DeviceCommand::Loop, DeviceCommand::HiLows, DeviceCommand::GetEeprom] {
            assert!(cmd.text().ends_with('\n'));
        }
    }

    #[test]
    fn test_frame_fits_reply() {
        for cmd in [DeviceCommand::Loop, DeviceCommand::HiLows, DeviceCommand::GetEeprom] {
            assert!(cmd.frame_len() <= cmd.reply_len());
            assert!(cmd.reply_len() <= crate::protocol::MAX_PACKET_SIZE);
        }
    }
}
