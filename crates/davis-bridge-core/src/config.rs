//! Bridge configuration
//!
//! Loaded from an optional JSON file; every field has a default matching
//! the station's factory setup, so an empty object is a valid file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bridge::DEFAULT_INTERVAL_SECS;
use crate::protocol::DEFAULT_BAUD_RATE;

/// Errors loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Serial port parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Device path (e.g. "/dev/ttyAM1")
    pub device: String,
    /// Baud rate
    pub baud_rate: u32,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            device: "/dev/ttyAM1".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Upstream collection server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Name announced in the logon frame
    pub logon: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 10010,
            logon: "davis".to_string(),
        }
    }
}

/// Timing and retry parameters of the serial link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkTiming {
    /// Wakeup attempts before giving up
    pub wakeup_attempts: u32,
    /// Wait for the wakeup echo, in milliseconds
    pub wakeup_timeout_ms: u64,
    /// Attempts to push a command through a short write
    pub write_attempts: u32,
    /// Pause between write attempts, in milliseconds
    pub write_retry_delay_ms: u64,
    /// Wait for the first reply byte after a poll, in seconds
    pub response_timeout_secs: u64,
    /// Inter-byte timeout for scheduled polls, in milliseconds
    pub poll_byte_timeout_ms: u64,
    /// Inter-byte timeout for operator commands, in milliseconds
    pub command_byte_timeout_ms: u64,
    /// Pause after closing the port before reopening, in seconds
    pub reopen_delay_secs: u64,
    /// Pause after a failed reopen, in seconds
    pub reopen_retry_secs: u64,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            wakeup_attempts: 2,
            wakeup_timeout_ms: 1500,
            write_attempts: 10,
            write_retry_delay_ms: 1000,
            response_timeout_secs: 10,
            poll_byte_timeout_ms: 2000,
            command_byte_timeout_ms: 1000,
            reopen_delay_secs: 10,
            reopen_retry_secs: 150,
        }
    }
}

impl LinkTiming {
    /// Wakeup echo timeout
    pub fn wakeup_timeout(&self) -> Duration {
        Duration::from_millis(self.wakeup_timeout_ms)
    }

    /// Pause between write attempts
    pub fn write_retry_delay(&self) -> Duration {
        Duration::from_millis(self.write_retry_delay_ms)
    }

    /// Wait for the first reply byte
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    /// Inter-byte timeout for scheduled polls
    pub fn poll_byte_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_byte_timeout_ms)
    }

    /// Inter-byte timeout for operator commands
    pub fn command_byte_timeout(&self) -> Duration {
        Duration::from_millis(self.command_byte_timeout_ms)
    }

    /// Pause between close and reopen
    pub fn reopen_delay(&self) -> Duration {
        Duration::from_secs(self.reopen_delay_secs)
    }

    /// Pause after a failed reopen
    pub fn reopen_retry(&self) -> Duration {
        Duration::from_secs(self.reopen_retry_secs)
    }
}

/// Command channel read parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelTiming {
    /// Partial-read attempts for one frame
    pub read_attempts: u32,
    /// Wait per partial read, in milliseconds
    pub read_retry_delay_ms: u64,
}

impl Default for ChannelTiming {
    fn default() -> Self {
        Self {
            read_attempts: 3,
            read_retry_delay_ms: 1000,
        }
    }
}

impl ChannelTiming {
    /// Wait per partial read
    pub fn read_retry_delay(&self) -> Duration {
        Duration::from_millis(self.read_retry_delay_ms)
    }
}

/// Complete bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Serial port
    pub serial: SerialSettings,
    /// Upstream server; `None` runs without a server
    pub server: Option<ServerSettings>,
    /// Controller number reported in log lines and the logon frame
    pub controller_id: i32,
    /// Poll interval in seconds (0 selects the default)
    pub interval_secs: u64,
    /// Local log file
    pub log_file: PathBuf,
    /// Write the local log file at all
    pub log_enabled: bool,
    /// Hex dump written by hilow/graph/loop
    pub dump_file: PathBuf,
    /// Start with verbose tracing
    pub debug: bool,
    /// Serial link timing
    pub link: LinkTiming,
    /// Command channel timing
    pub channel: ChannelTiming,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default(),
            server: Some(ServerSettings::default()),
            controller_id: -1,
            interval_secs: 300,
            log_file: PathBuf::from("/tmp/davis.log"),
            log_enabled: true,
            dump_file: PathBuf::from("/tmp/davis.dat"),
            debug: false,
            link: LinkTiming::default(),
            channel: ChannelTiming::default(),
        }
    }
}

impl BridgeConfig {
    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse from JSON text
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Poll interval with 0 coerced to the default
    pub fn interval(&self) -> u64 {
        if self.interval_secs == 0 {
            DEFAULT_INTERVAL_SECS
        } else {
            self.interval_secs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_object_is_default() {
        let config = BridgeConfig::from_json("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = BridgeConfig::from_json(
            r#"{ "serial": { "device": "/dev/ttyUSB0" }, "controller_id": 4, "server": null }"#,
        )
        .unwrap();
        assert_eq!(config.serial.device, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 19200);
        assert_eq!(config.controller_id, 4);
        assert!(config.server.is_none());
    }

    #[test]
    fn test_zero_interval_coerced() {
        let config = BridgeConfig {
            interval_secs: 0,
            ..BridgeConfig::default()
        };
        assert_eq!(config.interval(), 600);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("davis.json");
        std::fs::write(&path, r#"{ "interval_secs": 60 }"#).unwrap();
        assert_eq!(BridgeConfig::from_file(&path).unwrap().interval(), 60);
        assert!(BridgeConfig::from_file(dir.path().join("missing.json")).is_err());
    }
}
