//! # Davis Bridge Core Library
//!
//! Protocol and reliability engine for the Davis weather station bridge.
//!
//! This library provides:
//! - The Davis serial protocol (wakeup, textual commands, tolerant reads)
//! - CCITT CRC-16 validation of fixed-size device packets
//! - Real-time packet decoding and hex dumps of archive blocks
//! - The length-framed command channel to the collection server
//! - The bridge loop with aligned poll scheduling and link reconnection
//!
//! ## Example
//!
//! ```rust,ignore
//! use davis_bridge_core::{bridge::BridgeContext, config::BridgeConfig};
//! use davis_bridge_core::protocol::SerialPortTransport;
//!
//! let config = BridgeConfig::default();
//! let serial = SerialPortTransport::open(&config.serial)?;
//! let mut bridge = BridgeContext::new(&config, serial, Some(stream), log_control);
//! bridge.run().await;
//! ```

#![warn(missing_docs)]

pub mod bridge;
pub mod channel;
pub mod config;
pub mod dump;
pub mod protocol;
pub mod realtime;
pub mod retry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bridge::{BridgeContext, ConnectionState, LogControl};
    pub use crate::channel::{CommandChannel, ServerCommand};
    pub use crate::config::BridgeConfig;
    pub use crate::protocol::{DeviceCommand, DeviceLink, LinkError, SerialTransport};
    pub use crate::realtime::RealtimeSample;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
