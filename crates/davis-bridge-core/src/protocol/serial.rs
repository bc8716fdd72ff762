//! Serial port handling
//!
//! The bridge talks to the console through the [`SerialTransport`] seam so
//! the link logic can be driven by scripted transports in tests.
//! [`SerialPortTransport`] is the production implementation on top of
//! `tokio-serial`, fixed at 8N1 without flow control.

use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use super::LinkError;
use crate::config::SerialSettings;

/// Byte transport to the station console
///
/// All calls are made from the single bridge task, so implementations need
/// not be `Send`.
#[allow(async_fn_in_trait)]
pub trait SerialTransport {
    /// Read up to `buf.len()` bytes. `Ok(0)` means the port reported
    /// readiness but had nothing to give.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write some prefix of `bytes`, returning how many were accepted
    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Close and open the port again with the same parameters
    async fn reopen(&mut self) -> Result<(), LinkError>;

    /// Close the port
    fn close(&mut self);

    /// Device name for log lines
    fn name(&self) -> &str;
}

/// Serial port opened through `tokio-serial`
pub struct SerialPortTransport {
    settings: SerialSettings,
    stream: Option<SerialStream>,
}

impl SerialPortTransport {
    /// Open the configured port
    pub fn open(settings: &SerialSettings) -> Result<Self, LinkError> {
        let stream = open_stream(settings)?;
        Ok(Self {
            settings: settings.clone(),
            stream: Some(stream),
        })
    }

    fn stream(&mut self) -> io::Result<&mut SerialStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, LinkError::NotOpen))
    }
}

fn open_stream(settings: &SerialSettings) -> Result<SerialStream, LinkError> {
    let stream = tokio_serial::new(&settings.device, settings.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()?;
    Ok(stream)
}

impl SerialTransport for SerialPortTransport {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream()?.read(buf).await
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.stream()?.write(bytes).await
    }

    async fn reopen(&mut self) -> Result<(), LinkError> {
        self.close();
        self.stream = Some(open_stream(&self.settings)?);
        Ok(())
    }

    fn close(&mut self) {
        self.stream = None;
    }

    fn name(&self) -> &str {
        &self.settings.device
    }
}

/// Helper used to sort port names so that:
///  - on-board UARTs (ttyAM*, ttyS*) come first (sorted numerically by suffix)
///  - then USB adapters (ttyUSB*, ttyACM*)
///  - then other ports (sorted by name)
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    for (rank, prefix) in [(0, "ttyAM"), (0, "ttyS"), (1, "ttyUSB"), (1, "ttyACM")] {
        if let Some(rest) = basename.strip_prefix(prefix) {
            let num = rest.parse::<usize>().unwrap_or(usize::MAX);
            return (rank, num, basename.to_string());
        }
    }
    (2, 0, basename.to_string())
}

/// List serial ports known to the OS, in deterministic order
pub fn list_ports() -> Vec<String> {
    let mut names: Vec<String> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|info| info.port_name)
        .collect();
    names.sort_by_key(|name| port_sort_key(name));
    names.dedup();
    names
}
