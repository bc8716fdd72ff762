//! Davis weather station bridge daemon
//!
//! Usage: `davis-bridge [config.json]`

mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use davis_bridge_core::bridge::BridgeContext;
use davis_bridge_core::channel::{encode_frame, ChannelError};
use davis_bridge_core::config::{BridgeConfig, ServerSettings};
use davis_bridge_core::protocol::{list_ports, LinkError, SerialPortTransport};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{error, info};

/// Failures that stop the daemon before the bridge starts
#[derive(Error, Debug)]
enum StartupError {
    #[error("Failed to open {device}: {source}")]
    SerialOpen { device: String, source: LinkError },

    #[error("Failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    #[error("Failed to send logon: {0}")]
    Logon(#[from] ChannelError),
}

fn load_config() -> Result<BridgeConfig> {
    match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => BridgeConfig::from_file(&path)
            .with_context(|| format!("Loading configuration from {}", path.display())),
        None => Ok(BridgeConfig::default()),
    }
}

async fn connect(server: &ServerSettings, controller_id: i32) -> Result<TcpStream, StartupError> {
    let connect_error = |source| StartupError::Connect {
        host: server.host.clone(),
        port: server.port,
        source,
    };
    let mut stream = TcpStream::connect((server.host.as_str(), server.port))
        .await
        .map_err(connect_error)?;

    let logon = format!(
        "logon {} {} {}",
        server.logon,
        davis_bridge_core::VERSION,
        controller_id
    );
    let frame = encode_frame(logon.as_bytes())?;
    stream.write_all(&frame).await.map_err(connect_error)?;
    info!("Connected to {}:{}", server.host, server.port);
    Ok(stream)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = load_config()?;
    let (log, log_failure) = logging::init(&config);

    info!(
        "STARTED {} as {} interval {}{}",
        config.serial.device,
        config.controller_id,
        config.interval(),
        if config.log_enabled { "" } else { " nolog" }
    );

    let serial = match SerialPortTransport::open(&config.serial) {
        Ok(serial) => serial,
        Err(source) => {
            error!("FATAL: Failed to open {}: {}", config.serial.device, source);
            let ports = list_ports();
            if !ports.is_empty() {
                error!("Available ports: {}", ports.join(", "));
            }
            return Err(StartupError::SerialOpen {
                device: config.serial.device.clone(),
                source,
            }
            .into());
        }
    };

    let stream = match &config.server {
        Some(server) => Some(connect(server, config.controller_id).await?),
        None => None,
    };

    let mut bridge = BridgeContext::new(&config, serial, stream, log);

    if let Some(e) = log_failure {
        error!("Could not open log file {}: {}", config.log_file.display(), e);
        let event = format!(
            "event WARN Davis {} could not open logfile {}: {}",
            config.controller_id,
            config.log_file.display(),
            e
        );
        bridge.send_event(&event).await;
    }

    bridge.run().await;
    Ok(())
}
