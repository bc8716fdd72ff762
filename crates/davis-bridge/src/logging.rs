//! Daemon logging
//!
//! stderr plus an optional append-mode log file, behind a filter that the
//! server can switch between `info` and `debug` at run time.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

use davis_bridge_core::bridge::LogControl;
use davis_bridge_core::config::BridgeConfig;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

fn level(verbose: bool) -> EnvFilter {
    EnvFilter::new(if verbose { "debug" } else { "info" })
}

/// Log controls handed to the bridge
pub struct DaemonLog {
    filter: reload::Handle<EnvFilter, Registry>,
    file: Option<Arc<File>>,
}

impl LogControl for DaemonLog {
    fn set_verbose(&mut self, verbose: bool) {
        if let Err(e) = self.filter.modify(|filter| *filter = level(verbose)) {
            warn!("Failed to change log level: {}", e);
        }
    }

    fn truncate(&mut self) -> io::Result<bool> {
        match &self.file {
            Some(file) => {
                file.set_len(0)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber.
///
/// A log file that cannot be opened is not fatal; the error is returned
/// alongside the controls so it can be reported upstream.
pub fn init(config: &BridgeConfig) -> (DaemonLog, Option<io::Error>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level(config.debug));
    let (filter, handle) = reload::Layer::new(filter);

    let (file, open_error) = if config.log_enabled {
        match open_log_file(&config.log_file) {
            Ok(file) => (Some(Arc::new(file)), None),
            Err(e) => (None, Some(e)),
        }
    } else {
        (None, None)
    };

    let file_layer = file
        .clone()
        .map(|file| fmt::layer().with_ansi(false).with_writer(file));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    (
        DaemonLog {
            filter: handle,
            file,
        },
        open_error,
    )
}
