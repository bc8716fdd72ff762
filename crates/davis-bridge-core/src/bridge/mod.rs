//! Bridge loop
//!
//! A single task owns every piece of state: the device link, the command
//! channel, the connection state and the log controls. Each iteration waits
//! for whichever comes first of a command frame, stray device bytes or the
//! next poll boundary, handles it, and goes round again. Nothing is shared
//! with other tasks, so nothing is locked.

mod clock;
mod reconnect;
mod scheduler;
mod state;

use std::io;
use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::sleep_until;
use tracing::{debug, error, info, warn};

pub use clock::Clock;
pub use reconnect::{ReconnectPolicy, ReconnectReport};
pub use scheduler::{effective_interval, next_due, DEFAULT_INTERVAL_SECS};
pub use state::ConnectionState;

use crate::channel::{ChannelError, CommandChannel, ServerCommand, HELP_TEXT};
use crate::config::BridgeConfig;
use crate::dump;
use crate::protocol::{DeviceCommand, DeviceLink, RawFrame, SerialTransport};
use crate::realtime::RealtimeSample;

/// Controls over the local log exposed to server commands
pub trait LogControl {
    /// Switch verbose (debug) tracing on or off
    fn set_verbose(&mut self, verbose: bool);

    /// Empty the log file and keep writing to it. Returns `false` when no
    /// log file is open.
    fn truncate(&mut self) -> io::Result<bool>;
}

/// What woke the loop
enum Wakeup {
    PollDue,
    Header(Result<Option<usize>, ChannelError>),
    Stray(io::Result<usize>),
}

/// All state of a running bridge
pub struct BridgeContext<T: SerialTransport, S, L: LogControl> {
    /// Serial link to the station
    link: DeviceLink<T>,
    /// Server connection, if any
    channel: Option<CommandChannel<S>>,
    /// Local log controls
    log: L,
    /// Link and schedule state
    state: ConnectionState,
    /// Reopen schedule for a lost link
    policy: ReconnectPolicy,
    /// Source of Unix time
    clock: Clock,
    /// Where hilow/graph/loop dumps go
    dump_file: PathBuf,
    /// Drain stray device bytes between polls
    watch_link: bool,
}

impl<T, S, L> BridgeContext<T, S, L>
where
    T: SerialTransport,
    S: AsyncRead + AsyncWrite + Unpin,
    L: LogControl,
{
    /// Assemble a bridge from its collaborators
    pub fn new(config: &BridgeConfig, serial: T, stream: Option<S>, log: L) -> Self {
        Self::with_clock(config, serial, stream, log, Clock::system())
    }

    /// Assemble a bridge with an explicit clock
    pub fn with_clock(
        config: &BridgeConfig,
        serial: T,
        stream: Option<S>,
        log: L,
        clock: Clock,
    ) -> Self {
        Self {
            link: DeviceLink::new(serial, config.link.clone()),
            channel: stream.map(|s| CommandChannel::new(s, config.channel.clone())),
            log,
            state: ConnectionState::new(config.controller_id, config.interval(), clock.now()),
            policy: ReconnectPolicy::from_timing(&config.link),
            clock,
            dump_file: config.dump_file.clone(),
            watch_link: true,
        }
    }

    /// Connection state
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Device link
    pub fn link(&self) -> &DeviceLink<T> {
        &self.link
    }

    /// Log controls
    pub fn log(&self) -> &L {
        &self.log
    }

    /// Whether a server connection is attached
    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Send a text frame to the server, if connected
    pub async fn send_event(&mut self, text: &str) {
        if let Some(channel) = self.channel.as_mut() {
            if let Err(e) = channel.send_text(text).await {
                warn!("Failed to send event to server: {}", e);
            }
        }
    }

    /// Run until the server sends `exit`
    pub async fn run(&mut self) {
        loop {
            if self.state.poll_due(self.clock.now()) {
                self.poll().await;
                self.state.schedule_next_poll(self.clock.now());
                debug!(
                    "Sleeping {} s until next poll",
                    self.state.next_poll_due.saturating_sub(self.clock.now())
                );
                continue;
            }

            match self.wait().await {
                Wakeup::PollDue => {}
                Wakeup::Header(Ok(Some(len))) => {
                    if !self.handle_frame(len).await {
                        break;
                    }
                }
                Wakeup::Header(Ok(None)) => {}
                Wakeup::Header(Err(ChannelError::Closed)) => {
                    error!(
                        controller = self.state.controller_id,
                        "Server closed the connection, continuing without it"
                    );
                    self.channel = None;
                }
                Wakeup::Header(Err(e)) => {
                    warn!("Failed to read length from socket: {}", e);
                }
                Wakeup::Stray(Ok(n)) if n > 0 => {}
                Wakeup::Stray(result) => {
                    if let Err(e) = result {
                        debug!("Stray read failed: {}", e);
                    }
                    // Leave the port alone until the next poll
                    self.watch_link = false;
                }
            }
        }

        info!(controller = self.state.controller_id, "Shutdown requested");
        self.link.close();
    }

    /// Wait for a command frame, stray device bytes or the poll boundary
    async fn wait(&mut self) -> Wakeup {
        let deadline = self.clock.instant_at(self.state.next_poll_due);
        let Self {
            link,
            channel,
            watch_link,
            ..
        } = self;

        tokio::select! {
            biased;
            _ = sleep_until(deadline) => Wakeup::PollDue,
            header = next_header(channel) => Wakeup::Header(header),
            stray = link.discard_stray(), if *watch_link => Wakeup::Stray(stray),
        }
    }

    /// One scheduled poll: wakeup, `LOOP 1`, wait, collect, validate, forward
    pub async fn poll(&mut self) {
        self.watch_link = true;
        self.link.reset();

        // The offline warning in the reconnect policy is the only alarm a
        // failed poll raises
        if let Err(e) = self.link.wakeup().await {
            debug!("Station did not wake: {}", e);
        }

        let command = DeviceCommand::Loop;
        if let Err(e) = self.link.send_command(command.text()).await {
            debug!("Poll not sent: {}", e);
            self.policy.on_link_lost(&mut self.state, &mut self.link).await;
            return;
        }

        let wait = self.link.timing().response_timeout();
        if let Err(e) = self.link.await_response(wait).await {
            debug!("Poll unanswered: {}", e);
            self.policy.on_link_lost(&mut self.state, &mut self.link).await;
            return;
        }
        self.policy.on_data(&mut self.state);

        let idle = self.link.timing().poll_byte_timeout();
        let count = self.link.read_tolerant(command.reply_len(), idle).await;
        let packet = match RawFrame::from_reply(command, &self.link.buffer()[..count])
            .and_then(|frame| frame.validate().passed())
        {
            Ok(packet) => packet,
            Err(e) => {
                debug!("{}", e);
                return;
            }
        };

        match self.channel.as_mut() {
            Some(channel) => match channel.send_realtime(packet.payload()).await {
                Ok(n) => debug!("Davis realtime: sent {} bytes", n),
                Err(e) => warn!("Failed to forward realtime data: {}", e),
            },
            None => debug!("No server, realtime data not forwarded"),
        }

        match RealtimeSample::decode(packet.payload()) {
            Ok(sample) => debug!("{}", sample.summary()),
            Err(e) => debug!("{}", e),
        }
    }

    /// Read and act on one frame. Returns false when the bridge should stop.
    async fn handle_frame(&mut self, len: usize) -> bool {
        let Some(channel) = self.channel.as_mut() else {
            return true;
        };
        match channel.read_payload(len).await {
            Ok(payload) => self.dispatch(ServerCommand::parse(&payload)).await,
            Err(e) => {
                warn!(controller = self.state.controller_id, "{}", e);
                true
            }
        }
    }

    /// Act on a server command. Returns false only for `exit`.
    pub async fn dispatch(&mut self, command: ServerCommand) -> bool {
        match &command {
            ServerCommand::Exit | ServerCommand::Ok => {}
            ServerCommand::Truncate => match self.log.truncate() {
                Ok(true) => info!("Truncated log file"),
                Ok(false) => info!("Log file not truncated as it is not open"),
                Err(e) => warn!("Failed to truncate log file: {}", e),
            },
            ServerCommand::Debug(on) => self.log.set_verbose(*on),
            ServerCommand::Help => info!("{}", HELP_TEXT),
            ServerCommand::HiLow => self.query_and_dump(DeviceCommand::HiLows).await,
            ServerCommand::Graph => self.query_and_dump(DeviceCommand::GetEeprom).await,
            ServerCommand::Loop => self.query_and_dump(DeviceCommand::Loop).await,
            ServerCommand::Interval(secs) => {
                let secs = self.state.set_interval(*secs, self.clock.now());
                info!("Interval set to {} seconds", secs);
            }
            ServerCommand::Unknown(text) => {
                // Logged locally only; echoing it to the server could loop
                info!("Unknown message from server: {}", text);
            }
        }
        command.keeps_running()
    }

    /// Operator query: the reply goes to the dump file, not the server
    async fn query_and_dump(&mut self, command: DeviceCommand) {
        self.link.reset();
        if let Err(e) = self.link.wakeup().await {
            debug!("Station did not wake: {}", e);
        }
        if let Err(e) = self.link.send_command(command.text()).await {
            warn!(controller = self.state.controller_id, "{}", e);
            return;
        }

        let idle = self.link.timing().command_byte_timeout();
        let count = self.link.read_tolerant(command.reply_len(), idle).await;
        let frame = match RawFrame::from_reply(command, &self.link.buffer()[..count]) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("{}: {}", command.name(), e);
                return;
            }
        };

        if command == DeviceCommand::Loop {
            match frame.clone().validate().passed() {
                Ok(packet) => match RealtimeSample::decode(packet.payload()) {
                    Ok(sample) => info!("{}", sample.summary()),
                    Err(e) => warn!("loop: {}", e),
                },
                Err(e) => warn!("loop: {}", e),
            }
        }

        match dump::write_dump(&self.dump_file, frame.as_bytes()) {
            Ok(()) => info!("{}: written file {}", command.name(), self.dump_file.display()),
            Err(e) => warn!("Failed to open {}: {}", self.dump_file.display(), e),
        }
    }
}

async fn next_header<S: AsyncRead + AsyncWrite + Unpin>(
    channel: &mut Option<CommandChannel<S>>,
) -> Result<Option<usize>, ChannelError> {
    match channel {
        Some(channel) => channel.poll_header().await,
        None => std::future::pending().await,
    }
}
