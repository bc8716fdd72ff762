//! Scripted collaborators for tests
//!
//! [`ScriptedSerial`] replays a fixed sequence of reads with optional
//! delays, and records everything written to it. Delays are measured on the
//! tokio clock, so tests run them in paused virtual time.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

use crate::bridge::LogControl;
use crate::protocol::{LinkError, SerialTransport};

/// One scripted read event
#[derive(Debug, Clone)]
pub enum Step {
    /// Bytes available to read (handed out in as many reads as needed)
    Bytes(Vec<u8>),
    /// Nothing arrives for this long
    Delay(Duration),
    /// Resolved form of `Delay`, kept across cancelled reads
    Until(Instant),
    /// A read that reports readiness but yields zero bytes
    Eof,
    /// A read that fails
    Error(io::ErrorKind),
}

impl Step {
    /// Bytes step from a slice
    pub fn bytes(data: &[u8]) -> Self {
        Step::Bytes(data.to_vec())
    }

    /// Delay step
    pub fn delay(d: Duration) -> Self {
        Step::Delay(d)
    }
}

/// Serial transport driven by a script
#[derive(Debug, Default)]
pub struct ScriptedSerial {
    steps: VecDeque<Step>,
    written: Vec<u8>,
    write_limits: VecDeque<usize>,
    write_calls: usize,
    reopen_failures: u32,
    reopen_calls: usize,
    close_calls: usize,
    /// Bytes of the command currently being written
    current: Vec<u8>,
    /// Replies queued for each command text, consumed on write
    replies: Vec<(Vec<u8>, VecDeque<Vec<Step>>)>,
}

impl ScriptedSerial {
    /// Transport that replays `steps`; reads block forever afterwards
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            ..Self::default()
        }
    }

    /// Accept at most these many bytes on successive writes
    pub fn limit_writes(&mut self, limits: Vec<usize>) {
        self.write_limits = limits.into();
    }

    /// Fail the next `n` reopen attempts
    pub fn fail_reopens(&mut self, n: u32) {
        self.reopen_failures = n;
    }

    /// Queue `steps` to be appended each time `command` is written
    pub fn on_command(&mut self, command: &str, steps: Vec<Step>) {
        let key = command.as_bytes().to_vec();
        match self.replies.iter_mut().find(|(k, _)| *k == key) {
            Some((_, queue)) => queue.push_back(steps),
            None => self.replies.push((key, VecDeque::from([steps]))),
        }
    }

    /// Everything written so far
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Number of write calls
    pub fn write_calls(&self) -> usize {
        self.write_calls
    }

    /// Number of reopen calls
    pub fn reopen_calls(&self) -> usize {
        self.reopen_calls
    }

    /// Number of close calls (including those made by reopen)
    pub fn close_calls(&self) -> usize {
        self.close_calls
    }

    /// Bytes still queued in the script
    pub fn unread(&self) -> usize {
        self.steps
            .iter()
            .map(|s| match s {
                Step::Bytes(b) => b.len(),
                _ => 0,
            })
            .sum()
    }
}

impl SerialTransport for ScriptedSerial {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.steps.front_mut() {
                None => std::future::pending::<()>().await,
                Some(Step::Delay(d)) => {
                    let until = Instant::now() + *d;
                    self.steps[0] = Step::Until(until);
                }
                Some(Step::Until(until)) => {
                    sleep_until(*until).await;
                    self.steps.pop_front();
                }
                Some(Step::Eof) => {
                    self.steps.pop_front();
                    return Ok(0);
                }
                Some(Step::Error(kind)) => {
                    let kind = *kind;
                    self.steps.pop_front();
                    return Err(io::Error::new(kind, "scripted read failure"));
                }
                Some(Step::Bytes(data)) => {
                    let n = buf.len().min(data.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    data.drain(..n);
                    if data.is_empty() {
                        self.steps.pop_front();
                    }
                    if n > 0 {
                        return Ok(n);
                    }
                }
            }
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.write_calls += 1;
        let n = match self.write_limits.pop_front() {
            Some(limit) => limit.min(bytes.len()),
            None => bytes.len(),
        };
        self.written.extend_from_slice(&bytes[..n]);
        self.current.extend_from_slice(&bytes[..n]);

        if n == bytes.len() {
            let command = std::mem::take(&mut self.current);
            if let Some((_, queue)) = self.replies.iter_mut().find(|(key, _)| *key == command) {
                if let Some(steps) = queue.pop_front() {
                    self.steps.extend(steps);
                }
            }
        }
        Ok(n)
    }

    async fn reopen(&mut self) -> Result<(), LinkError> {
        self.reopen_calls += 1;
        self.close_calls += 1;
        if self.reopen_failures > 0 {
            self.reopen_failures -= 1;
            return Err(LinkError::SerialError("No such file or directory".to_string()));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.close_calls += 1;
    }

    fn name(&self) -> &str {
        "/dev/scripted"
    }
}

/// [`LogControl`] that records what it was asked to do
#[derive(Debug, Clone, Default)]
pub struct RecordingLog {
    /// Last verbosity requested
    pub verbose: Option<bool>,
    /// Number of truncations
    pub truncations: usize,
    /// Whether a log file is open
    pub file_open: bool,
}

impl LogControl for RecordingLog {
    fn set_verbose(&mut self, verbose: bool) {
        self.verbose = Some(verbose);
    }

    fn truncate(&mut self) -> io::Result<bool> {
        if self.file_open {
            self.truncations += 1;
        }
        Ok(self.file_open)
    }
}

pub mod capture {
    //! In-memory `tracing` output for log assertions

    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    use tracing::subscriber::DefaultGuard;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Ok(mut inner) = self.0.lock() {
                inner.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Buffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Captures INFO and above for the current thread while alive
    pub struct LogCapture {
        buffer: Buffer,
        _guard: DefaultGuard,
    }

    impl LogCapture {
        /// Route this thread's events into a fresh buffer
        pub fn install() -> Self {
            let buffer = Buffer::default();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(buffer.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::INFO)
                .finish();
            Self {
                _guard: tracing::subscriber::set_default(subscriber),
                buffer,
            }
        }

        /// Everything captured so far
        pub fn text(&self) -> String {
            self.buffer
                .0
                .lock()
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .unwrap_or_default()
        }

        /// Lines containing `needle`
        pub fn count(&self, needle: &str) -> usize {
            self.text().lines().filter(|l| l.contains(needle)).count()
        }

        /// Lines logged at WARN
        pub fn warnings(&self) -> usize {
            self.count(" WARN ")
        }
    }
}
