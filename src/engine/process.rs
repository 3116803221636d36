//! Encoder process supervision
//!
//! Runs one encoder invocation: captures both output streams, publishes every
//! line and every progress sample, honours cancellation and removes two-pass
//! statistics files once the second pass is over.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::engine::{
    CancelHandle, EncoderCommand, EncoderEvent, PassExit, PassKind, PassResult, ProgressParser,
    ProgressSample,
};
use crate::error::{EncodeError, EncodeResult};
use crate::ports::PassRunner;

/// Default number of diagnostic lines kept per pass
pub const DEFAULT_TAIL_LINES: usize = 20;

const LINE_CHANNEL_CAPACITY: usize = 256;
const READ_CHUNK: usize = 4096;

/// Statistics file written by a first pass for `output`
pub fn pass_log_path(output: &Path) -> PathBuf {
    with_suffix(output, "-0.log")
}

/// Every file a two-pass encode of `output` leaves behind
pub fn pass_log_artifacts(output: &Path) -> [PathBuf; 2] {
    [
        pass_log_path(output),
        with_suffix(output, "-0.log.mbtree"),
    ]
}

/// Delete the two-pass statistics files. Failures are logged, never returned.
pub fn remove_pass_logs(output: &Path) {
    for artifact in pass_log_artifacts(output) {
        match std::fs::remove_file(&artifact) {
            Ok(()) => debug!("Removed pass log {}", artifact.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove pass log {}: {}", artifact.display(), e),
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Removes pass logs when dropped, on every exit path of a second pass
#[derive(Debug)]
pub struct PassLogGuard {
    output: Option<PathBuf>,
}

impl PassLogGuard {
    /// Guard for `command`; inert unless it is the second of two passes
    pub fn for_command(command: &EncoderCommand) -> Self {
        let output = match (command.pass, &command.pass_log) {
            (PassKind::Second, Some(base)) => Some(base.clone()),
            _ => None,
        };
        Self { output }
    }

    pub fn is_armed(&self) -> bool {
        self.output.is_some()
    }
}

impl Drop for PassLogGuard {
    fn drop(&mut self) {
        if let Some(output) = self.output.take() {
            remove_pass_logs(&output);
        }
    }
}

/// Launches and supervises encoder processes
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    tail_lines: usize,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self {
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }

    pub fn with_tail_lines(mut self, lines: usize) -> Self {
        self.tail_lines = lines;
        self
    }

    /// Run one invocation to exit or cancellation
    pub async fn run(
        &self,
        command: &EncoderCommand,
        cancel: &CancelHandle,
        events: &broadcast::Sender<EncoderEvent>,
    ) -> EncodeResult<PassResult> {
        let _pass_logs = PassLogGuard::for_command(command);
        let started = Instant::now();
        let mut capture = Capture::new(self.tail_lines);

        if cancel.is_cancelled() {
            debug!("Cancelled before launching {}", command.pass);
            return Ok(capture.finish(command.pass, PassExit::Cancelled, started));
        }

        info!("Launching encoder for {}", command.pass);
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EncodeError::Launch {
                program: command.program.clone(),
                source,
            })?;

        let (line_tx, mut line_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, line_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, line_tx.clone()));
        }
        drop(line_tx);

        let mut streams_open = true;
        while streams_open {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    terminate(&mut child).await;
                    return Ok(capture.finish(command.pass, PassExit::Cancelled, started));
                }
                line = line_rx.recv() => match line {
                    Some(line) => capture.record(line, events),
                    None => streams_open = false,
                },
            }
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                terminate(&mut child).await;
                return Ok(capture.finish(command.pass, PassExit::Cancelled, started));
            }
            status = child.wait() => status?,
        };

        let exit = PassExit::Code(status.code().unwrap_or(-1));
        info!("Encoder {} finished with {:?}", command.pass, exit);
        Ok(capture.finish(command.pass, exit, started))
    }
}

#[async_trait]
impl PassRunner for ProcessSupervisor {
    async fn run_pass(
        &self,
        command: &EncoderCommand,
        cancel: &CancelHandle,
        events: &broadcast::Sender<EncoderEvent>,
    ) -> EncodeResult<PassResult> {
        self.run(command, cancel, events).await
    }
}

/// Per-pass capture state: last sample and diagnostic tail
struct Capture {
    last_sample: Option<ProgressSample>,
    tail: VecDeque<String>,
    tail_lines: usize,
}

impl Capture {
    fn new(tail_lines: usize) -> Self {
        Self {
            last_sample: None,
            tail: VecDeque::with_capacity(tail_lines),
            tail_lines,
        }
    }

    fn record(&mut self, line: String, events: &broadcast::Sender<EncoderEvent>) {
        let sample = ProgressParser::parse(&line);

        if self.tail_lines > 0 {
            if self.tail.len() == self.tail_lines {
                self.tail.pop_front();
            }
            self.tail.push_back(line.clone());
        }
        // Send errors only mean nobody is listening
        let _ = events.send(EncoderEvent::Output { line });

        if let Some(sample) = sample {
            self.last_sample = Some(sample);
            let _ = events.send(EncoderEvent::Progress { sample });
        }
    }

    fn finish(self, pass: PassKind, exit: PassExit, started: Instant) -> PassResult {
        PassResult {
            pass,
            exit,
            last_sample: self.last_sample,
            elapsed: started.elapsed(),
            diagnostics: self.tail.into(),
        }
    }
}

async fn terminate(child: &mut Child) {
    info!("Terminating encoder process");
    if let Err(e) = child.start_kill() {
        debug!("Kill request failed, process likely exited: {}", e);
    }
    if let Err(e) = child.wait().await {
        warn!("Failed to reap encoder process: {}", e);
    }
}

/// Forward lines from a child stream. Both `\n` and `\r` end a line since the
/// encoder rewrites its statistics line in place with carriage returns.
async fn forward_lines<R>(mut reader: R, lines: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let read = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) => {
                debug!("Encoder output stream closed: {}", e);
                break;
            }
        };

        for &byte in &chunk[..read] {
            if byte == b'\n' || byte == b'\r' {
                if !pending.is_empty() {
                    let line = String::from_utf8_lossy(&pending).into_owned();
                    pending.clear();
                    if lines.send(line).await.is_err() {
                        return;
                    }
                }
            } else {
                pending.push(byte);
            }
        }
    }

    if !pending.is_empty() {
        let _ = lines.send(String::from_utf8_lossy(&pending).into_owned()).await;
    }
}
