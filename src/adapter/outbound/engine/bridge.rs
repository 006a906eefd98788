//! Out-of-process execution path.
//!
//! [`EngineBridge`] launches the engine binary with piped stdio, writes one
//! submission per line to its stdin and reads status lines from its stdout on
//! a background task. Updates are forwarded to the supervisor over a channel;
//! the bridge keeps no per-transaction state.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::protocol::{EngineCommand, EngineMessage, NoUpdate};
use crate::domain::{ExecutionRoute, SubmitParams, TransactionId};
use crate::error::{EngineError, Result};
use crate::infrastructure::config::EngineConfig;
use crate::port::{Dispatched, ExecutionPath, TransactionUpdate};

/// Lifecycle of the engine process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotStarted,
    Running,
    Stopped,
    Crashed,
}

impl EngineState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Crashed => "crashed",
        }
    }
}

/// Handle to a running engine process.
pub struct EngineBridge {
    state: Arc<Mutex<EngineState>>,
    stdin: AsyncMutex<Option<ChildStdin>>,
    child: AsyncMutex<Option<Child>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    grace: Duration,
}

impl EngineBridge {
    /// Launch the engine and start reading its output.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] when the binary cannot be
    /// launched, for example because it does not exist.
    pub fn spawn(
        config: &EngineConfig,
        updates: mpsc::UnboundedSender<TransactionUpdate>,
    ) -> std::result::Result<Self, EngineError> {
        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Unavailable(format!("{}: {e}", config.path.display())))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(EngineError::Unavailable(
                "engine stdio was not captured".to_string(),
            ));
        };
        let stderr = child.stderr.take();

        let state = Arc::new(Mutex::new(EngineState::Running));
        let mut tasks = vec![tokio::spawn(read_stdout(
            BufReader::new(stdout),
            updates,
            Arc::clone(&state),
        ))];
        if let Some(stderr) = stderr {
            tasks.push(tokio::spawn(forward_stderr(BufReader::new(stderr))));
        }

        info!(
            path = %config.path.display(),
            pid = child.id(),
            "Execution engine started"
        );
        Ok(Self {
            state,
            stdin: AsyncMutex::new(Some(stdin)),
            child: AsyncMutex::new(Some(child)),
            tasks: Mutex::new(tasks),
            grace: config.shutdown_grace(),
        })
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    /// Ask the engine to exit, killing it after the grace period.
    ///
    /// Closes stdin, sends `SIGTERM` on unix, waits up to the configured
    /// grace period and then force-kills. Calling it again is a no-op.
    pub async fn stop(&self) {
        *self.state.lock() = EngineState::Stopped;
        drop(self.stdin.lock().await.take());

        let child = self.child.lock().await.take();
        let Some(mut child) = child else {
            return;
        };

        if let Some(pid) = child.id() {
            terminate(pid);
        }

        match tokio::time::timeout(self.grace, child.wait()).await {
            Ok(Ok(status)) => info!(%status, "Execution engine exited"),
            Ok(Err(e)) => warn!(error = %e, "Failed to wait for execution engine"),
            Err(_) => {
                warn!(
                    grace_secs = self.grace.as_secs(),
                    "Execution engine ignored termination, killing"
                );
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill execution engine");
                }
            }
        }

        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }

    async fn write_line(&self, line: &str) -> std::result::Result<(), EngineError> {
        let mut stdin = self.stdin.lock().await;
        let Some(pipe) = stdin.as_mut() else {
            return Err(EngineError::Unavailable("engine stdin is closed".to_string()));
        };
        let written = async {
            pipe.write_all(line.as_bytes()).await?;
            pipe.flush().await
        }
        .await;
        if let Err(e) = written {
            stdin.take();
            let mut state = self.state.lock();
            if *state == EngineState::Running {
                *state = EngineState::Crashed;
            }
            warn!(error = %e, "Execution engine stdin broke, marking crashed");
            return Err(EngineError::Io(e));
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionPath for EngineBridge {
    fn route(&self) -> ExecutionRoute {
        ExecutionRoute::Engine
    }

    fn is_available(&self) -> bool {
        self.state() == EngineState::Running
    }

    async fn dispatch(&self, id: &TransactionId, params: &SubmitParams) -> Result<Dispatched> {
        if !self.is_available() {
            let state = self.state().as_str();
            return Err(EngineError::Unavailable(format!("engine is {state}")).into());
        }
        let line = EngineCommand::SubmitTransaction { id, params }.to_line()?;
        self.write_line(&line).await?;
        debug!(tx_id = %id, "Transaction handed to execution engine");
        Ok(Dispatched::Awaiting)
    }
}

#[cfg(unix)]
fn terminate(pid: u32) {
    if let Ok(pid) = libc::pid_t::try_from(pid) {
        // SAFETY: plain kill(2) on the pid of a child we have not reaped.
        unsafe {
            libc::kill(pid, libc::SIGTERM);
        }
    }
}

/// No graceful signal off unix; the grace period ends in a kill.
#[cfg(not(unix))]
fn terminate(_pid: u32) {}

/// Forward updates until stdout closes; a close while running is a crash.
async fn read_stdout<R>(
    reader: BufReader<R>,
    updates: mpsc::UnboundedSender<TransactionUpdate>,
    state: Arc<Mutex<EngineState>>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => handle_line(&line, &updates),
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read from execution engine");
                break;
            }
        }
    }

    let mut state = state.lock();
    if *state == EngineState::Running {
        *state = EngineState::Crashed;
        warn!("Execution engine exited unexpectedly, new transactions use the direct path");
    } else {
        debug!("Execution engine output closed");
    }
}

fn handle_line(line: &str, updates: &mpsc::UnboundedSender<TransactionUpdate>) {
    if line.trim().is_empty() {
        return;
    }
    let message = match EngineMessage::parse(line) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, line, "Ignoring malformed engine message");
            return;
        }
    };
    match message.into_update() {
        Ok(update) => {
            if updates.send(update).is_err() {
                debug!("Supervisor gone, dropping engine update");
            }
        }
        Err(NoUpdate::Status(status)) => {
            debug!(status = status.as_deref().unwrap_or("-"), "Engine status");
        }
        Err(NoUpdate::EngineError(error)) => {
            warn!(error = %error, "Execution engine reported an error");
        }
        Err(NoUpdate::MissingSignature(id)) => {
            warn!(tx_id = %id, "Ignoring success update without a signature");
        }
    }
}

async fn forward_stderr<R>(reader: BufReader<R>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        warn!(target: "switchyard::engine", "{line}");
    }
}
