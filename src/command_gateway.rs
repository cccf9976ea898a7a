//! Restricted execution of version-control commands.
//!
//! A command line is accepted only when it starts with the literal
//! `"git "`. It is then split into an argument vector and the `git` binary is
//! started directly, without a shell, so `;`, `&&`, `|` and friends reach git
//! as plain arguments instead of chaining further commands.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use wait_timeout::ChildExt;

use crate::app_response::AppResponse;

pub const DEFAULT_PROGRAM: &str = "git";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const EMPTY_OUTPUT_PLACEHOLDER: &str = "Command executed successfully.";
pub const EMPTY_ERROR_PLACEHOLDER: &str = "Unknown error";

/// Terminal state of one `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayStatus {
    Succeeded,
    Failed,
    TimedOut,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResult {
    pub success: bool,
    pub status: GatewayStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GatewayResult {
    fn succeeded(output: String, message: &str) -> Self {
        Self {
            success: true,
            status: GatewayStatus::Succeeded,
            message: message.to_string(),
            output: Some(output),
            error: None,
        }
    }

    fn failed(status: GatewayStatus, message: String, error: Option<String>) -> Self {
        Self {
            success: false,
            status,
            message,
            output: None,
            error,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            warn!("Error serializing gateway result: {e}");
            serde_json::json!({"success": false, "message": format!("Error: {e}")}).to_string()
        })
    }
}

/// Status message reported for a successful command of the given type.
pub fn success_message(command_type: &str) -> &'static str {
    match command_type {
        "status" => "Git status retrieved successfully",
        "add" => "Files staged successfully",
        "commit" => "Changes committed successfully",
        "push" => "Changes pushed to GitHub successfully",
        "workflow" => "Workflow command executed successfully",
        "quick" => "Quick command executed successfully",
        _ => "Command executed successfully",
    }
}

struct Completed {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

#[derive(Debug, Clone)]
pub struct CommandGateway {
    program: String,
    working_dir: PathBuf,
    timeout: Duration,
}

impl CommandGateway {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            working_dir: working_dir.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the single program the gateway allows. The command line must
    /// then start with `"<program> "`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn execute(&self, command_line: &str, command_type: &str) -> GatewayResult {
        let args = match self.validate(command_line) {
            Ok(args) => args,
            Err(rejection) => {
                warn!("Rejected command {command_line:?}: {rejection}");
                return GatewayResult::failed(GatewayStatus::Rejected, rejection.message().to_string(), None);
            }
        };

        match self.run(&args) {
            Ok(done) if done.status.success() => {
                let output = non_empty_or(done.stdout.trim(), EMPTY_OUTPUT_PLACEHOLDER);
                info!("Command {command_line:?} succeeded");
                GatewayResult::succeeded(output, success_message(command_type))
            }
            Ok(done) => {
                let error = non_empty_or(done.stderr.trim(), EMPTY_ERROR_PLACEHOLDER);
                warn!("Command {command_line:?} exited with {}: {error}", done.status);
                GatewayResult::failed(GatewayStatus::Failed, format!("Command failed: {error}"), Some(error))
            }
            Err(AppResponse::TimedOut(error)) => {
                warn!("Command {command_line:?} timed out");
                GatewayResult::failed(
                    GatewayStatus::TimedOut,
                    "Command took too long".to_string(),
                    Some(error),
                )
            }
            Err(e) => {
                let error = e.message().to_string();
                warn!("Command {command_line:?} could not run: {error}");
                GatewayResult::failed(
                    GatewayStatus::Failed,
                    format!("Unexpected error: {error}"),
                    Some(error),
                )
            }
        }
    }

    /// Checks the allow-list prefix and splits the line into arguments,
    /// dropping the program name itself.
    fn validate(&self, command_line: &str) -> Result<Vec<String>, AppResponse> {
        if command_line.is_empty() {
            return Err(AppResponse::Rejected("No command specified".to_string()));
        }
        if !command_line.starts_with(&format!("{} ", self.program)) {
            return Err(AppResponse::Rejected(format!(
                "Only {} commands are allowed",
                self.program
            )));
        }

        let mut words = shlex::split(command_line)
            .ok_or_else(|| AppResponse::Rejected("Malformed command line".to_string()))?;
        if words.first().map(String::as_str) != Some(self.program.as_str()) {
            return Err(AppResponse::Rejected(format!(
                "Only {} commands are allowed",
                self.program
            )));
        }
        words.remove(0);
        Ok(words)
    }

    fn run(&self, args: &[String]) -> Result<Completed, AppResponse> {
        let deadline = Instant::now() + self.timeout;
        let mut child = Command::new(&self.program)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AppResponse::ExecutionFailed(e.to_string()))?;

        // Pipes are drained on their own threads so a chatty command cannot
        // fill the pipe buffer and stall before the deadline.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => Ok(Completed {
                status,
                stdout: collect(stdout, deadline),
                stderr: collect(stderr, deadline),
            }),
            Ok(None) => {
                terminate(&mut child);
                Err(AppResponse::TimedOut(format!(
                    "Command timed out ({})",
                    describe_duration(self.timeout)
                )))
            }
            Err(e) => {
                terminate(&mut child);
                Err(AppResponse::ExecutionFailed(e.to_string()))
            }
        }
    }
}

/// Output of one pipe, filled by a reader thread until the pipe closes.
struct Drain {
    buffer: Arc<Mutex<Vec<u8>>>,
    closed: Receiver<()>,
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Option<Drain> {
    stream.map(|mut stream| {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (closed_tx, closed) = mpsc::channel();
        let sink = Arc::clone(&buffer);
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) => break,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(_) => break,
                    Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
                }
            }
            let _ = closed_tx.send(());
        });
        Drain { buffer, closed }
    })
}

/// Waits for the pipe to close, but not past `deadline`. A process that
/// outlives the command and keeps the pipe open only costs its own output.
fn collect(drain: Option<Drain>, deadline: Instant) -> String {
    let Some(drain) = drain else {
        return String::new();
    };
    let remaining = deadline.saturating_duration_since(Instant::now());
    if let Err(RecvTimeoutError::Timeout) = drain.closed.recv_timeout(remaining) {
        warn!("Command output still open at the deadline, keeping what was read");
    }
    let bytes = drain.buffer.lock();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Kills and reaps the child. Reader threads are left to finish on their own
/// once the pipes close.
fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!("Failed to kill timed out command: {e}");
    }
    let _ = child.wait();
}

fn describe_duration(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{} seconds", duration.as_secs())
    } else {
        format!("{} ms", duration.as_millis())
    }
}

fn non_empty_or(text: &str, placeholder: &str) -> String {
    if text.is_empty() {
        placeholder.to_string()
    } else {
        text.to_string()
    }
}
