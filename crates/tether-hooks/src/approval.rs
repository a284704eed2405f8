//! Human-in-the-loop approval for mutating actions.
//!
//! The pipeline suspends on [`ApprovalGate::request_approval`] and resumes
//! with exactly one [`Decision`]. Anything other than `Approved` halts the
//! call with a `Rejected` rejection.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tether_core::{ApprovalMode, TetherConfig};

pub const CHOICE_APPROVE: &str = "Approve";
pub const CHOICE_REJECT: &str = "Reject";

/// What the human is asked about.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    pub tool_name: String,
    pub target: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
    Cancelled,
}

#[async_trait::async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn request_approval(&self, request: &ApprovalRequest) -> Decision;
}

/// Approves everything (non-interactive runs).
pub struct AutoApprove;

#[async_trait::async_trait]
impl ApprovalGate for AutoApprove {
    async fn request_approval(&self, _request: &ApprovalRequest) -> Decision {
        Decision::Approved
    }
}

/// Rejects everything (read-only runs).
pub struct DenyAll;

#[async_trait::async_trait]
impl ApprovalGate for DenyAll {
    async fn request_approval(&self, _request: &ApprovalRequest) -> Decision {
        Decision::Rejected
    }
}

/// Hands out queued decisions and records every request (for testing).
/// An exhausted queue answers `Cancelled`.
pub struct ScriptedApproval {
    decisions: Mutex<VecDeque<Decision>>,
    requests: Mutex<Vec<ApprovalRequest>>,
}

impl ScriptedApproval {
    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ApprovalRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ApprovalGate for ScriptedApproval {
    async fn request_approval(&self, request: &ApprovalRequest) -> Decision {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.decisions
            .lock()
            .ok()
            .and_then(|mut d| d.pop_front())
            .unwrap_or(Decision::Cancelled)
    }
}

/// Runs a shell command; exit status 0 approves, any other status rejects.
///
/// The command sees `TETHER_APPROVAL_PROMPT`, `TETHER_APPROVAL_TARGET` and
/// `TETHER_APPROVAL_TOOL` in its environment.
pub struct CommandApproval {
    command: String,
}

impl CommandApproval {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait::async_trait]
impl ApprovalGate for CommandApproval {
    async fn request_approval(&self, request: &ApprovalRequest) -> Decision {
        #[cfg(windows)]
        let mut cmd = {
            let mut c = tokio::process::Command::new("cmd");
            c.arg("/C").arg(&self.command);
            c
        };
        #[cfg(not(windows))]
        let mut cmd = {
            let mut c = tokio::process::Command::new("sh");
            c.arg("-c").arg(&self.command);
            c
        };
        cmd.env("TETHER_APPROVAL_PROMPT", &request.prompt)
            .env("TETHER_APPROVAL_TARGET", &request.target)
            .env("TETHER_APPROVAL_TOOL", &request.tool_name)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);
        match cmd.status().await {
            Ok(status) if status.success() => Decision::Approved,
            Ok(_) => Decision::Rejected,
            Err(e) => {
                tracing::warn!(command = %self.command, error = %e, "approval command failed to start");
                Decision::Cancelled
            }
        }
    }
}

/// Asks on the controlling terminal. End of input counts as cancellation.
pub struct TtyApproval;

#[async_trait::async_trait]
impl ApprovalGate for TtyApproval {
    async fn request_approval(&self, request: &ApprovalRequest) -> Decision {
        let prompt = request.prompt.clone();
        tokio::task::spawn_blocking(move || ask_tty(&prompt))
            .await
            .unwrap_or(Decision::Cancelled)
    }
}

fn ask_tty(prompt: &str) -> Decision {
    use std::io::{BufRead, Write};

    #[cfg(windows)]
    const TTY: (&str, &str) = ("CONIN$", "CONOUT$");
    #[cfg(not(windows))]
    const TTY: (&str, &str) = ("/dev/tty", "/dev/tty");

    let (Ok(input), Ok(mut output)) = (
        std::fs::File::open(TTY.0),
        std::fs::OpenOptions::new().write(true).open(TTY.1),
    ) else {
        tracing::warn!("no controlling terminal for approval prompt");
        return Decision::Cancelled;
    };
    let mut reader = std::io::BufReader::new(input);
    loop {
        if write!(output, "{prompt} [{CHOICE_APPROVE}/{CHOICE_REJECT}] (a/r): ")
            .and_then(|_| output.flush())
            .is_err()
        {
            return Decision::Cancelled;
        }
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return Decision::Cancelled,
            Ok(_) => {}
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "a" | "approve" | "y" | "yes" => return Decision::Approved,
            "r" | "reject" | "n" | "no" => return Decision::Rejected,
            _ => continue,
        }
    }
}

/// Wraps a gate so a decision that does not arrive in time is `Rejected`.
pub struct WithTimeout {
    inner: Box<dyn ApprovalGate>,
    timeout: Duration,
}

pub fn with_timeout(gate: impl ApprovalGate + 'static, timeout: Duration) -> WithTimeout {
    WithTimeout {
        inner: Box::new(gate),
        timeout,
    }
}

#[async_trait::async_trait]
impl ApprovalGate for WithTimeout {
    async fn request_approval(&self, request: &ApprovalRequest) -> Decision {
        match tokio::time::timeout(self.timeout, self.inner.request_approval(request)).await {
            Ok(decision) => decision,
            Err(_) => {
                tracing::warn!(
                    target_path = %request.target,
                    timeout_secs = self.timeout.as_secs(),
                    "approval timed out"
                );
                Decision::Rejected
            }
        }
    }
}

/// Build the gate selected by configuration.
pub fn gate_from_config(config: &TetherConfig) -> anyhow::Result<Box<dyn ApprovalGate>> {
    let timeout = Duration::from_secs(config.approval_timeout_secs);
    Ok(match config.approval {
        ApprovalMode::Auto => Box::new(AutoApprove),
        ApprovalMode::Deny => Box::new(DenyAll),
        ApprovalMode::Prompt => Box::new(with_timeout(TtyApproval, timeout)),
        ApprovalMode::Command => {
            let command = config.approval_command.as_deref().ok_or_else(|| {
                anyhow::anyhow!("approval mode \"command\" requires approval_command")
            })?;
            Box::new(with_timeout(CommandApproval::new(command), timeout))
        }
    })
}
