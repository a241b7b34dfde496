//! Shared types used across Vigil crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque compute-resource identifier (an EC2 instance id in production).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A compute resource plus the workload on it that can be restarted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredTarget {
    pub target_id: TargetId,
    /// Name of the remediable workload on the host (e.g. a container name).
    pub remediation_label: String,
    /// Consecutive failed probes since the last success or hard remediation.
    pub failure_count: u32,
}

impl MonitoredTarget {
    pub fn new(target_id: impl Into<TargetId>, remediation_label: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            remediation_label: remediation_label.into(),
            failure_count: 0,
        }
    }
}

/// Outcome of a single reachability check. Produced per tick, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub target_id: TargetId,
    pub reachable: bool,
    pub observed_address: Option<String>,
}

/// A human-readable alert handed to a [`crate::Notifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub subject: String,
    pub body: String,
}

impl Notice {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Workload on a target failed its probe; a soft restart follows.
    pub fn target_down(url: &str, target: &MonitoredTarget) -> Self {
        Self::new(
            format!("ALERT: {url} is DOWN"),
            format!(
                "The monitored website {url} (instance {}) appears to be DOWN. \
                 Attempting to restart the workload '{}'.",
                target.target_id, target.remediation_label
            ),
        )
    }

    /// Soft restarts did not help; the host is being rebooted.
    pub fn target_critical(url: &str, target_id: &TargetId, attempts: u32) -> Self {
        Self::new(
            format!("CRITICAL: {url} is STILL DOWN after workload restart"),
            format!(
                "The monitored website {url} (instance {target_id}) is still DOWN \
                 after {attempts} attempts. Rebooting the instance."
            ),
        )
    }

    /// Sent once when the monitor exits.
    pub fn monitoring_stopped() -> Self {
        Self::new(
            "Vigil monitoring stopped",
            "Your Vigil monitoring program has been stopped and is no longer running.\n\
             No further monitoring or automated recovery actions will be performed \
             until it is restarted.",
        )
    }
}

/// Captured result of a command run on a remote host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: i32,
}

impl ExecOutput {
    /// A command succeeded when it exited 0 and wrote nothing to stderr.
    pub fn succeeded(&self) -> bool {
        self.exit_status == 0 && self.stderr.trim().is_empty()
    }
}
