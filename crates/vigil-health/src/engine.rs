//! Remediation engine — resolve, probe, and escalate for one target.
//!
//! The engine owns no per-target state. The scheduler lends it each
//! [`MonitoredTarget`] mutably for the duration of one tick.
//!
//! ```text
//! resolve ──none──▶ start + poll (bounded) ──timeout──▶ skip until next tick
//!    │                     │
//!    └──address◀───────────┘
//!          │
//!        probe ──▶ EscalationPolicy ──▶ none | soft (exec) | hard (reboot)
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use vigil_core::config::VigilConfig;
use vigil_core::{
    Controller, Executor, MonitoredTarget, Notice, Notifier, ProbeResult, Prober, Resolver,
    TargetId,
};

use crate::escalation::{EscalationPolicy, Remedy};

/// The external systems the engine drives.
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn Resolver>,
    pub prober: Arc<dyn Prober>,
    pub executor: Arc<dyn Executor>,
    pub notifier: Arc<dyn Notifier>,
    pub controller: Arc<dyn Controller>,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub policy: EscalationPolicy,
    /// Delay between address lookups after a start request.
    pub start_poll_interval: Duration,
    /// Maximum lookups after a start request within one tick.
    pub start_poll_attempts: u32,
    /// Restart command template containing `{label}`.
    pub restart_command: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&VigilConfig::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &VigilConfig) -> Self {
        Self {
            policy: EscalationPolicy::new(config.monitor.escalation_threshold),
            start_poll_interval: config.monitor.start_poll_interval(),
            start_poll_attempts: config.monitor.start_poll_attempts,
            restart_command: config.ssh.restart_command.clone(),
        }
    }

    fn restart_command_for(&self, label: &str) -> String {
        self.restart_command
            .replace(vigil_core::config::LABEL_PLACEHOLDER, label)
    }
}

/// What happened to one target during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOutcome {
    Healthy,
    /// Probe succeeded after `after` failed probes.
    Recovered { after: u32 },
    SoftRemediated { attempt: u32 },
    HardRemediated { attempts: u32 },
    /// No address appeared after a start request; retried next tick.
    AddressTimedOut { attempts: u32 },
    /// Shutdown was requested while waiting for an address.
    Interrupted,
    /// Processing panicked; the scheduler moved on.
    Faulted,
}

enum AddressWait {
    Ready(String),
    TimedOut(u32),
    Interrupted,
}

pub struct RemediationEngine {
    collab: Collaborators,
    settings: EngineSettings,
}

impl RemediationEngine {
    pub fn new(collab: Collaborators, settings: EngineSettings) -> Self {
        Self { collab, settings }
    }

    /// Run one resolve → probe → remediate pass for `target`.
    ///
    /// Collaborator errors are logged here and never returned. The shutdown
    /// flag is only observed while waiting for a started instance's address.
    pub async fn process(
        &self,
        target: &mut MonitoredTarget,
        shutdown: &mut watch::Receiver<bool>,
    ) -> TargetOutcome {
        let address = match self.lookup(&target.target_id).await {
            Some(address) => address,
            None => match self.start_and_wait(&target.target_id, shutdown).await {
                AddressWait::Ready(address) => address,
                AddressWait::TimedOut(attempts) => {
                    warn!(
                        target_id = %target.target_id,
                        attempts,
                        "instance did not get an address in time, skipping this check"
                    );
                    return TargetOutcome::AddressTimedOut { attempts };
                }
                AddressWait::Interrupted => {
                    info!(target_id = %target.target_id, "address wait interrupted by shutdown");
                    return TargetOutcome::Interrupted;
                }
            },
        };

        let url = self.collab.prober.endpoint(&address);
        let probe = ProbeResult {
            target_id: target.target_id.clone(),
            reachable: self.collab.prober.probe(&address).await,
            observed_address: Some(address.clone()),
        };
        debug!(target_id = %probe.target_id, %url, reachable = probe.reachable, "probe complete");

        match self.settings.policy.record(target, probe.reachable) {
            Remedy::None { recovered_after: 0 } => {
                info!(target_id = %target.target_id, %url, "website is UP");
                TargetOutcome::Healthy
            }
            Remedy::None { recovered_after } => {
                info!(
                    target_id = %target.target_id,
                    %url,
                    failures = recovered_after,
                    "website is UP again"
                );
                TargetOutcome::Recovered {
                    after: recovered_after,
                }
            }
            Remedy::Soft { attempt } => {
                warn!(
                    target_id = %target.target_id,
                    %url,
                    attempt,
                    "website is DOWN, restarting workload"
                );
                self.notify(&Notice::target_down(&url, target)).await;
                self.restart_workload(target, &address).await;
                TargetOutcome::SoftRemediated { attempt }
            }
            Remedy::Hard { attempts } => {
                error!(
                    target_id = %target.target_id,
                    %url,
                    attempts,
                    "website still DOWN, rebooting instance"
                );
                self.notify(&Notice::target_critical(&url, &target.target_id, attempts))
                    .await;
                self.reboot(&target.target_id).await;
                TargetOutcome::HardRemediated { attempts }
            }
        }
    }

    /// Deliver a notice. Failures are logged and swallowed.
    pub async fn notify(&self, notice: &Notice) {
        match self.collab.notifier.notify(notice).await {
            Ok(()) => debug!(subject = %notice.subject, "notification sent"),
            Err(e) => {
                error!(subject = %notice.subject, error = %e, "failed to send notification")
            }
        }
    }

    /// Resolver errors are treated the same as "no address".
    async fn lookup(&self, target_id: &TargetId) -> Option<String> {
        match self.collab.resolver.resolve(target_id).await {
            Ok(address) => address,
            Err(e) => {
                warn!(%target_id, error = %e, "address lookup failed, treating as unavailable");
                None
            }
        }
    }

    async fn start_and_wait(
        &self,
        target_id: &TargetId,
        shutdown: &mut watch::Receiver<bool>,
    ) -> AddressWait {
        info!(%target_id, "no public address, starting instance");
        if let Err(e) = self.collab.controller.start(target_id).await {
            error!(%target_id, error = %e, "failed to start instance");
        }

        let attempts = self.settings.start_poll_attempts;
        for attempt in 1..=attempts {
            if *shutdown.borrow() {
                return AddressWait::Interrupted;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.settings.start_poll_interval) => {}
                _ = shutdown.changed() => return AddressWait::Interrupted,
            }

            if let Some(address) = self.lookup(target_id).await {
                info!(%target_id, %address, attempt, "instance started");
                return AddressWait::Ready(address);
            }
            debug!(%target_id, attempt, attempts, "still waiting for address");
        }

        AddressWait::TimedOut(attempts)
    }

    async fn restart_workload(&self, target: &MonitoredTarget, address: &str) {
        let command = self.settings.restart_command_for(&target.remediation_label);
        match self.collab.executor.exec(address, &command).await {
            Ok(output) if output.succeeded() => {
                info!(
                    target_id = %target.target_id,
                    label = %target.remediation_label,
                    stdout = %output.stdout.trim(),
                    "workload restarted"
                );
            }
            Ok(output) => {
                error!(
                    target_id = %target.target_id,
                    label = %target.remediation_label,
                    exit_status = output.exit_status,
                    stderr = %output.stderr.trim(),
                    "workload restart reported an error"
                );
            }
            Err(e) => {
                error!(
                    target_id = %target.target_id,
                    label = %target.remediation_label,
                    error = %e,
                    "workload restart failed"
                );
            }
        }
    }

    async fn reboot(&self, target_id: &TargetId) {
        match self.collab.controller.reboot(target_id).await {
            Ok(()) => info!(%target_id, "reboot requested"),
            Err(e) => error!(%target_id, error = %e, "failed to reboot instance"),
        }
    }
}
