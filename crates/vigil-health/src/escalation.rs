//! Escalation policy — decides soft versus hard remediation.
//!
//! The counter on a [`MonitoredTarget`] means "failed probes since the last
//! success or hard remediation". It is reset unconditionally after a hard
//! remediation, whether or not the reboot call itself succeeded.

use tracing::{debug, warn};

use vigil_core::MonitoredTarget;

/// Consecutive failures at which a host reboot replaces a workload restart.
pub const HARD_THRESHOLD: u32 = 3;

/// What the engine should do after a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remedy {
    /// Probe succeeded. `recovered_after` is the count that was cleared.
    None { recovered_after: u32 },
    /// Restart the workload. `attempt` is the new failure count.
    Soft { attempt: u32 },
    /// Reboot the host after `attempts` consecutive failures.
    Hard { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    threshold: u32,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            threshold: HARD_THRESHOLD,
        }
    }
}

impl EscalationPolicy {
    /// A threshold of 0 is treated as 1 (every failure reboots).
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Record a probe result against `target` and return the remedy.
    pub fn record(&self, target: &mut MonitoredTarget, reachable: bool) -> Remedy {
        if reachable {
            let recovered_after = std::mem::take(&mut target.failure_count);
            if recovered_after > 0 {
                debug!(target_id = %target.target_id, failures = recovered_after, "target recovered");
            }
            return Remedy::None { recovered_after };
        }

        let attempts = target.failure_count + 1;
        if attempts >= self.threshold {
            warn!(
                target_id = %target.target_id,
                attempts,
                threshold = self.threshold,
                "escalating to hard remediation"
            );
            target.failure_count = 0;
            Remedy::Hard { attempts }
        } else {
            target.failure_count = attempts;
            Remedy::Soft { attempt: attempts }
        }
    }
}
