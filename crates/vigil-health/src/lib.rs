//! vigil-health — health checking and escalating self-healing for Vigil.
//!
//! Probes each monitored target over HTTP, tracks consecutive failures, and
//! escalates from restarting the workload to rebooting the host. A single
//! scheduler task walks the target registry on a fixed interval.
//!
//! # Architecture
//!
//! ```text
//! Scheduler (tick loop, shutdown flag)
//!   └── per target, in registry order
//!       └── RemediationEngine
//!           ├── Resolver   → address (or start + bounded wait)
//!           ├── Prober     → reachable?
//!           ├── EscalationPolicy → none | soft | hard
//!           ├── Executor   → restart workload   (soft)
//!           ├── Controller → reboot / start host (hard)
//!           └── Notifier   → alerts
//! ```
//!
//! # Escalation
//!
//! Failures one and two restart the workload. The third consecutive failure
//! reboots the host instead and clears the counter, whether or not the
//! reboot request succeeded. Any successful probe clears the counter.

pub mod checker;
pub mod engine;
pub mod escalation;
pub mod monitor;

#[cfg(test)]
mod fakes;

pub use checker::{HttpProber, ProbeOutcome};
pub use engine::{Collaborators, EngineSettings, RemediationEngine, TargetOutcome};
pub use escalation::{EscalationPolicy, HARD_THRESHOLD, Remedy};
pub use monitor::{Scheduler, TickReport};
