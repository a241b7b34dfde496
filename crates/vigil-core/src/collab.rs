//! Collaborator contracts consumed by the control loop.
//!
//! The engine never touches a cloud SDK, SSH library or mail transport
//! directly. Production implementations live in `vigil-remote`; tests use
//! small recording fakes.

use async_trait::async_trait;

use crate::error::{NotifyError, RemediationError, ResolveError};
use crate::types::{ExecOutput, Notice, TargetId};

/// Maps a compute resource to its current network address.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// `Ok(None)` means the resource has no address right now (e.g. stopped).
    async fn resolve(&self, target_id: &TargetId) -> Result<Option<String>, ResolveError>;
}

/// Reachability check against an address.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Any failure collapses to `false`.
    async fn probe(&self, address: &str) -> bool;

    /// Human-readable endpoint for an address, used in alerts and logs.
    fn endpoint(&self, address: &str) -> String {
        address.to_string()
    }
}

/// Runs a command on a remote host with the executor's own credentials.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn exec(&self, address: &str, command: &str) -> Result<ExecOutput, RemediationError>;
}

/// Delivers alerts to the operator.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError>;
}

/// Starts or reboots the underlying compute resource.
#[async_trait]
pub trait Controller: Send + Sync {
    async fn start(&self, target_id: &TargetId) -> Result<(), RemediationError>;

    async fn reboot(&self, target_id: &TargetId) -> Result<(), RemediationError>;
}
