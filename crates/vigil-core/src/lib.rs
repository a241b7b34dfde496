//! vigil-core — shared vocabulary for the Vigil self-healing monitor.
//!
//! Everything the control loop needs to talk about a monitored target
//! without knowing which cloud, transport or mail server sits behind it:
//!
//! - [`types`]: targets, probe results, notices, remote command output
//! - [`registry`]: the static `id:label` target list and its parser
//! - [`config`]: layered configuration (defaults → TOML file → environment)
//! - [`collab`]: narrow async traits for the external collaborators
//! - [`error`]: the error taxonomy shared by all crates

pub mod collab;
pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use collab::{Controller, Executor, Notifier, Prober, Resolver};
pub use config::VigilConfig;
pub use error::{ConfigError, NotifyError, RemediationError, ResolveError};
pub use registry::Registry;
pub use types::*;
