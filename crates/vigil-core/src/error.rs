//! Error types shared by the Vigil crates.
//!
//! Only [`ConfigError`] is fatal. The others are produced by collaborators
//! during a tick and are logged by the engine, never propagated out of it.

use std::path::PathBuf;

use thiserror::Error;

/// Startup configuration problems. The daemon refuses to start on any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// The address resolver could not answer. Treated like "no address".
#[derive(Debug, Error)]
#[error("address lookup failed: {0}")]
pub struct ResolveError(pub String);

/// A soft or hard remediation could not be carried out.
#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    #[error("authentication as {user} failed: {reason}")]
    Auth { user: String, reason: String },

    #[error("remote command failed: {0}")]
    Command(String),

    #[error("remote command exited with status {status}: {stderr}")]
    NonZeroExit { status: i32, stderr: String },

    #[error("control plane call failed: {0}")]
    ControlPlane(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An alert could not be delivered.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mail address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("transport error: {0}")]
    Transport(String),
}
