//! vigil.toml / environment configuration.
//!
//! Layered: built-in defaults, then an optional TOML file, then environment
//! variables. Every key is optional except the mail credentials.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Placeholder substituted with a target's remediation label.
pub const LABEL_PLACEHOLDER: &str = "{label}";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub monitor: MonitorConfig,
    pub probe: ProbeConfig,
    pub smtp: SmtpConfig,
    pub ssh: SshConfig,
    pub aws: AwsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub check_interval_secs: u64,
    /// `id:label,id:label,…`
    pub targets: String,
    pub escalation_threshold: u32,
    pub start_poll_interval_secs: u64,
    pub start_poll_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 300,
            targets: String::new(),
            escalation_threshold: 3,
            start_poll_interval_secs: 10,
            start_poll_attempts: 30,
        }
    }
}

impl MonitorConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn start_poll_interval(&self) -> Duration {
        Duration::from_secs(self.start_poll_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub port: u16,
    pub path: String,
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            path: "/".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    /// Login name, also used as the sender address.
    pub username: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: "smtp.gmail.com".to_string(),
            port: 587,
            username: None,
            password: None,
            recipient: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub user: String,
    pub key_path: PathBuf,
    pub port: u16,
    /// Bound on connect, handshake and authentication.
    pub connect_timeout_secs: u64,
    pub restart_command: String,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: "admin".to_string(),
            key_path: PathBuf::from("debian-key.pem"),
            port: 22,
            connect_timeout_secs: 30,
            restart_command: format!("sudo docker restart {LABEL_PLACEHOLDER}"),
        }
    }
}

impl SshConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "eu-west-2".to_string(),
        }
    }
}

impl VigilConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from an optional file, overlay the process environment, validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style keys.
    ///
    /// `lookup` is injected so tests never touch the real environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let m = &mut self.monitor;
        set_parsed(&lookup, "CHECK_INTERVAL_SECONDS", &mut m.check_interval_secs)?;
        set_string(&lookup, "MONITOR_INSTANCES", &mut m.targets);
        set_parsed(&lookup, "ESCALATION_THRESHOLD", &mut m.escalation_threshold)?;
        set_parsed(&lookup, "START_POLL_INTERVAL_SECONDS", &mut m.start_poll_interval_secs)?;
        set_parsed(&lookup, "START_POLL_ATTEMPTS", &mut m.start_poll_attempts)?;

        let p = &mut self.probe;
        set_parsed(&lookup, "PROBE_PORT", &mut p.port)?;
        set_string(&lookup, "PROBE_PATH", &mut p.path);
        set_parsed(&lookup, "PROBE_TIMEOUT_SECONDS", &mut p.timeout_secs)?;

        let s = &mut self.smtp;
        set_string(&lookup, "SMTP_SERVER", &mut s.server);
        set_parsed(&lookup, "SMTP_PORT", &mut s.port)?;
        set_optional(&lookup, "EMAIL_ADDRESS", &mut s.username);
        set_optional(&lookup, "EMAIL_PASSWORD", &mut s.password);
        set_optional(&lookup, "TO_EMAIL", &mut s.recipient);

        let h = &mut self.ssh;
        set_string(&lookup, "REMOTE_USER", &mut h.user);
        if let Some(path) = lookup("PEM_FILE_PATH") {
            h.key_path = PathBuf::from(path);
        }
        set_parsed(&lookup, "SSH_PORT", &mut h.port)?;
        set_parsed(&lookup, "SSH_CONNECT_TIMEOUT_SECONDS", &mut h.connect_timeout_secs)?;
        set_string(&lookup, "RESTART_COMMAND", &mut h.restart_command);

        set_string(&lookup, "AWS_REGION", &mut self.aws.region);
        Ok(())
    }

    /// Reject settings the daemon cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("CHECK_INTERVAL_SECONDS", self.monitor.check_interval_secs)?;
        require_positive("ESCALATION_THRESHOLD", self.monitor.escalation_threshold.into())?;
        require_positive("START_POLL_INTERVAL_SECONDS", self.monitor.start_poll_interval_secs)?;
        require_positive("START_POLL_ATTEMPTS", self.monitor.start_poll_attempts.into())?;
        require_positive("PROBE_TIMEOUT_SECONDS", self.probe.timeout_secs)?;
        require_positive("SSH_CONNECT_TIMEOUT_SECONDS", self.ssh.connect_timeout_secs)?;

        if !self.probe.path.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "PROBE_PATH",
                value: self.probe.path.clone(),
                reason: "must start with '/'".to_string(),
            });
        }

        if !self.ssh.restart_command.contains(LABEL_PLACEHOLDER) {
            return Err(ConfigError::Invalid {
                key: "RESTART_COMMAND",
                value: self.ssh.restart_command.clone(),
                reason: format!("must contain {LABEL_PLACEHOLDER}"),
            });
        }

        require_present("EMAIL_ADDRESS", &self.smtp.username)?;
        require_present("EMAIL_PASSWORD", &self.smtp.password)?;
        require_present("TO_EMAIL", &self.smtp.recipient)?;
        Ok(())
    }
}

fn set_string<F>(lookup: &F, key: &str, slot: &mut String)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(key) {
        *slot = value;
    }
}

fn set_optional<F>(lookup: &F, key: &str, slot: &mut Option<String>)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(key) {
        *slot = Some(value);
    }
}

fn set_parsed<F, T>(lookup: &F, key: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = lookup(key) {
        *slot = value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: value.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn require_positive(key: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

fn require_present(key: &'static str, value: &Option<String>) -> Result<(), ConfigError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::Missing(key)),
    }
}
