//! SSH remote executor.
//!
//! Opens a fresh session per command, authenticates with a private key file,
//! and captures stdout, stderr and the exit status. Session setup is bounded
//! by a timeout; the command itself is not.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_ssh2_lite::{AsyncSession, SessionConfiguration};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use vigil_core::config::SshConfig;
use vigil_core::{ConfigError, ExecOutput, Executor, RemediationError};

#[derive(Debug, Clone)]
pub struct SshExecutor {
    user: String,
    key_path: PathBuf,
    port: u16,
    connect_timeout: Duration,
}

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

impl SshExecutor {
    /// The key file must exist at startup.
    pub fn new(
        user: impl Into<String>,
        key_path: impl Into<PathBuf>,
        port: u16,
    ) -> Result<Self, ConfigError> {
        let key_path = key_path.into();
        if !key_path.is_file() {
            return Err(ConfigError::Invalid {
                key: "PEM_FILE_PATH",
                value: key_path.display().to_string(),
                reason: "private key file not found".to_string(),
            });
        }
        Ok(Self {
            user: user.into(),
            key_path,
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn from_config(config: &SshConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.user.clone(), config.key_path.clone(), config.port)?
            .with_connect_timeout(config.connect_timeout()))
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    async fn open(&self, address: &str) -> Result<AsyncSession<TcpStream>, RemediationError> {
        tokio::time::timeout(self.connect_timeout, self.establish(address))
            .await
            .map_err(|_| RemediationError::Connect {
                address: address.to_string(),
                reason: format!("session setup timed out after {:?}", self.connect_timeout),
            })?
    }

    async fn establish(&self, address: &str) -> Result<AsyncSession<TcpStream>, RemediationError> {
        let connect_err = |reason: String| RemediationError::Connect {
            address: address.to_string(),
            reason,
        };

        let tcp = TcpStream::connect((address, self.port))
            .await
            .map_err(|e| connect_err(e.to_string()))?;
        let mut session = AsyncSession::new(tcp, SessionConfiguration::new())
            .map_err(|e| connect_err(e.to_string()))?;
        session
            .handshake()
            .await
            .map_err(|e| connect_err(e.to_string()))?;
        session
            .userauth_pubkey_file(&self.user, None, &self.key_path, None)
            .await
            .map_err(|e| RemediationError::Auth {
                user: self.user.clone(),
                reason: e.to_string(),
            })?;
        Ok(session)
    }
}

#[async_trait]
impl Executor for SshExecutor {
    async fn exec(&self, address: &str, command: &str) -> Result<ExecOutput, RemediationError> {
        let mut session = self.open(address).await?;
        let command_err = |e: async_ssh2_lite::Error| RemediationError::Command(e.to_string());

        let mut channel = session.channel_session().await.map_err(command_err)?;
        channel.exec(command).await.map_err(command_err)?;

        let mut stdout = String::new();
        channel.read_to_string(&mut stdout).await?;
        let mut stderr = String::new();
        channel.stderr().read_to_string(&mut stderr).await?;

        channel.wait_close().await.map_err(command_err)?;
        let exit_status = channel.exit_status().map_err(command_err)?;
        debug!(%address, %command, exit_status, "remote command finished");

        if let Err(e) = session.disconnect(None, "vigil done", None).await {
            warn!(%address, error = %e, "ssh disconnect failed");
        }

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_status,
        })
    }
}
