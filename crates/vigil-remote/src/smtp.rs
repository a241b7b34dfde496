//! SMTP notifier (STARTTLS relay with login credentials).

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use vigil_core::config::SmtpConfig;
use vigil_core::{ConfigError, Notice, Notifier, NotifyError};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    /// Build the transport. No connection is made until the first send.
    pub fn new(config: &SmtpConfig) -> Result<Self, ConfigError> {
        let username = config
            .username
            .clone()
            .ok_or(ConfigError::Missing("EMAIL_ADDRESS"))?;
        let password = config
            .password
            .clone()
            .ok_or(ConfigError::Missing("EMAIL_PASSWORD"))?;
        let recipient = config
            .recipient
            .as_deref()
            .ok_or(ConfigError::Missing("TO_EMAIL"))?;

        let from = parse_mailbox("EMAIL_ADDRESS", &username)?;
        let to = parse_mailbox("TO_EMAIL", recipient)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
            .map_err(|e| ConfigError::Invalid {
                key: "SMTP_SERVER",
                value: config.server.clone(),
                reason: e.to_string(),
            })?
            .port(config.port)
            .credentials(Credentials::new(username, password))
            .timeout(Some(SEND_TIMEOUT))
            .build();

        Ok(Self { transport, from, to })
    }

    fn message(&self, notice: &Notice) -> Result<Message, NotifyError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notice.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(notice.body.clone())
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
        let message = self.message(notice)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        debug!(code = %response.code(), to = %self.to, "mail accepted");
        Ok(())
    }
}

fn parse_mailbox(key: &'static str, value: &str) -> Result<Mailbox, ConfigError> {
    value.parse().map_err(|e: lettre::address::AddressError| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
