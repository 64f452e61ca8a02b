//! Mail transports.

use std::sync::Arc;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};

use super::{NotificationError, OutgoingEmail};
use crate::config::SmtpConfig;

/// Blocking mail transport. Called from `spawn_blocking`.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<(), NotificationError>;
}

/// SMTP with STARTTLS and login credentials.
pub struct SmtpMailer {
    from: Mailbox,
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, password: &str) -> Result<Self, NotificationError> {
        let address: Address = config
            .username
            .parse()
            .map_err(|_| NotificationError::InvalidAddress(config.username.clone()))?;
        let from = Mailbox::new(Some(config.from_name.clone()), address);

        let transport = SmtpTransport::starttls_relay(&config.server)
            .map_err(|e| NotificationError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                password.to_string(),
            ))
            .build();

        Ok(Self { from, transport })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), NotificationError> {
        let message = build_message(&self.from, email)?;
        self.transport
            .send(&message)
            .map_err(|e| NotificationError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Used when no SMTP password is configured.
pub struct DisabledMailer;

impl Mailer for DisabledMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), NotificationError> {
        tracing::warn!(
            to = %email.to,
            subject = %email.subject,
            "SMTP_PASSWORD not configured, skipping email"
        );
        Err(NotificationError::NotConfigured)
    }
}

/// Pick the transport for the configured SMTP settings.
pub fn mailer_from_config(config: &SmtpConfig) -> Result<Arc<dyn Mailer>, NotificationError> {
    match config.password.as_deref() {
        Some(password) => {
            tracing::info!(server = %config.server, port = config.port, "SMTP delivery enabled");
            Ok(Arc::new(SmtpMailer::new(config, password)?))
        }
        None => {
            tracing::warn!("SMTP_PASSWORD not set; notifications will be logged only");
            Ok(Arc::new(DisabledMailer))
        }
    }
}

fn parse_mailbox(raw: &str) -> Result<Mailbox, NotificationError> {
    raw.parse::<Mailbox>()
        .map_err(|_| NotificationError::InvalidAddress(raw.to_string()))
}

pub(crate) fn build_message(from: &Mailbox, email: &OutgoingEmail) -> Result<Message, NotificationError> {
    let mut builder = Message::builder()
        .from(from.clone())
        .to(parse_mailbox(&email.to)?)
        .subject(email.subject.as_str())
        .header(ContentType::TEXT_HTML);
    for cc in &email.cc {
        builder = builder.cc(parse_mailbox(cc)?);
    }
    builder
        .body(email.html_body.clone())
        .map_err(|e| NotificationError::Build(e.to_string()))
}
