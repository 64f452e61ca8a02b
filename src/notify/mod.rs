//! Email notifications.
//!
//! `Notifier` owns the mail transport, the templates and the fixed team
//! recipients. Lifecycle mail (submission, status change, payout) is best
//! effort: failures are logged and swallowed. The weekly rollup returns its
//! result because the email is the endpoint's only output.

pub mod mailer;
pub mod templates;

use std::sync::Arc;

use crate::config::{AppConfig, Recipients};
use crate::lifecycle::LifecycleEvent;
use crate::models::Referral;
use crate::rollup::WeeklyRollup;

pub use mailer::{mailer_from_config, DisabledMailer, Mailer, SmtpMailer};
pub use templates::{escape_html, EmailTemplates, RenderedEmail};

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Email delivery is not configured")]
    NotConfigured,
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
    #[error("Failed to build message: {0}")]
    Build(String),
    #[error("SMTP transport error: {0}")]
    Transport(String),
    #[error("Mail task failed: {0}")]
    TaskFailed(String),
}

/// A fully addressed message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub cc: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

impl OutgoingEmail {
    /// Blank CC entries (unset optional mailboxes) are dropped.
    pub fn new(to: &str, cc: &[&str], rendered: RenderedEmail) -> Self {
        Self {
            to: to.trim().to_string(),
            cc: cc
                .iter()
                .map(|addr| addr.trim())
                .filter(|addr| !addr.is_empty())
                .map(str::to_string)
                .collect(),
            subject: rendered.subject,
            html_body: rendered.html_body,
        }
    }
}

pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    templates: EmailTemplates,
    recipients: Recipients,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, config: &AppConfig) -> Self {
        Self {
            mailer,
            templates: EmailTemplates::new(&config.organization_name, &config.app_url),
            recipients: config.recipients.clone(),
        }
    }

    /// Send on the blocking pool; SMTP is synchronous.
    pub async fn deliver(&self, email: OutgoingEmail) -> Result<(), NotificationError> {
        if email.to.is_empty() {
            return Err(NotificationError::InvalidAddress(String::new()));
        }
        let mailer = Arc::clone(&self.mailer);
        let subject = email.subject.clone();
        let to = email.to.clone();

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| NotificationError::TaskFailed(e.to_string()))??;

        tracing::info!(%to, %subject, "Email sent");
        Ok(())
    }

    /// Confirmation to the referrer and alert to the talent team.
    pub async fn referral_submitted(&self, referral: &Referral) {
        let confirmation = OutgoingEmail::new(
            &referral.referrer_email,
            &[],
            self.templates.referral_confirmation(referral),
        );
        self.best_effort("confirmation", &referral.referral_id, confirmation)
            .await;

        let cpo = self.recipients.cpo.as_deref().unwrap_or_default();
        let alert = OutgoingEmail::new(
            &self.recipients.talent,
            &[cpo],
            self.templates.new_referral_alert(referral),
        );
        self.best_effort("new_referral_alert", &referral.referral_id, alert)
            .await;
    }

    /// Dispatch the mail for each event produced by an update.
    /// `referral` is the record after the update was applied.
    pub async fn lifecycle_events(&self, referral: &Referral, events: &[LifecycleEvent]) {
        for event in events {
            match event {
                LifecycleEvent::StatusChanged { from, to } => {
                    tracing::debug!(
                        referral_id = %referral.referral_id,
                        %from,
                        %to,
                        "Notifying referrer of status change"
                    );
                    let email = OutgoingEmail::new(
                        &referral.referrer_email,
                        &[],
                        self.templates.status_update(referral, *to),
                    );
                    self.best_effort("status_update", &referral.referral_id, email)
                        .await;
                }
                LifecycleEvent::PayoutReady => {
                    let email = OutgoingEmail::new(
                        &self.recipients.payroll_manager,
                        &[
                            self.recipients.payroll.as_str(),
                            self.recipients.hr.as_str(),
                            self.recipients.talent.as_str(),
                        ],
                        self.templates.payout_alert(referral),
                    );
                    self.best_effort("payout_alert", &referral.referral_id, email)
                        .await;
                }
            }
        }
    }

    /// Digest to the talent team, CC leadership and payroll.
    pub async fn weekly_rollup(&self, rollup: &WeeklyRollup) -> Result<(), NotificationError> {
        let cpo = self.recipients.cpo.as_deref().unwrap_or_default();
        let email = OutgoingEmail::new(
            &self.recipients.talent,
            &[
                cpo,
                self.recipients.payroll_manager.as_str(),
                self.recipients.payroll.as_str(),
            ],
            self.templates.weekly_rollup(rollup),
        );
        self.deliver(email).await
    }

    async fn best_effort(&self, kind: &'static str, referral_id: &str, email: OutgoingEmail) {
        if let Err(e) = self.deliver(email).await {
            tracing::warn!(kind, %referral_id, error = %e, "Notification not delivered");
        }
    }
}
