//! # Application email delivery
//!
//! One message is built per submission and handed to exactly one transport:
//! an authenticated SMTP session when `SMTP_HOST` is configured, the local
//! `sendmail` binary otherwise. Failures are not retried and never fall back
//! to the other transport.

pub mod message;
pub mod sendmail;

use thiserror::Error;
use tracing::info;

use crate::config::{EmailConfig, SendmailConfig, Settings};
use crate::form::DecodedForm;
use crate::smtp::{self, SmtpError};

pub use message::MimeMessage;
pub use sendmail::SendmailError;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Smtp(#[from] SmtpError),
    #[error(transparent)]
    Sendmail(#[from] SendmailError),
}

/// Header and envelope addresses of every application email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub to: String,
}

/// The transport a message goes out through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Smtp(EmailConfig),
    Sendmail(SendmailConfig),
}

impl Delivery {
    /// A configured SMTP host wins, anything else goes to the local relay.
    pub fn select(email: &EmailConfig, sendmail: &SendmailConfig) -> Self {
        match email.host.as_deref() {
            Some(host) if !host.is_empty() => Delivery::Smtp(email.clone()),
            _ => Delivery::Sendmail(sendmail.clone()),
        }
    }

    pub async fn send(
        &self,
        message: &MimeMessage,
        envelope: &Envelope,
    ) -> Result<(), DeliveryError> {
        match self {
            Delivery::Smtp(config) => {
                smtp::send_via_smtp(message, config, &envelope.to).await?
            }
            Delivery::Sendmail(config) => {
                sendmail::send_via_sendmail(message, config).await?
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delivery::Smtp(config) => write!(
                f,
                "SMTP via {}:{}",
                config.host.as_deref().unwrap_or("?"),
                config.port
            ),
            Delivery::Sendmail(config) => {
                write!(f, "sendmail at {}", config.path.display())
            }
        }
    }
}

/// Sends application emails to the configured recipient.
#[derive(Debug, Clone)]
pub struct Mailer {
    delivery: Delivery,
    envelope: Envelope,
}

impl Mailer {
    pub fn new(delivery: Delivery, envelope: Envelope) -> Self {
        Mailer { delivery, envelope }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Mailer::new(
            Delivery::select(&settings.email, &settings.sendmail),
            Envelope {
                from: settings.email.from.clone(),
                to: settings.recipient.clone(),
            },
        )
    }

    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Builds the email for `form` and delivers it.
    pub async fn send_application_email(
        &self,
        form: &DecodedForm,
    ) -> Result<(), DeliveryError> {
        let message = message::build(form, &self.envelope);
        self.delivery.send(&message, &self.envelope).await?;

        info!(
            "Application email for {} delivered ({})",
            self.envelope.to, self.delivery
        );
        Ok(())
    }

    /// What an operator should check when delivery fails.
    pub fn operator_hint(&self) -> String {
        match &self.delivery {
            Delivery::Smtp(config) => format!(
                "Email delivery failed. Ensure the SMTP server {}:{} accepts the configured credentials and relays messages to {}.",
                config.host.as_deref().unwrap_or("?"),
                config.port,
                self.envelope.to
            ),
            Delivery::Sendmail(_) => format!(
                "Email delivery failed. Ensure sendmail is configured on this server to forward messages to {}.",
                self.envelope.to
            ),
        }
    }
}
