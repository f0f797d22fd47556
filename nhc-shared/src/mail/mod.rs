/// Outgoing e-mail
///
/// Handlers never talk to the mail server directly. They render a message
/// with [`templates::MailTemplates`] and hand it to the
/// [`dispatcher::MailDispatcher`], which delivers it in the background with
/// retries and reports the outcome through a receipt.
///
/// # Modules
///
/// - `templates`: Verification, registration, password reset and admin messages
/// - `dispatcher`: Bounded delivery queue with retry and pacing
/// - `smtp`: SMTP delivery through lettre
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use nhc_shared::mail::{LogMailer, dispatcher::{DispatcherConfig, MailDispatcher}};
/// use nhc_shared::mail::templates::MailTemplates;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (dispatcher, worker) = MailDispatcher::start(Arc::new(LogMailer), DispatcherConfig::default());
/// let templates = MailTemplates::new("https://www.nutritionhabitchallenge.com");
///
/// let receipt = dispatcher.send(templates.verification("ada@example.com", "Ada", "c0de"))?;
/// let report = receipt.wait().await?;
/// assert_eq!(report.sent, 1);
///
/// dispatcher.shutdown();
/// worker.await?;
/// # Ok(())
/// # }
/// ```

pub mod dispatcher;
pub mod smtp;
pub mod templates;

use async_trait::async_trait;
use serde::Serialize;

/// Rendered e-mail ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Error type for e-mail delivery
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailError {
    /// Address could not be parsed
    #[error("Invalid e-mail address {0}")]
    InvalidAddress(String),

    /// Message could not be assembled
    #[error("Failed to build message: {0}")]
    Build(String),

    /// Mail server rejected the message or could not be reached
    #[error("Failed to send mail: {0}")]
    Transport(String),

    /// Delivery queue is at capacity
    #[error("Mail queue is full")]
    QueueFull,

    /// Dispatcher has shut down
    #[error("Mail dispatcher is shut down")]
    Closed,
}

/// Delivers one message
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Logs messages instead of sending them
///
/// Used when no SMTP server is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            bytes = mail.html_body.len(),
            "Mail delivery disabled, message logged"
        );
        Ok(())
    }
}
