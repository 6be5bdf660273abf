// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission notifier: mail composition and SMTP delivery.
//!
//! Every accepted submission produces two messages on one relay session:
//! an operator notification (with `Reply-To` set to the submitter) and a
//! static confirmation back to the sender. The two sends are one logical
//! delivery: if the confirmation fails after the notification went out,
//! the whole delivery is reported as failed.

use crate::config::MailConfig;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// A validated contact-form submission. All four fields are non-empty by
/// the time one of these exists.
#[derive(Debug, Clone)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Delivery failure kinds. Distinguishable in diagnostics, collapsed to a
/// generic internal error at the HTTP boundary.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("mail configuration incomplete: {0}")]
    Misconfigured(String),

    #[error("invalid mail address ({0})")]
    Address(String),

    #[error("message could not be built: {0}")]
    Compose(String),

    #[error("relay connection failed: {0}")]
    Connect(String),

    #[error("relay send failed: {0}")]
    Send(String),
}

/// Seam over submission delivery so the pipeline can be exercised with a
/// substituted notifier in tests.
#[async_trait::async_trait]
pub trait SubmissionNotifier: Send + Sync {
    /// Send the operator notification and the sender confirmation as one
    /// logical delivery; returns the notification's message id.
    async fn deliver(&self, submission: &Submission) -> Result<String, DeliveryError>;
}

/// Thin seam over the SMTP transport so delivery ordering can be tested
/// without a live relay.
#[async_trait::async_trait]
pub trait SmtpRelay: Send + Sync {
    /// Fail fast on connectivity or credential problems before any send.
    async fn check_connection(&self) -> Result<(), DeliveryError>;
    async fn send(&self, message: Message) -> Result<(), DeliveryError>;
}

#[async_trait::async_trait]
impl SmtpRelay for AsyncSmtpTransport<Tokio1Executor> {
    async fn check_connection(&self) -> Result<(), DeliveryError> {
        match self.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DeliveryError::Connect("relay refused the NOOP check".to_string())),
            Err(e) => Err(DeliveryError::Connect(e.to_string())),
        }
    }

    async fn send(&self, message: Message) -> Result<(), DeliveryError> {
        AsyncTransport::send(self, message)
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::Send(e.to_string()))
    }
}

/// Composes and delivers submission mail through the configured relay.
pub struct Notifier {
    config: MailConfig,
}

impl Notifier {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn sender(&self) -> Result<Mailbox, DeliveryError> {
        let from = self
            .config
            .mail_from
            .as_deref()
            .ok_or_else(|| DeliveryError::Misconfigured("MAIL_FROM".to_string()))?;
        from.parse()
            .map_err(|e| DeliveryError::Address(format!("MAIL_FROM: {e}")))
    }

    fn recipient(&self) -> Result<Mailbox, DeliveryError> {
        let to = self
            .config
            .mail_to
            .as_deref()
            .ok_or_else(|| DeliveryError::Misconfigured("MAIL_TO".to_string()))?;
        to.parse()
            .map_err(|e| DeliveryError::Address(format!("MAIL_TO: {e}")))
    }

    /// Fresh RFC 5322 message id under the relay host's domain.
    fn new_message_id(&self) -> String {
        let domain = self
            .config
            .smtp_host
            .as_deref()
            .unwrap_or("localhost");
        format!("<{}@{}>", Uuid::new_v4(), domain)
    }

    /// Operator notification: all four fields in a fixed layout, with the
    /// submitter as `Reply-To` so the operator can answer directly.
    /// Returns the message together with its message id.
    pub fn compose_notification(
        &self,
        submission: &Submission,
    ) -> Result<(Message, String), DeliveryError> {
        let reply_to: Mailbox = submission
            .email
            .parse()
            .map_err(|e| DeliveryError::Address(format!("reply-to: {e}")))?;
        let message_id = self.new_message_id();

        let message = Message::builder()
            .from(self.sender()?)
            .to(self.recipient()?)
            .reply_to(reply_to)
            .subject(format!("Contact form: {}", submission.subject))
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_HTML)
            .body(notification_html(submission))
            .map_err(|e| DeliveryError::Compose(e.to_string()))?;

        Ok((message, message_id))
    }

    /// Sender confirmation: static informational body, no `Reply-To`.
    pub fn compose_confirmation(&self, submission: &Submission) -> Result<Message, DeliveryError> {
        let to: Mailbox = submission
            .email
            .parse()
            .map_err(|e| DeliveryError::Address(format!("confirmation recipient: {e}")))?;

        Message::builder()
            .from(self.sender()?)
            .to(to)
            .subject("We received your message")
            .message_id(Some(self.new_message_id()))
            .header(ContentType::TEXT_HTML)
            .body(confirmation_html(submission))
            .map_err(|e| DeliveryError::Compose(e.to_string()))
    }

    /// Run one logical delivery over the given relay: connectivity check,
    /// notification, confirmation, in that order.
    pub async fn deliver_with<R: SmtpRelay>(
        &self,
        relay: &R,
        submission: &Submission,
    ) -> Result<String, DeliveryError> {
        relay.check_connection().await?;

        let (notification, message_id) = self.compose_notification(submission)?;
        relay.send(notification).await?;
        info!(message_id = %message_id, "operator notification sent");

        let confirmation = self.compose_confirmation(submission)?;
        relay.send(confirmation).await?;
        debug!(to = %submission.email, "sender confirmation sent");

        Ok(message_id)
    }

    /// Build the implicit-TLS SMTP transport from the mail configuration.
    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
        let (Some(host), Some(port), Some(user), Some(pass)) = (
            self.config.smtp_host.as_deref(),
            self.config.smtp_port,
            self.config.smtp_user.as_deref(),
            self.config.smtp_pass.as_deref(),
        ) else {
            return Err(DeliveryError::Misconfigured(
                self.config.missing_keys().join(", "),
            ));
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| DeliveryError::Connect(e.to_string()))?
            .port(port)
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .build();

        Ok(transport)
    }
}

#[async_trait::async_trait]
impl SubmissionNotifier for Notifier {
    async fn deliver(&self, submission: &Submission) -> Result<String, DeliveryError> {
        let relay = self.transport()?;
        self.deliver_with(&relay, submission).await
    }
}

/// Escape text for embedding in the HTML bodies.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn notification_html(submission: &Submission) -> String {
    // Line breaks in the message body survive as <br> in the HTML.
    let message = escape_html(&submission.message).replace('\n', "<br>\n");
    format!(
        "<h2>New contact form submission</h2>\n\
         <p><strong>Name:</strong> {name}</p>\n\
         <p><strong>Email:</strong> {email}</p>\n\
         <p><strong>Subject:</strong> {subject}</p>\n\
         <p><strong>Message:</strong></p>\n\
         <p>{message}</p>\n",
        name = escape_html(&submission.name),
        email = escape_html(&submission.email),
        subject = escape_html(&submission.subject),
        message = message,
    )
}

fn confirmation_html(submission: &Submission) -> String {
    format!(
        "<p>Hi {name},</p>\n\
         <p>Thanks for getting in touch. Your message has been received and\n\
         we will reply as soon as we can.</p>\n\
         <p>This is an automated confirmation; there is no need to respond.</p>\n",
        name = escape_html(&submission.name),
    )
}
