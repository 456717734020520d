//! Failure notification delivery over an SMTP relay.

use anyhow::{Context, Result};
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::Mailbox;
use lettre::{Message, SmtpTransport, Transport};
use serde::Deserialize;
use std::error::Error;

/// Mail priority, sent as an `X-Priority` header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    High,
    Normal,
    Low,
}

impl Priority {
    fn x_priority(self) -> &'static str {
        match self {
            Priority::High => "1 (Highest)",
            Priority::Normal => "3 (Normal)",
            Priority::Low => "5 (Lowest)",
        }
    }
}

#[derive(Debug, Clone)]
struct XPriority(Priority);

impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        match s.trim().chars().next() {
            Some('1') | Some('2') => Ok(XPriority(Priority::High)),
            Some('3') => Ok(XPriority(Priority::Normal)),
            Some('4') | Some('5') => Ok(XPriority(Priority::Low)),
            _ => Err(format!("invalid X-Priority '{}'", s).into()),
        }
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.x_priority().to_string())
    }
}

/// A fully composed notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
    pub priority: Priority,
}

/// Anything that can deliver a notification
pub trait Notifier {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Build the MIME message for a notification
pub fn build_message(notification: &Notification) -> Result<Message> {
    let from: Mailbox = notification
        .from
        .parse()
        .with_context(|| format!("Invalid sender address '{}'", notification.from))?;

    let mut builder = Message::builder()
        .from(from)
        .subject(notification.subject.clone())
        .header(ContentType::TEXT_HTML)
        .header(XPriority(notification.priority));

    if notification.to.is_empty() {
        anyhow::bail!("Notification has no recipients");
    }
    for recipient in &notification.to {
        let mailbox: Mailbox = recipient
            .parse()
            .with_context(|| format!("Invalid recipient address '{}'", recipient))?;
        builder = builder.to(mailbox);
    }

    builder
        .body(notification.html_body.clone())
        .context("Failed to build notification message")
}

/// Sends through an unauthenticated relay (port 25 by default)
pub struct SmtpNotifier {
    host: String,
    port: u16,
}

impl SmtpNotifier {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        SmtpNotifier {
            host: host.into(),
            port,
        }
    }
}

impl Notifier for SmtpNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        let message = build_message(notification)?;
        let mailer = SmtpTransport::builder_dangerous(&self.host)
            .port(self.port)
            .build();
        mailer
            .send(&message)
            .with_context(|| format!("Failed to send mail via {}:{}", self.host, self.port))?;
        Ok(())
    }
}
