// Email Service Types - Shared types and structures for email module

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during email operations
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Failed to send email: {0}")]
    SendError(String),

    #[error("Template rendering error: {0}")]
    TemplateError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Generic email message structure that can be sent
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
    pub reply_to: Option<String>,
}

impl EmailMessage {
    pub fn new(from: String, to: Vec<String>, subject: String, html: String) -> Self {
        Self {
            from,
            to,
            subject,
            html,
            text: None,
            reply_to: None,
        }
    }

    pub fn with_text(mut self, text: String) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_reply_to(mut self, reply_to: String) -> Self {
        self.reply_to = Some(reply_to);
        self
    }
}

/// Delivery seam for built messages.
///
/// Failures are for the caller to log; nothing in the referral or wave flows
/// may fail because a send did.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

/// Trait that all email builders must implement
pub trait EmailBuilder {
    /// Build the email message
    fn build(&self) -> Result<EmailMessage, EmailError>;
}

/// Data structure for the referral invite template
#[derive(Serialize)]
pub struct ReferralInviteEmailData {
    pub referrer_code: String,
    pub app_name: String,
    pub app_url: String,
    pub support_email: String,
}

/// Data structure for the referral verified template
#[derive(Serialize)]
pub struct ReferralVerifiedEmailData {
    pub referred_email: String,
    pub referral_count: i32,
    pub app_name: String,
    pub app_url: String,
    pub support_email: String,
}

/// Data structure for the admin digest template
#[derive(Serialize)]
pub struct AdminDigestEmailData {
    pub period: String,
    pub total_users: i64,
    pub pending_referrals: i64,
    pub verified_referrals: i64,
    pub app_name: String,
    pub app_url: String,
}

/// Resend API specific email format
///
/// Optional fields are omitted from the JSON payload when `None` so the API
/// never sees explicit nulls.
#[derive(Debug, Serialize)]
pub struct ResendEmailPayload {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl From<EmailMessage> for ResendEmailPayload {
    fn from(message: EmailMessage) -> Self {
        Self {
            from: message.from,
            to: message.to,
            subject: message.subject,
            html: message.html,
            text: message.text,
            reply_to: message.reply_to,
        }
    }
}
