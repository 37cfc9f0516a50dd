// Email Service Module
// Orchestrates template rendering (builders) and delivery (sender/sink)

pub mod builders;
pub mod sender;
pub mod types;

use crate::app_config::EmailConfig;
use builders::{AdminDigestEmailBuilder, ReferralInviteEmailBuilder, ReferralVerifiedEmailBuilder};
use handlebars::Handlebars;
use sender::EmailSender;
use std::sync::Arc;
use tracing::{info, instrument};
use types::EmailBuilder;

// Re-export commonly used types for convenience
pub use types::{EmailError, EmailMessage, NotificationSink};

/// Email service for the referral/waitlist flows
#[derive(Clone)]
pub struct EmailService {
    sink: Arc<dyn NotificationSink>,
    config: EmailConfig,
    templates: Arc<Handlebars<'static>>,
}

impl EmailService {
    /// Create a service wired to the Resend-style HTTP sender
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let sender =
            EmailSender::new_resend(config.resend_api_key.clone(), config.resend_api_url.clone())
                .with_max_retries(3)
                .with_retry_delay(std::time::Duration::from_secs(1));

        Self::with_sink(config, Arc::new(sender))
    }

    /// Create a service over any delivery sink (tests inject a recorder here)
    pub fn with_sink(
        config: EmailConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, EmailError> {
        let mut templates = Handlebars::new();
        Self::register_templates(&mut templates)?;

        Ok(Self {
            sink,
            config,
            templates: Arc::new(templates),
        })
    }

    /// Register all email templates
    fn register_templates(templates: &mut Handlebars) -> Result<(), EmailError> {
        let invite_template = include_str!("../../../templates/email/referral_invite.html");
        templates
            .register_template_string("referral_invite", invite_template)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let verified_template = include_str!("../../../templates/email/referral_verified.html");
        templates
            .register_template_string("referral_verified", verified_template)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let digest_template = include_str!("../../../templates/email/admin_digest.html");
        templates
            .register_template_string("admin_digest", digest_template)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        Ok(())
    }

    /// Invite a referred friend to join the waitlist
    #[instrument(skip(self))]
    pub async fn send_referral_invite(
        &self,
        to_email: &str,
        referrer_code: &str,
    ) -> Result<(), EmailError> {
        info!("Sending referral invite to {}", to_email);

        let builder =
            ReferralInviteEmailBuilder::new(to_email, referrer_code, &self.config, &self.templates);
        let message = builder.build()?;
        self.sink.send(message).await
    }

    /// Tell a referrer their referral was verified
    #[instrument(skip(self))]
    pub async fn send_referral_verified(
        &self,
        to_email: &str,
        referred_email: &str,
        referral_count: i32,
    ) -> Result<(), EmailError> {
        info!("Sending referral-verified notification to {}", to_email);

        let builder = ReferralVerifiedEmailBuilder::new(
            to_email,
            referred_email,
            referral_count,
            &self.config,
            &self.templates,
        );
        let message = builder.build()?;
        self.sink.send(message).await
    }

    /// Send the periodic waitlist digest to an admin address
    #[instrument(skip(self))]
    pub async fn send_admin_digest(
        &self,
        to_email: &str,
        period: &str,
        total_users: i64,
        pending_referrals: i64,
        verified_referrals: i64,
    ) -> Result<(), EmailError> {
        info!("Sending admin digest to {}", to_email);

        let builder = AdminDigestEmailBuilder::new(
            to_email,
            period,
            total_users,
            pending_referrals,
            verified_referrals,
            &self.config,
            &self.templates,
        );
        let message = builder.build()?;
        self.sink.send(message).await
    }
}
