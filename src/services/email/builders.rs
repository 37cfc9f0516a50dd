// Email Builders - Builders for different types of emails
// Each builder knows how to construct its specific email type

use super::types::{
    AdminDigestEmailData, EmailBuilder, EmailError, EmailMessage, ReferralInviteEmailData,
    ReferralVerifiedEmailData,
};
use crate::app_config::EmailConfig;
use handlebars::Handlebars;
use tracing::instrument;

/// Builder for the invite sent to a referred friend
pub struct ReferralInviteEmailBuilder<'a> {
    to_email: &'a str,
    referrer_code: &'a str,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> ReferralInviteEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        referrer_code: &'a str,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            referrer_code,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for ReferralInviteEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = ReferralInviteEmailData {
            referrer_code: self.referrer_code.to_string(),
            app_name: self.config.from_name.clone(),
            app_url: self.config.frontend_url.clone(),
            support_email: self.config.support_email.clone(),
        };

        let html = self
            .templates
            .render("referral_invite", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let signup_url = format!("{}/join?ref={}", self.config.frontend_url, self.referrer_code);
        let text = format!(
            "Hi,\n\n\
            A friend invited you to {}. Join the waitlist here:\n\n\
            {}\n\n\
            If this wasn't meant for you, you can ignore this email.\n\n\
            Best regards,\n\
            The {} Team",
            self.config.from_name, signup_url, self.config.from_name
        );

        Ok(EmailMessage::new(
            format!("{} <{}>", self.config.from_name, self.config.from_email),
            vec![self.to_email.to_string()],
            format!("You've been invited to {}", self.config.from_name),
            html,
        )
        .with_text(text))
    }
}

/// Builder for the note a referrer gets when their referral verifies
pub struct ReferralVerifiedEmailBuilder<'a> {
    to_email: &'a str,
    referred_email: &'a str,
    referral_count: i32,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> ReferralVerifiedEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        referred_email: &'a str,
        referral_count: i32,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            referred_email,
            referral_count,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for ReferralVerifiedEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = ReferralVerifiedEmailData {
            referred_email: self.referred_email.to_string(),
            referral_count: self.referral_count,
            app_name: self.config.from_name.clone(),
            app_url: self.config.frontend_url.clone(),
            support_email: self.config.support_email.clone(),
        };

        let html = self
            .templates
            .render("referral_verified", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Good news!\n\n\
            {} just signed up with your referral. That's {} verified referral(s) so far.\n\n\
            Keep climbing the leaderboard at {}.\n\n\
            Best regards,\n\
            The {} Team",
            self.referred_email, self.referral_count, self.config.frontend_url, self.config.from_name
        );

        Ok(EmailMessage::new(
            format!("{} <{}>", self.config.from_name, self.config.from_email),
            vec![self.to_email.to_string()],
            "Your referral just signed up!".to_string(),
            html,
        )
        .with_text(text))
    }
}

/// Builder for the periodic admin digest
pub struct AdminDigestEmailBuilder<'a> {
    to_email: &'a str,
    period: &'a str,
    total_users: i64,
    pending_referrals: i64,
    verified_referrals: i64,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> AdminDigestEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        period: &'a str,
        total_users: i64,
        pending_referrals: i64,
        verified_referrals: i64,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            period,
            total_users,
            pending_referrals,
            verified_referrals,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for AdminDigestEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = AdminDigestEmailData {
            period: self.period.to_string(),
            total_users: self.total_users,
            pending_referrals: self.pending_referrals,
            verified_referrals: self.verified_referrals,
            app_name: self.config.from_name.clone(),
            app_url: self.config.frontend_url.clone(),
        };

        let html = self
            .templates
            .render("admin_digest", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "{} waitlist digest ({})\n\n\
            Total members: {}\n\
            Pending referrals: {}\n\
            Verified referrals: {}\n",
            self.config.from_name,
            self.period,
            self.total_users,
            self.pending_referrals,
            self.verified_referrals
        );

        Ok(EmailMessage::new(
            format!("{} <{}>", self.config.from_name, self.config.from_email),
            vec![self.to_email.to_string()],
            format!("{} waitlist digest - {}", self.config.from_name, self.period),
            html,
        )
        .with_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_config() -> EmailConfig {
        EmailConfig {
            resend_api_key: "test_key".to_string(),
            resend_api_url: "https://api.resend.com/emails".to_string(),
            from_email: "noreply@example.com".to_string(),
            from_name: "Test App".to_string(),
            support_email: "support@example.com".to_string(),
            frontend_url: "https://app.example.com".to_string(),
        }
    }

    fn setup_test_templates() -> Handlebars<'static> {
        let mut templates = Handlebars::new();
        templates
            .register_template_string("referral_invite", "Join with {{referrer_code}}")
            .unwrap();
        templates
            .register_template_string("referral_verified", "{{referred_email}} signed up")
            .unwrap();
        templates
            .register_template_string("admin_digest", "{{total_users}} members")
            .unwrap();
        templates
    }

    #[test]
    fn test_referral_invite_builder() {
        let config = setup_test_config();
        let templates = setup_test_templates();
        let builder =
            ReferralInviteEmailBuilder::new("friend@example.com", "AB12CD34", &config, &templates);

        let message = builder.build().unwrap();
        assert_eq!(message.to, vec!["friend@example.com"]);
        assert_eq!(message.subject, "You've been invited to Test App");
        assert!(message.html.contains("AB12CD34"));
        assert!(message.text.unwrap().contains("ref=AB12CD34"));
    }

    #[test]
    fn test_referral_verified_builder() {
        let config = setup_test_config();
        let templates = setup_test_templates();
        let builder = ReferralVerifiedEmailBuilder::new(
            "owner@example.com",
            "friend@example.com",
            3,
            &config,
            &templates,
        );

        let message = builder.build().unwrap();
        assert_eq!(message.to, vec!["owner@example.com"]);
        assert_eq!(message.subject, "Your referral just signed up!");
        assert!(message.html.contains("friend@example.com"));
        assert!(message.text.unwrap().contains("3 verified referral(s)"));
    }

    #[test]
    fn test_admin_digest_builder() {
        let config = setup_test_config();
        let templates = setup_test_templates();
        let builder = AdminDigestEmailBuilder::new(
            "admin@example.com",
            "last 7 days",
            120,
            14,
            31,
            &config,
            &templates,
        );

        let message = builder.build().unwrap();
        assert_eq!(message.subject, "Test App waitlist digest - last 7 days");
        assert!(message.html.contains("120"));
        let text = message.text.unwrap();
        assert!(text.contains("Pending referrals: 14"));
        assert!(text.contains("Verified referrals: 31"));
    }
}
