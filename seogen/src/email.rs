//! SMTP delivery for the settings page's "send test email" action.
//!
//! The transport is built per call from caller-supplied settings; nothing is pooled.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{info, instrument, warn};

use crate::db::models::settings::SmtpSettings;
use crate::errors::Error;
use crate::providers::ProviderError;

pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailService {
    /// `secure: true` means implicit TLS (usually port 465); otherwise STARTTLS is required.
    pub fn from_smtp(settings: &SmtpSettings) -> Result<Self, Error> {
        let builder = if settings.secure.unwrap_or(false) {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        }
        .map_err(|e| Error::bad_request(format!("Invalid SMTP host '{}': {e}", settings.host)))?;

        let mut builder = builder.credentials(Credentials::new(settings.user.clone(), settings.pass.clone()));
        if let Some(port) = settings.port {
            builder = builder.port(port);
        }

        let from_address = settings.from.as_deref().unwrap_or(&settings.user);
        let from = from_address
            .parse::<Mailbox>()
            .map_err(|e| Error::bad_request(format!("Invalid sender address '{from_address}': {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    #[instrument(skip_all)]
    pub async fn send_test_email(&self, to_email: &str) -> Result<(), Error> {
        let to = to_email
            .parse::<Mailbox>()
            .map_err(|e| Error::bad_request(format!("Invalid testEmail '{to_email}': {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("SMTP test email")
            .header(ContentType::TEXT_PLAIN)
            .body("Your SMTP settings work. This message was sent from the SEO content dashboard.".to_string())
            .map_err(|e| Error::bad_request(format!("Cannot build email message: {e}")))?;

        self.transport.send(message).await.map_err(|e| {
            warn!("SMTP test email failed: {e}");
            ProviderError::Email(e.to_string())
        })?;

        info!("SMTP test email sent");
        Ok(())
    }
}
