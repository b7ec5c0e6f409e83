//! SMTP delivery of the sync report.

use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use pcsync_core::MailConfig;
use thiserror::Error;

use crate::report::ChangeReport;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("no report recipients configured")]
    NoRecipients,

    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

/// Sends reports over STARTTLS with the configured account.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    recipients: Vec<String>,
}

impl Mailer {
    /// # Errors
    ///
    /// Returns [`EmailError::Smtp`] if the relay host is invalid, or
    /// [`EmailError::NoRecipients`] when the recipient list is empty.
    pub fn new(config: &MailConfig) -> Result<Self, EmailError> {
        if config.recipients.is_empty() {
            return Err(EmailError::NoRecipients);
        }
        let credentials = Credentials::new(config.from_address.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
            recipients: config.recipients.clone(),
        })
    }

    /// # Errors
    ///
    /// Address, message-building and SMTP errors.
    pub async fn send_report(&self, report: &ChangeReport) -> Result<(), EmailError> {
        let subject = report.subject();
        let text = report.render_text()?;
        let html = report.render_html()?;
        let message = self.build_message(&subject, &text, &html)?;
        self.transport.send(message).await?;
        tracing::info!(
            recipients = self.recipients.len(),
            subject = %subject,
            "report email sent"
        );
        Ok(())
    }

    fn build_message(
        &self,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<Message, EmailError> {
        let mut builder = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .subject(subject);
        for recipient in &self.recipients {
            let address = recipient
                .parse()
                .map_err(|_| EmailError::InvalidAddress(recipient.clone()))?;
            builder = builder.to(address);
        }

        let message = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(text_body.to_owned()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html_body.to_owned()),
                ),
        )?;
        Ok(message)
    }
}

/// Emails the report when a mailer is configured, otherwise logs it. A
/// delivery failure is logged and never propagated.
pub async fn deliver_report(mailer: Option<&Mailer>, report: &ChangeReport) {
    match mailer {
        Some(mailer) => {
            if let Err(e) = mailer.send_report(report).await {
                tracing::error!(error = %e, "failed to send report email");
            }
        }
        None => log_report(report, "mail not configured; sync report follows"),
    }
}

/// Logs the plain-text report at info level.
pub(crate) fn log_report(report: &ChangeReport, message: &str) {
    match report.render_text() {
        Ok(text) => tracing::info!(report = %text, "{message}"),
        Err(e) => {
            tracing::error!(error = %e, subject = %report.subject(), "failed to render report");
        }
    }
}
