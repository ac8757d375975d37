use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::error::AuthError;

/// Out-of-band delivery of a verification code to the user.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(&self, to_email: &str, code: &str) -> Result<(), AuthError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    mailer: SmtpTransport,
    from_email: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, AuthError> {
        let creds = Credentials::new(config.user.clone(), config.app_password.clone());

        let mailer = SmtpTransport::relay("smtp.gmail.com")
            .map_err(|e| AuthError::Config(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!("OTP mailer initialized with Gmail SMTP");

        Ok(Self {
            mailer,
            from_email: config.user.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
        html_body: &str,
    ) -> Result<(), AuthError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| {
                        AuthError::Dispatch(e.to_string())
                    })?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| AuthError::Dispatch(e.to_string()))?)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        // Send in the blocking pool to keep the async runtime free.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(
                    to = %to_email,
                    subject = %subject,
                    "Email sent successfully"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e.to_string(),
                    to = %to_email,
                    "Failed to send email"
                );
                Err(AuthError::Dispatch(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl OtpMailer for SmtpMailer {
    async fn send_otp(&self, to_email: &str, code: &str) -> Result<(), AuthError> {
        let html_body = format!(
            r###"            <html>
                <body style="font-family: Arial, sans-serif;">
                    <h2>Your verification code</h2>
                    <p>Enter the following code to continue:</p>
                    <p style="font-size: 28px; letter-spacing: 4px; font-weight: bold;">{}</p>
                    <p style="color: #666; font-size: 12px;">
                        This code will expire in 5 minutes. If you didn't request this, please ignore this email.
                    </p>
                </body>
            </html>
            "###,
            code
        );

        let plain_body = format!(
            "Your verification code\n\n            Enter the following code to continue:\n\n            {}

            This code will expire in 5 minutes. If you didn't request this, please ignore this email.",
            code
        );

        self.send_email(to_email, "Your Verification Code", &plain_body, &html_body)
            .await
    }
}

/// Recording mailer for tests.
#[derive(Default)]
pub struct MockMailer {
    sent: std::sync::Mutex<Vec<(String, String)>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// (recipient, code) pairs in dispatch order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl OtpMailer for MockMailer {
    async fn send_otp(&self, to_email: &str, code: &str) -> Result<(), AuthError> {
        self.sent
            .lock()
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("Mock mailer mutex poisoned: {}", e)))?
            .push((to_email.to_string(), code.to_string()));
        Ok(())
    }
}
