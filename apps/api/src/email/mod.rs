//! Account confirmation email, delivered through the Resend API.

pub mod handlers;
pub mod template;

use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;

const RESEND_API_URL: &str = "https://api.resend.com/emails";
const FROM_ADDRESS: &str = "Remi <onboarding@resend.dev>";
const CONFIRMATION_SUBJECT: &str = "Welcome to Remi - Confirm Your Account";

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
}

/// Thin mailer over the Resend HTTP API. Single request/response, no retry;
/// a failed delivery surfaces as an `Email` error.
#[derive(Clone)]
pub struct Mailer {
    client: Client,
    api_key: String,
}

impl Mailer {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    pub async fn send_confirmation(
        &self,
        email: &str,
        name: Option<&str>,
        confirmation_url: &str,
    ) -> Result<(), AppError> {
        let body = ResendRequest {
            from: FROM_ADDRESS,
            to: [email],
            subject: CONFIRMATION_SUBJECT,
            html: template::render_confirmation(name, confirmation_url),
        };

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Email(format!("Resend request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Email(format!(
                "Resend returned {status}: {detail}"
            )));
        }

        info!("Confirmation email sent to {email}");
        Ok(())
    }
}
