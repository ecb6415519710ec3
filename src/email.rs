//! Transactional email through the SendGrid v3 HTTP API.
//!
//! Handlers never wait on these calls: `Mailer::dispatch_*` spawn the request on the
//! actix runtime and only log the outcome.

use actix_web::rt::task::JoinHandle;
use serde::Serialize;

use crate::config::EmailConfig;
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct SendMailRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

/// A plain-text message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl Email {
    pub fn welcome(to: &str, name: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Thanks for joining in".to_string(),
            text: format!(
                "Welcome to the app, {}. Let me know how you get along with the app.",
                name
            ),
        }
    }

    pub fn goodbye(to: &str, name: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Sorry to see you go".to_string(),
            text: format!("Goodbye, {}. Thanks for using our service.", name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mailer {
    client: reqwest::Client,
    config: EmailConfig,
}

impl Mailer {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Sends `email` and waits for SendGrid to accept it. A disabled mailer succeeds
    /// without making a request.
    pub async fn send(&self, email: &Email) -> Result<(), AppError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            log::debug!("email disabled, skipping \"{}\" to {}", email.subject, email.to);
            return Ok(());
        };

        let body = SendMailRequest {
            personalizations: vec![Personalization {
                to: vec![Address { email: &email.to }],
            }],
            from: Address {
                email: &self.config.from,
            },
            subject: &email.subject,
            content: vec![Content {
                kind: "text/plain",
                value: &email.text,
            }],
        };

        let url = format!("{}/v3/mail/send", self.config.api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::InternalServerError(format!("Email request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::InternalServerError(format!(
                "Email API returned {}: {}",
                status, text
            )));
        }
        Ok(())
    }

    /// Fire-and-forget variant of `send`. The spawned task never fails; the handle only
    /// tells when delivery was attempted.
    pub fn dispatch(&self, email: Email) -> JoinHandle<()> {
        let mailer = self.clone();
        actix_web::rt::spawn(async move {
            match mailer.send(&email).await {
                Ok(()) => log::info!("sent \"{}\" email to {}", email.subject, email.to),
                Err(e) => log::warn!(
                    "failed to send \"{}\" email to {}: {}",
                    email.subject,
                    email.to,
                    e
                ),
            }
        })
    }

    pub fn dispatch_welcome(&self, to: &str, name: &str) -> JoinHandle<()> {
        self.dispatch(Email::welcome(to, name))
    }

    pub fn dispatch_goodbye(&self, to: &str, name: &str) -> JoinHandle<()> {
        self.dispatch(Email::goodbye(to, name))
    }
}
