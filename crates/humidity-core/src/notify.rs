//! Outbound email via the Mailgun messages API.

use crate::deadline::Deadline;
use crate::error::{HumidityError, Result};
use crate::run::Stage;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use std::io::Read;
use std::time::Duration;

/// Provider error bodies are truncated to this many bytes.
const MAX_ERROR_BODY: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub trait Notifier {
    fn send(&self, message: &Message, deadline: &Deadline) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MailgunClient
// ---------------------------------------------------------------------------

pub struct MailgunClient {
    client: Client,
    base_url: String,
    domain: String,
    api_key: String,
    request_timeout: Duration,
}

impl MailgunClient {
    pub fn new(
        base_url: impl Into<String>,
        domain: impl Into<String>,
        api_key: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| HumidityError::Notifier(format!("build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            domain: domain.into(),
            api_key: api_key.into(),
            request_timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/messages", self.base_url, self.domain)
    }
}

impl Notifier for MailgunClient {
    fn send(&self, message: &Message, deadline: &Deadline) -> Result<()> {
        let timeout = deadline.request_timeout(self.request_timeout, Stage::Notifying)?;
        let endpoint = self.endpoint();
        tracing::debug!(%endpoint, to = %message.to, "sending mail");

        let form = [
            ("from", message.from.as_str()),
            ("to", message.to.as_str()),
            ("subject", message.subject.as_str()),
            ("text", message.body.as_str()),
        ];
        let resp = self
            .client
            .post(&endpoint)
            .basic_auth("api", Some(&self.api_key))
            .header(ACCEPT, "application/json")
            .form(&form)
            .timeout(timeout)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    HumidityError::Notifier("execute mailgun request: timed out".to_string())
                } else {
                    HumidityError::Notifier(format!("execute mailgun request: {e}"))
                }
            })?;

        let status = resp.status();
        if status.as_u16() >= 300 {
            let mut buf = Vec::new();
            // Best effort: a truncated or unreadable body still yields the status.
            let _ = resp.take(MAX_ERROR_BODY).read_to_end(&mut buf);
            return Err(HumidityError::NotifierRejected {
                status: status.to_string(),
                body: String::from_utf8_lossy(&buf).trim().to_string(),
            });
        }
        Ok(())
    }
}
