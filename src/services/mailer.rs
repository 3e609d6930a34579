//! Outbound email. Resend when configured, otherwise a logger.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::config::MailConfig;
use crate::error::{Error, Result};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()>;
}

pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, from, "https://api.resend.com/emails")
    }

    pub fn with_endpoint(api_key: impl Into<String>, from: impl Into<String>, endpoint: impl Into<String>) -> Self {
        ResendMailer {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            from: from.into(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| Error::Internal(format!("email request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!("email provider returned {status}: {body}")));
        }
        Ok(())
    }
}

/// Used when no provider is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<()> {
        tracing::debug!(to, subject, "email delivery disabled, skipping");
        Ok(())
    }
}

/// For user text placed inside email HTML.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match &config.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(key.clone(), config.from.clone())),
        None => Arc::new(LogMailer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn resend_posts_bearer_authenticated_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email_1" })))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = ResendMailer::with_endpoint("re_test", "ff@example.com", format!("{}/emails", server.uri()));
        mailer.send("user@example.com", "Hello", "<p>hi</p>").await.unwrap();
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            html_escape(r#"<b>Tom & Jerry's "cafe"</b>"#),
            "&lt;b&gt;Tom &amp; Jerry&#39;s &quot;cafe&quot;&lt;/b&gt;"
        );
    }

    #[tokio::test]
    async fn provider_errors_surface() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad from"))
            .mount(&server)
            .await;

        let mailer = ResendMailer::with_endpoint("re_test", "ff@example.com", format!("{}/emails", server.uri()));
        assert!(mailer.send("user@example.com", "Hello", "<p>hi</p>").await.is_err());
    }
}
