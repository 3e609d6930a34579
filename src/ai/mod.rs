// src/ai/mod.rs
//! Generative-model plumbing and the AI features built on it.
//!
//! Features talk to a [`GenerativeModel`] obtained from a [`ModelFactory`], so
//! tests swap the HTTP client for a stub without touching feature code.

pub mod aggregator;
pub mod big4;
pub mod categorization;
pub mod forecast;
pub mod gemini;
pub mod optimizer;
pub mod prompts;
pub mod rate_limiter;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::AiConfig;

pub use gemini::GeminiClient;
pub use rate_limiter::RateLimiter;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service is not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("AI API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid JSON response from AI: {0}")]
    Parse(String),

    #[error("AI response did not match expected schema: {0}")]
    Schema(String),
}

impl AiError {
    /// Rate limits, server errors and timeouts are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            AiError::Api { status, .. } => *status == 429 || (500..=599).contains(status),
            AiError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Text-in, text-out model.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Builds a model for a caller; `user_key` is the caller's own API key when set.
pub trait ModelFactory: Send + Sync {
    fn model_for(&self, user_key: Option<&str>) -> Result<Arc<dyn GenerativeModel>, AiError>;
}

/// Gemini over HTTP, preferring the caller's key over the server key.
pub struct GeminiFactory {
    config: AiConfig,
    http: reqwest::Client,
}

impl GeminiFactory {
    pub fn new(config: AiConfig) -> Self {
        Self { config, http: gemini::http_client() }
    }
}

impl ModelFactory for GeminiFactory {
    fn model_for(&self, user_key: Option<&str>) -> Result<Arc<dyn GenerativeModel>, AiError> {
        let key = user_key
            .filter(|k| !k.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.config.api_key.clone())
            .ok_or(AiError::NotConfigured)?;
        Ok(Arc::new(GeminiClient::with_client(self.http.clone(), &self.config, key)))
    }
}

/// Body of the first fenced block in `text`, or the trimmed text itself.
pub fn extract_json(text: &str) -> &str {
    for fence in ["```json", "```"] {
        if let Some(start) = text.find(fence) {
            let body = &text[start + fence.len()..];
            if let Some(end) = body.find("```") {
                return body[..end].trim();
            }
        }
    }
    text.trim()
}

/// Ask for JSON matching `schema`, parse it into `T`, then run `validate`.
pub async fn generate_object<T, F>(
    model: &dyn GenerativeModel,
    prompt: &str,
    schema: &str,
    validate: F,
) -> Result<T, AiError>
where
    T: DeserializeOwned,
    F: FnOnce(&T) -> Result<(), String>,
{
    let full_prompt = format!(
        "{prompt}\n\nRespond with valid JSON matching this structure:\n{schema}\n\nReturn JSON only."
    );
    let text = model.generate(&full_prompt).await?;

    let value: serde_json::Value = serde_json::from_str(extract_json(&text)).map_err(|e| {
        tracing::warn!(error = %e, "AI response was not JSON");
        AiError::Parse(e.to_string())
    })?;
    let parsed: T = serde_json::from_value(value).map_err(|e| AiError::Schema(e.to_string()))?;
    validate(&parsed).map_err(AiError::Schema)?;
    Ok(parsed)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Replays canned replies in order and counts calls.
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: Mutex<Vec<Result<String, AiError>>>,
        pub calls: AtomicUsize,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn replying(replies: Vec<Result<String, AiError>>) -> Self {
            let mut replies = replies;
            replies.reverse();
            Self { replies: Mutex::new(replies), ..Default::default() }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, prompt: &str) -> Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(AiError::Api { status: 500, message: "no scripted reply".into() }))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::testing::ScriptedModel;
    use super::*;
    use crate::config::AppConfig;

    #[derive(Debug, Deserialize)]
    struct Answer {
        value: i64,
    }

    #[test]
    fn extracts_fenced_json() {
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json("Sure!\n```\n[1,2]\n```\nbye"), "[1,2]");
        assert_eq!(extract_json("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn generate_object_parses_and_validates() {
        let model = ScriptedModel::replying(vec![Ok("```json\n{\"value\": 4}\n```".into())]);
        let answer: Answer = generate_object(&model, "give", "{value:number}", |a: &Answer| {
            if a.value > 0 { Ok(()) } else { Err("value must be positive".into()) }
        })
        .await
        .unwrap();
        assert_eq!(answer.value, 4);
        assert!(model.prompts.lock().unwrap()[0].contains("Return JSON only."));

        let model = ScriptedModel::replying(vec![Ok("{\"value\": -1}".into())]);
        let err = generate_object::<Answer, _>(&model, "give", "{}", |a| {
            if a.value > 0 { Ok(()) } else { Err("value must be positive".into()) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AiError::Schema(_)));

        let model = ScriptedModel::replying(vec![Ok("not json".into())]);
        let err = generate_object::<Answer, _>(&model, "give", "{}", |_| Ok(())).await.unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
    }

    #[test]
    fn factory_prefers_user_key_and_requires_one() {
        let mut config = AppConfig::for_database("sqlite::memory:").ai;
        let factory = GeminiFactory::new(config.clone());
        assert!(matches!(factory.model_for(None), Err(AiError::NotConfigured)));
        assert!(factory.model_for(Some("user-key")).is_ok());

        config.api_key = Some("server-key".into());
        let factory = GeminiFactory::new(config);
        assert!(factory.model_for(None).is_ok());
        assert!(factory.model_for(Some("  ")).is_ok());
    }

    #[test]
    fn transient_errors() {
        assert!(AiError::Api { status: 429, message: String::new() }.is_transient());
        assert!(AiError::Api { status: 503, message: String::new() }.is_transient());
        assert!(!AiError::Api { status: 400, message: String::new() }.is_transient());
        assert!(!AiError::NotConfigured.is_transient());
    }
}
