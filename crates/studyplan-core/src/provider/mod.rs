//! External suggestion backends.
//!
//! Each chat-completion backend implements [`SuggestionProvider`], which
//! only knows where to send a request and how to shape its body. The
//! transport is a separate [`HttpClient`] so the whole path can run
//! against a scripted client in tests.
//!
//! - [`OpenAiProvider`]: hosted OpenAI, API key required
//! - [`LocalProvider`]: self-hosted OpenAI-compatible server, base URL
//!   required, key optional

pub mod http;
pub mod prompt;
pub mod response;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::error::ProviderError;
use crate::schedule::{ProviderKind, ProviderSettings, Task, UserSchedulingPreferences};

pub use http::{HttpClient, HttpResponse, ReqwestHttpClient};
pub use response::ExternalSuggestion;

/// Sampling temperature for every suggestion request.
pub const TEMPERATURE: f32 = 0.2;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const LOCAL_DEFAULT_MODEL: &str = "llama3.1";

/// A chat-completion backend.
pub trait SuggestionProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Full URL of the chat-completions endpoint.
    fn endpoint(&self) -> String;

    /// Bearer token, if one is configured.
    fn bearer_token(&self) -> Option<&str>;

    /// Model identifier sent in the body.
    fn model(&self) -> &str;

    /// Request body for one system + user exchange.
    fn build_body(&self, system: &str, user: &str) -> serde_json::Value {
        json!({
            "model": self.model(),
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": TEMPERATURE,
        })
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Hosted OpenAI chat completions.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            model: OPENAI_DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl SuggestionProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn endpoint(&self) -> String {
        chat_endpoint(&self.base_url)
    }

    fn bearer_token(&self) -> Option<&str> {
        Some(&self.api_key)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn build_body(&self, system: &str, user: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": TEMPERATURE,
            "response_format": { "type": "json_object" },
        })
    }
}

/// Self-hosted OpenAI-compatible server (Ollama, LM Studio, vLLM, ...).
#[derive(Debug, Clone)]
pub struct LocalProvider {
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl LocalProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            model: LOCAL_DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl SuggestionProvider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn endpoint(&self) -> String {
        chat_endpoint(&self.base_url)
    }

    fn bearer_token(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Build the backend selected by `settings`.
///
/// Returns `Ok(None)` when no backend is selected.
///
/// # Errors
///
/// Returns [`ProviderError::MissingCredentials`] if the selected backend
/// lacks a required setting.
pub fn from_settings(
    settings: &ProviderSettings,
) -> Result<Option<Box<dyn SuggestionProvider>>, ProviderError> {
    match settings.kind {
        ProviderKind::None => Ok(None),
        ProviderKind::OpenAi => {
            let key = non_empty(&settings.api_key).ok_or(ProviderError::MissingCredentials {
                provider: "openai",
                setting: "api_key",
            })?;
            let mut provider = OpenAiProvider::new(key);
            if let Some(base) = non_empty(&settings.base_url) {
                provider = provider.with_base_url(base);
            }
            if let Some(model) = non_empty(&settings.model) {
                provider = provider.with_model(model);
            }
            Ok(Some(Box::new(provider)))
        }
        ProviderKind::Local => {
            let base = non_empty(&settings.base_url).ok_or(ProviderError::MissingCredentials {
                provider: "local",
                setting: "base_url",
            })?;
            let mut provider = LocalProvider::new(base);
            if let Some(key) = non_empty(&settings.api_key) {
                provider = provider.with_api_key(key);
            }
            if let Some(model) = non_empty(&settings.model) {
                provider = provider.with_model(model);
            }
            Ok(Some(Box::new(provider)))
        }
    }
}

/// Send one batch request and return the validated suggestions.
///
/// # Errors
///
/// Returns a [`ProviderError`] for transport failures, non-success
/// statuses, unreadable completions and malformed envelopes.
pub async fn request_suggestions(
    http: &dyn HttpClient,
    provider: &dyn SuggestionProvider,
    tasks: &[Task],
    preferences: &UserSchedulingPreferences,
    now: DateTime<Utc>,
) -> Result<Vec<ExternalSuggestion>, ProviderError> {
    let user = prompt::render_user_prompt(tasks, preferences, now);
    let body = provider.build_body(prompt::SYSTEM_PROMPT, &user);

    let response = http
        .post_json(&provider.endpoint(), provider.bearer_token(), &body)
        .await?;
    if !response.is_success() {
        return Err(ProviderError::Status {
            status: response.status,
            body: response.body,
        });
    }

    let content = response::completion_content(&response.body)?;
    let task_ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    response::parse_suggestions(&content, &task_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_kind_builds_nothing() {
        let settings = ProviderSettings::default();
        assert!(from_settings(&settings).unwrap().is_none());
    }

    #[test]
    fn openai_requires_api_key() {
        let settings = ProviderSettings {
            kind: ProviderKind::OpenAi,
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        let err = from_settings(&settings).err().unwrap();
        assert!(matches!(
            err,
            ProviderError::MissingCredentials {
                setting: "api_key",
                ..
            }
        ));
    }

    #[test]
    fn openai_uses_default_endpoint_and_json_mode() {
        let settings = ProviderSettings {
            kind: ProviderKind::OpenAi,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let provider = from_settings(&settings).unwrap().unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(provider.bearer_token(), Some("sk-test"));

        let body = provider.build_body("sys", "usr");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn local_requires_base_url_but_not_key() {
        let missing = ProviderSettings {
            kind: ProviderKind::Local,
            ..Default::default()
        };
        assert!(from_settings(&missing).is_err());

        let settings = ProviderSettings {
            kind: ProviderKind::Local,
            base_url: Some("http://localhost:11434/v1/".to_string()),
            model: Some("qwen2.5".to_string()),
            ..Default::default()
        };
        let provider = from_settings(&settings).unwrap().unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:11434/v1/chat/completions");
        assert!(provider.bearer_token().is_none());
        let body = provider.build_body("sys", "usr");
        assert_eq!(body["model"], "qwen2.5");
        assert!(body.get("response_format").is_none());
    }
}
