use std::time::Duration;

use anyhow::Context as _;
use serde_json::Value;

use crate::error::LibraryError;

pub const DEFAULT_BASE_URL: &str = "https://api.blackbox.ai";
pub const DEFAULT_MODEL: &str = "blackboxai/anthropic/claude-sonnet-4.5";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub default_model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CompletionConfig {
    pub fn from_env() -> Self {
        let api_key = env_non_empty("BOOKSHELF_COMPLETION_API_KEY");
        let base_url = env_non_empty("BOOKSHELF_COMPLETION_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let default_model = env_non_empty("BOOKSHELF_COMPLETION_MODEL")
            .unwrap_or_else(|| DEFAULT_MODEL.to_owned());
        Self {
            base_url,
            api_key,
            default_model,
            timeout: REQUEST_TIMEOUT,
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub fn chat_completions_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/chat/completions")
}

#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build completion http client")?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// The configured key, or the `Configuration` error every caller reports.
    pub fn require_api_key(&self) -> Result<&str, LibraryError> {
        self.config.api_key.as_deref().ok_or_else(|| {
            LibraryError::Configuration("BOOKSHELF_COMPLETION_API_KEY is not set".to_owned())
        })
    }

    /// Sends one non-streaming chat request and returns the first choice's
    /// text. Unexpected response shapes come back as `Upstream` with the raw
    /// body attached.
    pub async fn complete(
        &self,
        model: Option<&str>,
        messages: &[Value],
    ) -> Result<String, LibraryError> {
        let api_key = self.require_api_key()?;

        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.config.default_model.as_str());
        let endpoint = chat_completions_endpoint(&self.config.base_url);
        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": false,
        });

        tracing::info!(model, messages = messages.len(), "completion request");

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| LibraryError::Upstream {
                message: format!("POST {endpoint}: {err}"),
                details: None,
            })?;

        let status = response.status();
        let raw = response.text().await.map_err(|err| LibraryError::Upstream {
            message: format!("read completion response body: {err}"),
            details: None,
        })?;

        let value = serde_json::from_str::<Value>(&raw).ok();
        let content = value.as_ref().and_then(extract_message_content);
        match content {
            Some(content) => Ok(content.to_owned()),
            None => {
                tracing::warn!(%status, "completion response has no message content");
                Err(LibraryError::Upstream {
                    message: "invalid response from completion API".to_owned(),
                    details: Some(value.unwrap_or(Value::String(raw))),
                })
            }
        }
    }
}

fn extract_message_content(value: &Value) -> Option<&str> {
    value.pointer("/choices/0/message/content")?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trims_trailing_slash() {
        assert_eq!(
            chat_completions_endpoint("https://api.example.com/"),
            "https://api.example.com/chat/completions"
        );
    }

    #[test]
    fn extract_reads_first_choice() {
        let value = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "first" } },
                { "message": { "role": "assistant", "content": "second" } },
            ]
        });
        assert_eq!(extract_message_content(&value), Some("first"));
    }

    #[test]
    fn extract_rejects_other_shapes() {
        assert_eq!(extract_message_content(&serde_json::json!({})), None);
        assert_eq!(
            extract_message_content(&serde_json::json!({ "choices": [] })),
            None
        );
        assert_eq!(
            extract_message_content(&serde_json::json!({
                "choices": [{ "message": { "content": 42 } }]
            })),
            None
        );
    }

    #[tokio::test]
    async fn missing_key_short_circuits() -> anyhow::Result<()> {
        let client = CompletionClient::new(CompletionConfig {
            // Unroutable: a network attempt would fail with Upstream instead.
            base_url: "http://127.0.0.1:9".to_owned(),
            api_key: None,
            default_model: DEFAULT_MODEL.to_owned(),
            timeout: Duration::from_secs(1),
        })?;
        assert!(!client.is_configured());

        let err = client
            .complete(None, &[serde_json::json!({"role": "user", "content": "hi"})])
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::Configuration(_)));
        Ok(())
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = CompletionConfig {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: Some("sk-secret".to_owned()),
            default_model: DEFAULT_MODEL.to_owned(),
            timeout: REQUEST_TIMEOUT,
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
