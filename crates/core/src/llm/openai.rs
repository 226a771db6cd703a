use crate::config::Settings;
use crate::llm::error::GenerationFailure;
use crate::llm::{CompletionGateway, Provider};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Client for any OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// A custom `OPENAI_BASE_URL` may point at a self-hosted proxy, in which case the API key is
/// optional.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let api_key = if base_url == DEFAULT_BASE_URL {
            Some(settings.require_openai_api_key()?.to_string())
        } else {
            settings.openai_api_key.clone()
        };
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    fn failure(stage: &'static str, detail: String, raw_output: Option<String>) -> anyhow::Error {
        GenerationFailure {
            provider: Provider::OpenAI,
            stage,
            detail,
            raw_output,
        }
        .into()
    }

    fn first_choice_text(res: ChatCompletionResponse) -> Option<String> {
        res.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
    }
}

#[async_trait::async_trait]
impl CompletionGateway for OpenAiClient {
    fn provider_name(&self) -> &'static str {
        Provider::OpenAI.as_str()
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let req = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let mut builder = self.http.post(url).json(&req);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let res = builder
            .send()
            .await
            .map_err(|e| Self::failure("http", format!("request failed: {e}"), None))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| Self::failure("http", format!("failed to read response body: {e}"), None))?;
        if !status.is_success() {
            return Err(Self::failure("http", format!("status={status}"), Some(text)));
        }

        let parsed = match serde_json::from_str::<ChatCompletionResponse>(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(Self::failure(
                    "decode",
                    format!("unexpected chat completion response: {e}"),
                    Some(text),
                ))
            }
        };

        Self::first_choice_text(parsed).ok_or_else(|| {
            Self::failure("empty_content", "first choice has no message content".to_string(), None)
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn takes_first_choice_content() {
        let res: ChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "[]"}, "finish_reason": "stop"},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
            ]
        }))
        .unwrap();
        assert_eq!(OpenAiClient::first_choice_text(res).as_deref(), Some("[]"));
    }

    #[test]
    fn empty_or_missing_content_yields_none() {
        let res: ChatCompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(OpenAiClient::first_choice_text(res).is_none());

        let res: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert!(OpenAiClient::first_choice_text(res).is_none());
    }
}
