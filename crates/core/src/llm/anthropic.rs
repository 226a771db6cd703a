use crate::config::Settings;
use crate::llm::error::GenerationFailure;
use crate::llm::{CompletionGateway, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
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
            max_tokens,
        })
    }

    fn failure(stage: &'static str, detail: String, raw_output: Option<String>) -> anyhow::Error {
        GenerationFailure {
            provider: Provider::Anthropic,
            stage,
            detail,
            raw_output,
        }
        .into()
    }

    async fn create_message(&self, req: CreateMessageRequest<'_>) -> anyhow::Result<CreateMessageResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
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

        serde_json::from_str::<CreateMessageResponse>(&text).map_err(|e| {
            Self::failure(
                "decode",
                format!("unexpected Messages API response: {e}"),
                Some(text),
            )
        })
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            match block {
                ContentBlock::Text { text } => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(text);
                }
                ContentBlock::Thinking { .. } | ContentBlock::Unknown => {}
            }
        }
        out
    }
}

#[async_trait::async_trait]
impl CompletionGateway for AnthropicClient {
    fn provider_name(&self) -> &'static str {
        Provider::Anthropic.as_str()
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let req = CreateMessageRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let res = self.create_message(req).await?;
        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            // No second attempt: a cut-off answer will fail to parse and the batch falls back.
            tracing::warn!(max_tokens = self.max_tokens, "Anthropic stop_reason=max_tokens; answer is truncated");
        }

        let text = Self::response_text(&res);
        if text.trim().is_empty() {
            return Err(Self::failure("empty_content", "no text blocks in response".to_string(), None));
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        thinking: String,
    },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_text_blocks_and_skips_others() {
        let res: CreateMessageResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "```json"},
                {"type": "tool_use", "id": "toolu_1", "name": "x", "input": {}},
                {"type": "text", "text": "[]\n```"}
            ],
            "stop_reason": "end_turn"
        }))
        .unwrap();

        assert_eq!(AnthropicClient::response_text(&res), "```json\n[]\n```");
    }

    #[test]
    fn request_serializes_single_user_message() {
        let req = CreateMessageRequest {
            model: "m",
            max_tokens: 10,
            messages: vec![Message {
                role: "user",
                content: "привет",
            }],
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({"model": "m", "max_tokens": 10, "messages": [{"role": "user", "content": "привет"}]})
        );
    }

    #[test]
    fn failures_downcast_to_generation_failure() {
        let err = AnthropicClient::failure("http", "status=529".to_string(), Some("overloaded".to_string()));
        let diag = err.downcast_ref::<GenerationFailure>().unwrap();
        assert_eq!(diag.provider, Provider::Anthropic);
        assert_eq!(diag.stage, "http");
        assert_eq!(diag.raw_output.as_deref(), Some("overloaded"));
    }
}
