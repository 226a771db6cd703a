pub mod anthropic;
pub mod error;
pub mod json;
pub mod openai;
pub mod prompt;

use crate::config::Settings;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAI => "openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" | "gpt" => Ok(Self::OpenAI),
            other => anyhow::bail!("unknown LLM provider {other:?} (expected anthropic or openai)"),
        }
    }
}

/// Boundary over the external text-generation capability: one prompt in, one raw text out.
///
/// Implementations make exactly one attempt. Every failure is returned as an error for the whole
/// prompt; callers decide how to recover.
#[async_trait::async_trait]
pub trait CompletionGateway: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

pub fn gateway_from_settings(
    settings: &Settings,
    provider: Provider,
) -> anyhow::Result<Box<dyn CompletionGateway>> {
    Ok(match provider {
        Provider::Anthropic => Box::new(anthropic::AnthropicClient::from_settings(settings)?),
        Provider::OpenAI => Box::new(openai::OpenAiClient::from_settings(settings)?),
    })
}
