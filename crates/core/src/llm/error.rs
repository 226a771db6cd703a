use crate::llm::Provider;
use std::fmt;

/// A failed generation call. Carried inside `anyhow::Error` and recovered with `downcast_ref`.
#[derive(Debug, Clone)]
pub struct GenerationFailure {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "generation failed (provider={}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for GenerationFailure {}
