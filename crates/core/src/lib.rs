pub mod domain;
pub mod llm;
pub mod pipeline;
pub mod source;
pub mod storage;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_BATCH_SIZE: usize = 10;
    pub const DEFAULT_DATA_DIR: &str = "db";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub openai_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub llm_provider: Option<String>,
        pub batch_size: Option<usize>,
        pub data_dir: String,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let batch_size = match std::env::var("BATCH_SIZE") {
                Ok(s) => Some(
                    s.trim()
                        .parse::<usize>()
                        .with_context(|| format!("BATCH_SIZE must be a positive integer (got {s:?})"))?,
                ),
                Err(_) => None,
            };

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                llm_provider: std::env::var("LLM_PROVIDER").ok(),
                batch_size,
                data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string()),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }
    }
}
