pub mod aggregate;
pub mod batch;
pub mod profile;
pub mod reconcile;

use crate::domain::catalog::ProductCatalog;
use crate::domain::profile::ClientRecord;
use crate::llm::error::GenerationFailure;
use crate::llm::prompt::{compile_prompt, BASELINE_BALANCE};
use crate::llm::CompletionGateway;
use crate::source::ClientDataSource;
use aggregate::{ResultAggregator, ResultTable};
use batch::{batches, BatchSize};
use reconcile::{reconcile, ReconcileMode, Reconciliation};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub batch_size: BatchSize,
    pub baseline_balance: f64,
    pub mode: ReconcileMode,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size: BatchSize::default(),
            baseline_balance: BASELINE_BALANCE,
            mode: ReconcileMode::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub table: ResultTable,
    pub clients: usize,
    pub batches: usize,
    pub fallback_batches: usize,
    pub no_data_clients: usize,
}

/// Runs every batch in order, one gateway call at a time.
///
/// Never fails: per-client and per-batch errors are logged and replaced by sentinel profiles and
/// fallback records, so a failed batch still contributes one row per client.
pub async fn run(
    clients: &[ClientRecord],
    source: &dyn ClientDataSource,
    gateway: &dyn CompletionGateway,
    catalog: &ProductCatalog,
    opts: &PipelineOptions,
) -> RunReport {
    let mut aggregator = ResultAggregator::new();
    let mut fallback_batches = 0usize;
    let mut no_data_clients = 0usize;

    tracing::info!(
        clients = clients.len(),
        batch_size = %opts.batch_size,
        provider = gateway.provider_name(),
        source = source.source_name(),
        "starting recommendation run"
    );

    for batch in batches(source, clients, opts.batch_size) {
        let span = batch.span;
        no_data_clients += batch.profiles.iter().filter(|p| p.is_no_data()).count();

        let raw = match compile_prompt(&batch.profiles, catalog, opts.baseline_balance) {
            Ok(prompt) => {
                tracing::debug!(batch = span.index, prompt_chars = prompt.chars().count(), "prompt compiled");
                gateway.generate(&prompt).await
            }
            Err(err) => Err(err),
        };

        if let Err(err) = &raw {
            match err.downcast_ref::<GenerationFailure>() {
                Some(diag) => tracing::error!(
                    batch = span.index,
                    provider = %diag.provider,
                    stage = diag.stage,
                    raw_output = diag.raw_output.as_deref().unwrap_or(""),
                    error = %diag,
                    "generation failed for batch"
                ),
                None => {
                    let detail = format!("{err:#}");
                    tracing::error!(batch = span.index, error = %detail, "generation failed for batch")
                }
            }
        }

        let outcome = reconcile(raw, &batch.profiles, opts.mode);
        match &outcome {
            Reconciliation::Done(records) => {
                if records.len() != batch.profiles.len() {
                    tracing::warn!(
                        batch = span.index,
                        expected = batch.profiles.len(),
                        got = records.len(),
                        "model answer does not have one entry per client; keeping it as-is"
                    );
                }
                tracing::info!(
                    batch = span.index,
                    start = span.start + 1,
                    end = span.end,
                    "processed clients {} to {}",
                    span.start + 1,
                    span.end
                );
            }
            Reconciliation::Fallback { reason, .. } => {
                fallback_batches += 1;
                tracing::error!(
                    batch = span.index,
                    start = span.start + 1,
                    end = span.end,
                    error = %reason,
                    "batch fell back to placeholder records"
                );
            }
        }

        aggregator.append_batch(outcome.into_records());
    }

    let batches = aggregator.batches();
    let table = aggregator.into_table();
    tracing::info!(
        rows = table.len(),
        batches,
        fallback_batches,
        no_data_clients,
        "recommendation run finished"
    );

    RunReport {
        table,
        clients: clients.len(),
        batches,
        fallback_batches,
        no_data_clients,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::{RecommendationRecord, FALLBACK_PRODUCT};
    use crate::llm::Provider;
    use crate::source::memory::InMemorySource;
    use serde_json::json;
    use std::collections::{BTreeSet, VecDeque};
    use std::sync::Mutex;

    /// Answers each prompt with the next scripted reply, echoing client codes when `Echo`.
    enum Reply {
        Echo,
        Text(&'static str),
        Fail,
    }

    struct ScriptedGateway {
        replies: Mutex<VecDeque<Reply>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn codes_in(prompt: &str) -> Vec<i64> {
            prompt
                .lines()
                .filter_map(|l| l.trim().strip_prefix("\"client_code\": "))
                .filter_map(|v| v.trim_end_matches(',').parse().ok())
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl CompletionGateway for ScriptedGateway {
        fn provider_name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Echo);
            match reply {
                Reply::Echo => {
                    let items: Vec<_> = Self::codes_in(prompt)
                        .into_iter()
                        .map(|code| {
                            json!({
                                "client_code": code,
                                "recomend_product": "Депозит накопительный",
                                "push_notification": format!("Клиент {code}, откройте вклад. Открыть."),
                            })
                        })
                        .collect();
                    Ok(format!("```json\n{}\n```", serde_json::Value::from(items)))
                }
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Fail => Err(GenerationFailure {
                    provider: Provider::OpenAI,
                    stage: "http",
                    detail: "status=429 Too Many Requests".to_string(),
                    raw_output: None,
                }
                .into()),
            }
        }
    }

    fn source_with(n: i64, missing: &[i64]) -> InMemorySource {
        let mut source = InMemorySource::default();
        for code in 1..=n {
            let record = InMemorySource::client(code, "Стандартный клиент", 20 + code, 100_000.0);
            if missing.contains(&code) {
                source.clients.push(record);
            } else {
                source = source.with_full_client(record, "Имя", "Такси", "p2p_out");
            }
        }
        source
    }

    fn opts(batch_size: usize) -> PipelineOptions {
        PipelineOptions {
            batch_size: BatchSize::new(batch_size).unwrap(),
            ..PipelineOptions::default()
        }
    }

    fn codes(table: &ResultTable) -> Vec<Option<i64>> {
        table.rows().iter().map(RecommendationRecord::client_code).collect()
    }

    #[tokio::test]
    async fn every_client_gets_exactly_one_row_in_order() {
        let source = source_with(23, &[4, 17]);
        let gateway = ScriptedGateway::new(vec![]);

        let report = run(&source.clients, &source, &gateway, &ProductCatalog::standard(), &opts(10)).await;

        assert_eq!(report.batches, 3);
        assert_eq!(report.fallback_batches, 0);
        assert_eq!(report.no_data_clients, 2);
        assert_eq!(report.table.len(), 23);
        assert_eq!(codes(&report.table), (1..=23).map(Some).collect::<Vec<_>>());
        assert_eq!(gateway.prompts.lock().unwrap().len(), 3);
        assert!(gateway.prompts.lock().unwrap()[0].contains("\"name\": \"Нет данных\""));
    }

    #[tokio::test]
    async fn failed_and_malformed_batches_fall_back_without_touching_others() {
        let source = source_with(7, &[]);
        let gateway = ScriptedGateway::new(vec![
            Reply::Echo,
            Reply::Fail,
            Reply::Text("[{\"client_code\": 5, \"recomend_product\": \"Обмен"),
            Reply::Echo,
        ]);

        let report = run(&source.clients, &source, &gateway, &ProductCatalog::standard(), &opts(2)).await;

        assert_eq!(report.batches, 4);
        assert_eq!(report.fallback_batches, 2);
        assert_eq!(codes(&report.table), (1..=7).map(Some).collect::<Vec<_>>());

        let fallback: Vec<i64> = report
            .table
            .rows()
            .iter()
            .filter(|r| r.recomend_product() == Some(FALLBACK_PRODUCT))
            .filter_map(RecommendationRecord::client_code)
            .collect();
        assert_eq!(fallback, vec![3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn output_codes_match_input_codes_for_any_batch_size() {
        let source = source_with(13, &[2, 9]);
        for size in [1, 3, 5, 13, 40] {
            let gateway = ScriptedGateway::new(vec![Reply::Echo, Reply::Fail, Reply::Echo]);
            let report = run(&source.clients, &source, &gateway, &ProductCatalog::standard(), &opts(size)).await;

            assert_eq!(report.table.len(), 13, "batch size {size}");
            let got: BTreeSet<i64> = report.table.rows().iter().filter_map(|r| r.client_code()).collect();
            assert_eq!(got, (1..=13).collect::<BTreeSet<_>>(), "batch size {size}");
        }
    }

    #[tokio::test]
    async fn strict_mode_replaces_incomplete_answers() {
        let source = source_with(2, &[]);
        let gateway = ScriptedGateway::new(vec![Reply::Text(r#"[{"client_code": 1}]"#)]);
        let opts = PipelineOptions {
            mode: ReconcileMode::Strict,
            ..opts(2)
        };

        let report = run(&source.clients, &source, &gateway, &ProductCatalog::standard(), &opts).await;
        assert_eq!(report.fallback_batches, 1);
        assert!(report.table.rows().iter().all(RecommendationRecord::is_fallback));
        assert_eq!(report.table.len(), 2);
    }

    #[tokio::test]
    async fn empty_client_list_makes_no_calls() {
        let source = InMemorySource::default();
        let gateway = ScriptedGateway::new(vec![]);
        let report = run(&[], &source, &gateway, &ProductCatalog::standard(), &opts(10)).await;
        assert_eq!(report.batches, 0);
        assert!(report.table.is_empty());
        assert!(gateway.prompts.lock().unwrap().is_empty());
    }
}
