use anyhow::Context;
use clap::Parser;
use pushreco_core::domain::catalog::ProductCatalog;
use pushreco_core::llm::prompt::compile_prompt;
use pushreco_core::llm::Provider;
use pushreco_core::pipeline::batch::{batches, BatchSize};
use pushreco_core::pipeline::reconcile::ReconcileMode;
use pushreco_core::pipeline::PipelineOptions;
use pushreco_core::source::csv_dir::CsvDirSource;
use pushreco_core::source::ClientDataSource;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "pushreco_worker")]
struct Args {
    /// Directory with clients.csv and the per-client CSV exports. Defaults to DATA_DIR or `db`.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Client master table. Defaults to `<data-dir>/clients.csv`.
    #[arg(long)]
    clients_file: Option<PathBuf>,

    /// Output CSV path.
    #[arg(long, default_value = "push_notifications.csv")]
    output: PathBuf,

    /// Clients per generation request. Defaults to BATCH_SIZE or 10.
    #[arg(long)]
    batch_size: Option<usize>,

    /// anthropic | openai. Defaults to LLM_PROVIDER or openai.
    #[arg(long)]
    provider: Option<String>,

    /// Fall back for a batch unless the answer has exactly one entry per client.
    #[arg(long)]
    strict: bool,

    /// Also store the run in Postgres (DATABASE_URL).
    #[arg(long)]
    persist_db: bool,

    /// Build profiles and prompts only; no generation calls, nothing written.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = pushreco_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(&settings, args).await {
        sentry_anyhow::capture_anyhow(&err);
        let detail = format!("{err:#}");
        tracing::error!(error = %detail, "recommendation run aborted");
        return Err(err);
    }
    Ok(())
}

async fn run(settings: &pushreco_core::config::Settings, args: Args) -> anyhow::Result<()> {
    let batch_size = BatchSize::new(
        args.batch_size
            .or(settings.batch_size)
            .unwrap_or(pushreco_core::config::DEFAULT_BATCH_SIZE),
    )?;

    let data_dir = args
        .data_dir
        .unwrap_or_else(|| PathBuf::from(&settings.data_dir));
    let mut source = CsvDirSource::new(&data_dir);
    if let Some(clients_file) = args.clients_file {
        source = source.with_clients_file(clients_file);
    }

    let clients = source.clients().context("failed to load client master table")?;
    let catalog = ProductCatalog::standard();
    let opts = PipelineOptions {
        batch_size,
        mode: if args.strict {
            ReconcileMode::Strict
        } else {
            ReconcileMode::Permissive
        },
        ..PipelineOptions::default()
    };

    if args.dry_run {
        for batch in batches(&source, &clients, batch_size) {
            let prompt = compile_prompt(&batch.profiles, &catalog, opts.baseline_balance)?;
            tracing::info!(
                batch = batch.span.index,
                start = batch.span.start + 1,
                end = batch.span.end,
                no_data = batch.profiles.iter().filter(|p| p.is_no_data()).count(),
                prompt_chars = prompt.chars().count(),
                dry_run = true,
                "batch prompt compiled"
            );
        }
        return Ok(());
    }

    let provider: Provider = args
        .provider
        .or_else(|| settings.llm_provider.clone())
        .as_deref()
        .unwrap_or("openai")
        .parse()?;
    let gateway = pushreco_core::llm::gateway_from_settings(settings, provider)?;

    // Connect before spending generation calls, so a bad DATABASE_URL fails fast.
    let pool = if args.persist_db {
        let db_url = settings.require_database_url()?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(db_url)
            .await
            .context("connect DATABASE_URL failed")?;
        pushreco_core::storage::migrate(&pool).await?;
        Some(pool)
    } else {
        None
    };

    let report =
        pushreco_core::pipeline::run(&clients, &source, gateway.as_ref(), &catalog, &opts).await;

    pushreco_core::storage::csv_table::write_table_file(&args.output, &report.table)?;
    tracing::info!(output = %args.output.display(), rows = report.table.len(), "results saved");

    if let Some(pool) = pool {
        let run_id = pushreco_core::storage::recommendations::persist_run(
            &pool,
            &report,
            provider.as_str(),
            batch_size.get(),
        )
        .await?;
        tracing::info!(%run_id, "persisted recommendation run");
    }

    Ok(())
}

fn init_sentry(settings: &pushreco_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
