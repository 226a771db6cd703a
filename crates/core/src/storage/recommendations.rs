use crate::domain::recommendation::RecommendationRecord;
use crate::pipeline::RunReport;
use anyhow::Context;

/// Stores a finished run and all of its rows in one transaction. Returns the run id.
pub async fn persist_run(
    pool: &sqlx::PgPool,
    report: &RunReport,
    provider: &str,
    batch_size: usize,
) -> anyhow::Result<uuid::Uuid> {
    let run_id = uuid::Uuid::new_v4();
    let generated_at = chrono::Utc::now();

    let mut tx = pool.begin().await.context("begin transaction failed")?;

    sqlx::query(
        "INSERT INTO push_runs (id, generated_at, provider, batch_size, clients, batches, fallback_batches, no_data_clients) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(run_id)
    .bind(generated_at)
    .bind(provider)
    .bind(to_i32(batch_size)?)
    .bind(to_i32(report.clients)?)
    .bind(to_i32(report.batches)?)
    .bind(to_i32(report.fallback_batches)?)
    .bind(to_i32(report.no_data_clients)?)
    .execute(&mut *tx)
    .await
    .context("insert push_runs failed")?;

    for (position, record) in report.table.rows().iter().enumerate() {
        insert_record(&mut tx, run_id, to_i32(position)?, record).await?;
    }

    tx.commit().await.context("commit transaction failed")?;
    Ok(run_id)
}

async fn insert_record(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    run_id: uuid::Uuid,
    position: i32,
    record: &RecommendationRecord,
) -> anyhow::Result<()> {
    let fields = serde_json::to_value(record).context("failed to serialize record fields")?;

    sqlx::query(
        "INSERT INTO push_recommendations (run_id, position, client_code, recomend_product, push_notification, fields) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(run_id)
    .bind(position)
    .bind(record.client_code())
    .bind(record.recomend_product())
    .bind(record.push_notification())
    .bind(fields)
    .execute(&mut **tx)
    .await
    .context("insert push_recommendations failed")?;

    Ok(())
}

fn to_i32(n: usize) -> anyhow::Result<i32> {
    i32::try_from(n).with_context(|| format!("value {n} does not fit in INTEGER"))
}
