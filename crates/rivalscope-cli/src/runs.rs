//! Analysis-run bookkeeping commands.

use anyhow::Context;
use uuid::Uuid;

pub(crate) async fn run_create(pool: &sqlx::PgPool, competitor_id: Uuid) -> anyhow::Result<()> {
    let run = match rivalscope_db::create_analysis_run(pool, competitor_id).await {
        Err(rivalscope_db::DbError::NotFound) => {
            anyhow::bail!("competitor {competitor_id} not found")
        }
        other => other?,
    };
    println!("{}", run.id);
    Ok(())
}

pub(crate) async fn run_stats(pool: &sqlx::PgPool, run_id: Uuid) -> anyhow::Result<()> {
    let stats = rivalscope_db::get_statistics_for_run(pool, run_id)
        .await?
        .with_context(|| format!("no statistics recorded for analysis run {run_id}"))?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
