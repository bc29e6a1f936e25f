//! The `analyze` invocation entrypoint.

use rivalscope_core::{AnalysisStore, AppConfig, MemoryStore};
use rivalscope_db::PgAnalysisStore;
use rivalscope_sentiment::{run_competitor_analysis, AnalysisServices, InvocationResponse};
use uuid::Uuid;

/// Runs one analysis and prints the invocation response as JSON.
///
/// With `dry_run` the competitor is still read from Postgres but posts,
/// comments and statistics land in an in-memory store.
///
/// # Errors
///
/// Returns an error if the collaborators cannot be configured, the run
/// cannot be created, or the analysis itself fails. The JSON response is
/// printed before a failed analysis is returned.
pub(crate) async fn run_analyze(
    config: &AppConfig,
    pool: &sqlx::PgPool,
    competitor_id: Uuid,
    run_id: Option<Uuid>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let services = AnalysisServices::from_app_config(config)?;
    let pg_store = PgAnalysisStore::new(pool.clone());

    let result = if dry_run {
        let memory = MemoryStore::new();
        if let Some(competitor) = pg_store.load_competitor(competitor_id).await? {
            memory.add_competitor(competitor);
        }
        let run_id = run_id.unwrap_or_else(Uuid::new_v4);
        tracing::info!(%competitor_id, %run_id, "dry-run: results will not be persisted");
        run_competitor_analysis(&services.context(&memory), competitor_id, run_id).await
    } else {
        let run_id = match run_id {
            Some(id) => id,
            None => match rivalscope_db::create_analysis_run(pool, competitor_id).await {
                Ok(run) => run.id,
                Err(rivalscope_db::DbError::NotFound) => {
                    anyhow::bail!("competitor {competitor_id} not found")
                }
                Err(e) => return Err(e.into()),
            },
        };
        run_competitor_analysis(&services.context(&pg_store), competitor_id, run_id).await
    };

    let response = InvocationResponse::from_result(&result);
    println!("{}", serde_json::to_string_pretty(&response)?);

    result.map(|_| ()).map_err(anyhow::Error::from)
}
