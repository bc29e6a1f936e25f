use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use rivalscope_core::{Statistics, StoreError};
use rivalscope_db::PgAnalysisStore;
use rivalscope_sentiment::{run_competitor_analysis, AnalysisError, InvocationResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CreateAnalysisRequest {
    pub competitor_id: Uuid,
    /// Run to record into; a new one is created when absent.
    pub analysis_run_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub(super) struct RunStatistics {
    pub analysis_run_id: Uuid,
    #[serde(flatten)]
    pub statistics: Statistics,
}

/// HTTP status for a failed analysis.
pub(super) fn analysis_status(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::CompetitorNotFound(_) | AnalysisError::Store(StoreError::RunNotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        AnalysisError::NoProfilesConfigured
        | AnalysisError::NoPostsFound { .. }
        | AnalysisError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::Store(StoreError::DuplicateStatistics(_)) => StatusCode::CONFLICT,
        AnalysisError::Store(StoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(err: &AnalysisError) -> (StatusCode, Json<InvocationResponse>) {
    let status = analysis_status(err);
    let mut response = InvocationResponse::from_error(err);
    if status.is_server_error() {
        response.error = Some("analysis failed due to a storage error".to_string());
    }
    (status, Json(response))
}

pub(super) async fn create_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateAnalysisRequest>,
) -> Result<(StatusCode, Json<InvocationResponse>), ApiError> {
    let competitor_id = body.competitor_id;
    let run_id = match body.analysis_run_id {
        Some(id) => id,
        None => match rivalscope_db::create_analysis_run(&state.pool, competitor_id).await {
            Ok(run) => run.id,
            Err(rivalscope_db::DbError::NotFound) => {
                return Ok(failure(&AnalysisError::CompetitorNotFound(competitor_id)));
            }
            Err(e) => return Err(map_db_error(req_id.0, &e)),
        },
    };

    tracing::info!(request_id = %req_id.0, %competitor_id, %run_id, "analysis requested");

    let store = PgAnalysisStore::new(state.pool.clone());
    let result =
        run_competitor_analysis(&state.services.context(&store), competitor_id, run_id).await;

    match &result {
        Ok(_) => Ok((StatusCode::OK, Json(InvocationResponse::from_result(&result)))),
        Err(err) => {
            if !err.is_user_facing() {
                tracing::error!(request_id = %req_id.0, %run_id, error = %err, "analysis failed");
            }
            Ok(failure(err))
        }
    }
}

pub(super) async fn get_run_statistics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<ApiResponse<RunStatistics>>, ApiError> {
    let statistics = rivalscope_db::get_statistics_for_run(&state.pool, run_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("no statistics recorded for analysis run {run_id}"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: RunStatistics {
            analysis_run_id: run_id,
            statistics,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
