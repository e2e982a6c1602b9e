use axum::{extract::State, routing::post, Json, Router};
use tracing::info;
use validator::Validate;

use crate::agents::execute_analysis_pipeline;
use crate::models::{AnalyzeRequest, AnalyzeResponse, AppState};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze))
        .with_state(state)
}

/// Run one analysis to completion. The request is held open until the
/// agent finishes.
async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> AppResult<Json<AnalyzeResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
    if request.task.trim().is_empty() {
        return Err(AppError::InvalidRequest("task must not be empty".into()));
    }

    info!(task_len = request.task.len(), "Analysis request received");

    let output = execute_analysis_pipeline(
        &state.analyst,
        &request.task,
        &state.context,
        &state.config.agent.work_dir,
    )
    .await?;

    Ok(Json(AnalyzeResponse {
        text: output.text,
        image_path: output.image_path.map(|p| p.display().to_string()),
    }))
}
