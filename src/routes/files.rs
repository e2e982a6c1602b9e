use std::path::{Path, PathBuf};

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{debug, warn};

use crate::models::{AppState, ArtifactQuery};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/artifacts", get(get_artifact))
        .with_state(state)
}

/// Serve an image generated by the agent.
///
/// Only files inside the workspace directory are served; anything else,
/// including paths that escape it through `..` or symlinks, is a 404.
async fn get_artifact(
    State(state): State<AppState>,
    Query(query): Query<ArtifactQuery>,
) -> AppResult<Response> {
    let path = resolve_artifact(&state.config.agent.work_dir, &query.path)
        .await
        .ok_or_else(|| {
            warn!(path = %query.path, "Rejected artifact request");
            AppError::NotFound(query.path.clone())
        })?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(AppError::NotFound(query.path));
    }

    let bytes = tokio::fs::read(&path).await?;
    debug!(path = %path.display(), size = bytes.len(), "Serving artifact");
    Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response())
}

async fn resolve_artifact(work_dir: &Path, requested: &str) -> Option<PathBuf> {
    let root = tokio::fs::canonicalize(work_dir).await.ok()?;
    let requested = Path::new(requested);
    let candidate = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    };
    let resolved = tokio::fs::canonicalize(&candidate).await.ok()?;
    let metadata = tokio::fs::metadata(&resolved).await.ok()?;
    (resolved.starts_with(&root) && metadata.is_file()).then_some(resolved)
}
