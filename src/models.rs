use std::sync::Arc;

use validator::Validate;

use crate::agents::FinancialAnalyst;
use crate::config::Config;
use crate::document::Document;

/// Shared, read-only state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub analyst: Arc<FinancialAnalyst>,
    pub documents: Arc<Vec<Document>>,
    /// Document listing passed to the agent with every task
    pub context: Arc<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(length(min = 1, message = "task must not be empty"))]
    pub task: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalyzeResponse {
    pub text: String,
    /// Workspace path of the generated plot, if one was produced
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ArtifactQuery {
    pub path: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub model: String,
    pub documents: usize,
}
