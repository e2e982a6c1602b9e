//! API Routes
//!
//! HTTP surface of the analysis agent:
//! - `/` - Task form
//! - `/api/analyze` - Run one analysis
//! - `/api/artifacts` - Serve generated plot images
//! - `/api/health` - Health check

pub mod analysis;
pub mod files;
pub mod health;
pub mod ui;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    Router::new()
        .merge(ui::router())
        .merge(analysis::router(state.clone()))
        .merge(files::router(state.clone()))
        .merge(health::router(state))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{outcome, ScriptedAdapter, ScriptedExecutor};
    use crate::agents::FinancialAnalyst;
    use crate::config::Config;
    use crate::document::{build_document_context, Document};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn state(work_dir: &Path, reply: &str, executor: ScriptedExecutor) -> AppState {
        let work_dir = work_dir.display().to_string();
        let config = Config::from_lookup(|key| match key {
            "AZURE_OPENAI_CHAT_DEPLOYMENT_NAME" => Some("gpt-4.1".into()),
            "AZURE_OPENAI_ENDPOINT" => Some("https://example.openai.azure.com".into()),
            "AZURE_OPENAI_API_KEY" => Some("test-key".into()),
            "WORK_DIR" => Some(work_dir.clone()),
            "AGENT_VERBOSITY" => Some("0".into()),
            _ => None,
        })
        .unwrap();
        let documents = vec![Document {
            label: "2024".into(),
            url: "https://example.com/goog-10-k-2024.pdf".into(),
            local_path: PathBuf::from("goog-10-k-2024.pdf"),
        }];
        let analyst = FinancialAnalyst::new(
            ScriptedAdapter::new(&[reply]).into_llm(),
            Arc::new(executor),
            &config.agent,
        );

        AppState {
            context: Arc::new(build_document_context(&documents)),
            documents: Arc::new(documents),
            analyst: Arc::new(analyst),
            config: Arc::new(config),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn analyze_request(task: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "task": task }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let app = create_router(state(dir.path(), "", ScriptedExecutor::default()));

        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model"], "gpt-4.1");
        assert_eq!(body["documents"], 1);
    }

    #[tokio::test]
    async fn test_analyze_returns_text_and_plot() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("financial_analysis_plot.png"), b"\x89PNG").unwrap();
        let executor = ScriptedExecutor::new(vec![outcome(
            "",
            Some(json!({"analysis": "Revenue grew.", "plot": "financial_analysis_plot.png"})),
        )]);
        let app = create_router(state(
            dir.path(),
            "```python\nfinal_answer({'analysis': 'Revenue grew.', 'plot': 'financial_analysis_plot.png'})\n```",
            executor.clone(),
        ));

        let response = app.clone().oneshot(analyze_request("Plot revenue")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["text"], "Revenue grew.");
        let image_path = body["image_path"].as_str().unwrap().to_string();
        assert!(image_path.ends_with("financial_analysis_plot.png"));

        let context = executor.executed()[0].variables["context"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(context.ends_with("Information from the PDF path from:\ngoog-10-k-2024.pdf\n\n"));

        let uri = format!("/api/artifacts?path={}", image_path.replace('/', "%2F"));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn test_analyze_rejects_blank_task() {
        let dir = TempDir::new().unwrap();
        let app = create_router(state(dir.path(), "", ScriptedExecutor::default()));

        for task in ["", "   "] {
            let response = app.clone().oneshot(analyze_request(task)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(json_body(response).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_analyze_reports_agent_failure() {
        let dir = TempDir::new().unwrap();
        let app = create_router(state(dir.path(), "I refuse to use code.", ScriptedExecutor::default()));

        let response = app.oneshot(analyze_request("Plot revenue")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("maximum of 50 steps"));
    }

    #[tokio::test]
    async fn test_artifacts_outside_workspace_are_not_served() {
        let outer = TempDir::new().unwrap();
        let work_dir = outer.path().join("work");
        std::fs::create_dir(&work_dir).unwrap();
        std::fs::write(outer.path().join("secret.png"), b"png").unwrap();
        std::fs::write(work_dir.join("notes.txt"), b"text").unwrap();
        let app = create_router(state(&work_dir, "", ScriptedExecutor::default()));

        for path in ["..%2Fsecret.png", "notes.txt", "missing.png"] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri(format!("/api/artifacts?path={path}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {path}");
        }
    }
}
