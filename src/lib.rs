// FinAgent - LLM code agent for financial filing analysis

pub mod agents;
pub mod analysis;
pub mod config;
pub mod document;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod routes;
pub mod sandbox;
pub mod tools;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
