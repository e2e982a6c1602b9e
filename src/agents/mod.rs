//! Agent System
//!
//! Drives one analysis from task text to displayable output:
//!
//! ```text
//! Task + document context
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Financial  │  → safety preamble, import allow-list, step budget
//! │  Analyst    │
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │ Code Agent  │  → model ⇄ tools / python sandbox, until final_answer
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │ Normalizer  │  → (text, optional plot path)
//! └─────────────┘
//! ```

pub mod analyst;
pub mod code_agent;
pub mod parse;

#[cfg(test)]
pub(crate) mod testing;

pub use analyst::FinancialAnalyst;
pub use code_agent::{CodeAgent, Verbosity};

use std::path::Path;

use tracing::info;

use crate::analysis::{classify_result, normalize_result, NormalizedOutput};
use crate::types::AppResult;

/// Run the analyst on `task` and normalize whatever it returns.
///
/// Plot paths in the result resolve against `work_dir`.
pub async fn execute_analysis_pipeline(
    analyst: &FinancialAnalyst,
    task: &str,
    context: &str,
    work_dir: &Path,
) -> AppResult<NormalizedOutput> {
    info!(task_len = task.len(), "Starting analysis pipeline");

    let result = analyst.use_agent(task, context).await?;
    let output = classify_result(&result);
    let normalized = normalize_result(&output, work_dir);

    info!(
        has_image = normalized.image_path.is_some(),
        text_len = normalized.text.len(),
        "Analysis pipeline complete"
    );
    Ok(normalized)
}
