use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::document::extract_pdf_text;
use crate::tools::{string_arg, usize_arg, Tool, ToolInput};
use crate::types::{AppError, AppResult};

/// Exposes PDF text extraction to the agent.
pub struct ReadPdfTool {
    base_dir: PathBuf,
}

impl ReadPdfTool {
    /// Relative paths given by the agent resolve against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, file_path: &str) -> PathBuf {
        let path = Path::new(file_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

#[async_trait]
impl Tool for ReadPdfTool {
    fn name(&self) -> &str {
        "read_pdf"
    }

    fn description(&self) -> &str {
        "Reads a PDF file and extracts its text content. Long documents can be read \
         in windows with `offset` and `limit`."
    }

    fn inputs(&self) -> Vec<ToolInput> {
        vec![
            ToolInput {
                name: "file_path",
                input_type: "string",
                description: "The path to the PDF file.",
                required: true,
            },
            ToolInput {
                name: "offset",
                input_type: "integer",
                description: "Character offset to start reading from (default 0).",
                required: false,
            },
            ToolInput {
                name: "limit",
                input_type: "integer",
                description: "Maximum number of characters to return (default: all).",
                required: false,
            },
        ]
    }

    fn output_type(&self) -> &str {
        "string"
    }

    async fn call(&self, arguments: &Value) -> AppResult<String> {
        let file_path = string_arg(arguments, "file_path")?;
        let offset = usize_arg(arguments, "offset")?.unwrap_or(0);
        let limit = usize_arg(arguments, "limit")?;
        let path = self.resolve(file_path);

        info!(path = %path.display(), offset, ?limit, "read_pdf called");

        let text = tokio::task::spawn_blocking(move || extract_pdf_text(&path))
            .await
            .map_err(|e| AppError::Internal(format!("PDF extraction task failed: {}", e)))??;

        Ok(window(&text, offset, limit))
    }
}

/// Slice `text` by character position, noting what remains after the window.
fn window(text: &str, offset: usize, limit: Option<usize>) -> String {
    let total = text.chars().count();
    if offset == 0 && limit.map_or(true, |l| l >= total) {
        return text.to_string();
    }

    let taken: String = text
        .chars()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    let end = offset + taken.chars().count();

    if end < total {
        format!(
            "{}\n[... {} more characters; call read_pdf again with offset={}]",
            taken,
            total - end,
            end
        )
    } else {
        taken
    }
}
