//! Documents
//!
//! Remote filings are downloaded once at startup into the workspace
//! directory; their text is extracted on demand by the agent's `read_pdf`
//! tool.

pub mod extract;
pub mod fetcher;

pub use extract::extract_pdf_text;
pub use fetcher::{download_all, download_file};

use std::path::PathBuf;

use crate::config::DocumentConfig;

/// A filing available on local storage
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Short label, usually the fiscal year
    pub label: String,
    /// Where the file was downloaded from
    pub url: String,
    /// Path relative to the workspace directory
    pub local_path: PathBuf,
}

/// Documents the configuration names, at the paths `download_all` uses.
pub fn planned_documents(config: &DocumentConfig) -> Vec<Document> {
    config
        .sources
        .iter()
        .map(|source| Document {
            label: source.label.clone(),
            url: source.url.clone(),
            local_path: PathBuf::from(config.filename_for(source)),
        })
        .collect()
}

/// Build the context string handed to the agent alongside the task.
pub fn build_document_context(documents: &[Document]) -> String {
    let mut context = String::from("Information from the PDF path from:\n");
    for document in documents {
        context.push_str(&document.local_path.display().to_string());
        context.push('\n');
    }
    context.push('\n');
    context
}
