//! Result normalization
//!
//! The agent's final value has no fixed shape. It is classified once into
//! [`AgentOutput`] and then mapped to the (text, image) pair the form shows.
//! A missing plot file or an unsupported shape degrades the output; it is
//! never an error.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::sandbox::FIGURE_MARKER_KEY;

pub const RAW_FIGURE_NOTICE: &str = "(Agent returned a plot object directly. Analysis text might be missing. Cannot display plot object as image here.)";

/// Shape of an agent result
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    /// Mapping with both `analysis` and `plot` keys
    StructuredResult { text: String, image_path: String },
    /// A plotting-library object returned as-is
    RawFigure,
    /// Anything else, rendered as text
    PlainText { text: String },
}

/// What the presentation layer displays
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedOutput {
    pub text: String,
    pub image_path: Option<PathBuf>,
}

/// Classify a raw agent result. Checks run in priority order.
pub fn classify_result(result: &Value) -> AgentOutput {
    if let Value::Object(map) = result {
        if let (Some(analysis), Some(plot)) = (map.get("analysis"), map.get("plot")) {
            return AgentOutput::StructuredResult {
                text: value_to_text(analysis),
                image_path: value_to_text(plot),
            };
        }
        if map.contains_key(FIGURE_MARKER_KEY) {
            return AgentOutput::RawFigure;
        }
    }
    AgentOutput::PlainText {
        text: value_to_text(result),
    }
}

/// Map a classified result to display text and an optional image.
///
/// Relative plot paths resolve against `base_dir`, the directory generated
/// code runs in.
pub fn normalize_result(output: &AgentOutput, base_dir: &Path) -> NormalizedOutput {
    match output {
        AgentOutput::StructuredResult { text, image_path } => {
            let candidate = resolve(base_dir, image_path);
            if !image_path.is_empty() && candidate.is_file() {
                NormalizedOutput {
                    text: text.clone(),
                    image_path: Some(candidate),
                }
            } else {
                warn!(plot = %image_path, "Plot file not found or invalid");
                NormalizedOutput {
                    text: format!(
                        "{}\n\n(Plot file '{}' mentioned but not found or invalid.)",
                        text, image_path
                    ),
                    image_path: None,
                }
            }
        }
        AgentOutput::RawFigure => {
            warn!("Agent returned a plot object, not a dictionary with filename as expected");
            NormalizedOutput {
                text: RAW_FIGURE_NOTICE.to_string(),
                image_path: None,
            }
        }
        AgentOutput::PlainText { text } => NormalizedOutput {
            text: text.clone(),
            image_path: None,
        },
    }
}

fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

// Strings are shown without quotes; everything else as compact JSON.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
