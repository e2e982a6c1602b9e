//! Agent Tools
//!
//! Capabilities the code agent may invoke on its own. Each tool carries a
//! name, a natural-language description and typed inputs so the model can
//! decide when to call it.

pub mod read_pdf;

pub use read_pdf::ReadPdfTool;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::types::{AppError, AppResult};

/// Description of one tool argument
#[derive(Debug, Clone, Serialize)]
pub struct ToolInput {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub input_type: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn inputs(&self) -> Vec<ToolInput>;

    fn output_type(&self) -> &str;

    async fn call(&self, arguments: &Value) -> AppResult<String>;
}

/// Ordered set of tools offered to an agent
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    pub async fn call(&self, name: &str, arguments: &Value) -> AppResult<String> {
        let tool = self.get(name).ok_or_else(|| {
            AppError::Tool(format!(
                "Unknown tool '{}'. Available tools: {}",
                name,
                self.names().join(", ")
            ))
        })?;
        tool.call(arguments).await
    }

    /// Render the tool list for the agent's system prompt
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for tool in &self.tools {
            out.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));
            out.push_str("    Takes inputs:\n");
            for input in tool.inputs() {
                out.push_str(&format!(
                    "      {} ({}{}): {}\n",
                    input.name,
                    input.input_type,
                    if input.required { "" } else { ", optional" },
                    input.description
                ));
            }
            out.push_str(&format!("    Returns an output of type: {}\n", tool.output_type()));
        }
        out
    }
}

/// Fetch a required string argument
pub(crate) fn string_arg<'a>(arguments: &'a Value, name: &str) -> AppResult<&'a str> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Tool(format!("missing string argument '{}'", name)))
}

/// Fetch an optional non-negative integer argument
pub(crate) fn usize_arg(arguments: &Value, name: &str) -> AppResult<Option<usize>> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|v| Some(v as usize))
            .ok_or_else(|| AppError::Tool(format!("argument '{}' must be a non-negative integer", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Returns its input."
        }

        fn inputs(&self) -> Vec<ToolInput> {
            vec![ToolInput {
                name: "text",
                input_type: "string",
                description: "Text to echo.",
                required: true,
            }]
        }

        fn output_type(&self) -> &str {
            "string"
        }

        async fn call(&self, arguments: &Value) -> AppResult<String> {
            Ok(string_arg(arguments, "text")?.to_string())
        }
    }

    #[tokio::test]
    async fn test_registry_dispatch() {
        let registry = ToolRegistry::new().with_tool(Arc::new(EchoTool));

        let out = registry.call("echo", &json!({"text": "hi"})).await.unwrap();
        assert_eq!(out, "hi");

        let err = registry.call("shell", &json!({})).await.unwrap_err();
        assert!(err.to_string().contains("Unknown tool 'shell'"));
        assert!(err.to_string().contains("echo"));
    }

    #[test]
    fn test_describe_lists_inputs() {
        let registry = ToolRegistry::new().with_tool(Arc::new(EchoTool));
        let description = registry.describe();

        assert!(description.contains("- echo: Returns its input."));
        assert!(description.contains("text (string): Text to echo."));
        assert!(description.contains("Returns an output of type: string"));
    }

    #[test]
    fn test_argument_helpers() {
        let args = json!({"path": "a.pdf", "limit": 10, "offset": -1});

        assert_eq!(string_arg(&args, "path").unwrap(), "a.pdf");
        assert!(string_arg(&args, "missing").is_err());
        assert_eq!(usize_arg(&args, "limit").unwrap(), Some(10));
        assert_eq!(usize_arg(&args, "absent").unwrap(), None);
        assert!(usize_arg(&args, "offset").is_err());
    }
}
