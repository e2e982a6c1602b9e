//! Parsing of model replies into agent actions.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static JSON_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json[ \t]*\r?\n(.*?)```").expect("valid regex"));
static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:python|py)[ \t]*\r?\n(.*?)```").expect("valid regex"));

/// One step's worth of intent extracted from a model reply
#[derive(Debug, Clone, PartialEq)]
pub enum AgentAction {
    ToolCall { name: String, arguments: Value },
    Code(String),
    Invalid(String),
}

/// Extract the action from a reply.
///
/// A well-formed JSON tool call wins over code. Multiple python blocks are
/// joined and run as one snippet.
pub fn parse_action(reply: &str) -> AgentAction {
    let mut json_error = None;
    if let Some(captures) = JSON_BLOCK.captures(reply) {
        match serde_json::from_str::<Value>(captures[1].trim()) {
            Ok(Value::Object(mut call)) => match call.remove("tool") {
                Some(Value::String(name)) => {
                    let arguments = call
                        .remove("arguments")
                        .unwrap_or_else(|| Value::Object(Default::default()));
                    return AgentAction::ToolCall { name, arguments };
                }
                _ => json_error = Some("the JSON block has no string \"tool\" field".to_string()),
            },
            Ok(_) => json_error = Some("the JSON block is not an object".to_string()),
            Err(e) => json_error = Some(format!("the JSON block could not be parsed: {}", e)),
        }
    }

    let code: Vec<&str> = CODE_BLOCK
        .captures_iter(reply)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim_end()))
        .filter(|c| !c.trim().is_empty())
        .collect();
    if !code.is_empty() {
        return AgentAction::Code(code.join("\n\n"));
    }

    AgentAction::Invalid(json_error.unwrap_or_else(|| {
        "no ```json tool call or ```python code block was found in your reply".to_string()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call() {
        let reply = "I will read the filing first.\n```json\n{\"tool\": \"read_pdf\", \"arguments\": {\"file_path\": \"goog-10-k-2024.pdf\"}}\n```";
        assert_eq!(
            parse_action(reply),
            AgentAction::ToolCall {
                name: "read_pdf".into(),
                arguments: json!({"file_path": "goog-10-k-2024.pdf"}),
            }
        );
    }

    #[test]
    fn test_tool_call_without_arguments() {
        let reply = "```json\n{\"tool\": \"list_files\"}\n```";
        assert_eq!(
            parse_action(reply),
            AgentAction::ToolCall {
                name: "list_files".into(),
                arguments: json!({}),
            }
        );
    }

    #[test]
    fn test_code_blocks_are_joined() {
        let reply = "Thought: compute.\n```python\nx = 1\n```\nand\n```py\nprint(x)\n```";
        assert_eq!(parse_action(reply), AgentAction::Code("x = 1\n\nprint(x)".into()));
    }

    #[test]
    fn test_tool_call_wins_over_code() {
        let reply = "```python\nprint(1)\n```\n```json\n{\"tool\": \"read_pdf\", \"arguments\": {}}\n```";
        assert!(matches!(parse_action(reply), AgentAction::ToolCall { .. }));
    }

    #[test]
    fn test_broken_json_falls_back_to_code() {
        let reply = "```json\n{not json}\n```\n```python\nprint(2)\n```";
        assert_eq!(parse_action(reply), AgentAction::Code("print(2)".into()));
    }

    #[test]
    fn test_invalid_replies() {
        match parse_action("The revenue was $350B.") {
            AgentAction::Invalid(reason) => assert!(reason.contains("no ```json")),
            other => panic!("unexpected action: {other:?}"),
        }
        match parse_action("```json\n[1, 2]\n```") {
            AgentAction::Invalid(reason) => assert!(reason.contains("not an object")),
            other => panic!("unexpected action: {other:?}"),
        }
        assert!(matches!(
            parse_action("```python\n   \n```"),
            AgentAction::Invalid(_)
        ));
    }
}
