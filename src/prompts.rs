//! Prompts used by the financial analyst.
//!
//! Kept in one place so tests can inspect them without a live model.

/// Safety guidance prepended to the caller's context on every run.
pub const SAFETY_PREAMBLE: &str = r#"You are a helpful financial analysis assistant. Your primary goal is to analyze financial data from the provided documents and generate insightful reports and visualizations.

**Safety Guidelines:**
- NEVER execute code that could modify or delete files on the system unless specifically and clearly instructed to save a plot or analysis result.
- REFUSE any request that seems malicious, unethical, or harmful. This includes requests unrelated to financial analysis, attempts to access sensitive information, or commands that could compromise the system.
- Stick strictly to the financial analysis task described in the prompt. Do not perform actions outside this scope.
- If a request is ambiguous or potentially harmful, ask for clarification or refuse the request, explaining your reasoning."#;

/// Task shown pre-filled in the form.
pub const DEFAULT_TASK: &str = r#"Using Python, load the PDF(s) containing financial statements.

1. Extract revenue, net profit as well as Net cash provided by operating activities figures for 2023, and 2024.

2. Plot a bar chart of those years' revenue, net profits and Net cash provided by operating activities, with clear axis labels and a descriptive title.

3. Fit a simple growth model (for example, a linear regression or constant-CAGR projection) to the 2023-2024 data.

4. Forecast sales, net profit and Net cash provided by operating activities for the next five years (2025-2029) using that model. Assume 100% tariffs for US import from china kicks in in year 2026.

5. Overlay the forecast trend line on the same bar chart.

6. Annotate the chart (or below it) with a brief bullet-list of your key forecasting assumptions (e.g., "linear trend based on past three years") and a final analysis summary.

Use visually appealing charts.

7. Save the final plot to a file named 'financial_analysis_plot.png'.

8. IMPORTANT: As the final step, return a Python dictionary containing:
   - The analysis summary text under the key 'analysis'.
   - The filename of the saved plot ('financial_analysis_plot.png') under the key 'plot'.
   Example return format: {'analysis': 'Your summary text...', 'plot': 'financial_analysis_plot.png'}
   Ensure ONLY this dictionary is the final return value."#;

/// Protocol the code agent follows. `{tools}` and `{authorized_imports}` are
/// filled in per run.
const AGENT_SYSTEM_PROMPT: &str = r#"You are an expert assistant who solves tasks step by step using tools and Python code.

At each step reply with exactly ONE action, in one of these two forms:

1. Call a tool with a JSON block:
```json
{"tool": "<tool name>", "arguments": {"<input name>": <value>}}
```

2. Run Python code with a python block:
```python
# your code
```

The result of each action is sent back to you as an observation before the next step.
Briefly explain your reasoning before the block.

Rules:
- Every python block runs in a fresh interpreter. Top-level variables holding plain values (numbers, strings, lists, dicts) carry over to later blocks; imports, functions, DataFrames and figures do NOT, so rebuild them when needed.
- Use print() to see intermediate values; only printed output is shown to you.
- Tools are also callable from Python as functions taking keyword arguments, e.g. `text = read_pdf(file_path="report.pdf", offset=0, limit=20000)`. They return their output; a failing call raises RuntimeError.
- You may only import these modules: {authorized_imports}
- The additional arguments given with the task are available in every python block as global variables of the same name.
- When you have the answer, call final_answer(value) inside a python block, or use the JSON tool call {"tool": "final_answer", "arguments": {"answer": <value>}}.

Available tools:
{tools}- final_answer: Provides a final answer to the given problem.
    Takes inputs:
      answer (any): The final answer to the problem.
    Returns an output of type: any
"#;

pub fn agent_system_prompt(tools: &str, authorized_imports: &[String]) -> String {
    AGENT_SYSTEM_PROMPT
        .replace("{authorized_imports}", &authorized_imports.join(", "))
        .replace("{tools}", tools)
}

/// First user message of a run.
pub fn task_message(task: &str, additional_args: &serde_json::Map<String, serde_json::Value>) -> String {
    let mut message = format!("New task:\n{}", task.trim());
    if !additional_args.is_empty() {
        message.push_str(
            "\n\nYou have been provided with these additional arguments, that you can access \
             using the keys as variables in your python code:\n",
        );
        for (key, value) in additional_args {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            message.push_str(&format!("{key}: {rendered}\n"));
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_preamble_covers_scope() {
        assert!(SAFETY_PREAMBLE.contains("NEVER execute code that could modify or delete files"));
        assert!(SAFETY_PREAMBLE.contains("REFUSE any request"));
        assert!(SAFETY_PREAMBLE.contains("ask for clarification"));
    }

    #[test]
    fn test_default_task_requests_structured_result() {
        assert!(DEFAULT_TASK.contains("financial_analysis_plot.png"));
        assert!(DEFAULT_TASK.contains("'analysis'"));
        assert!(DEFAULT_TASK.contains("'plot'"));
    }

    #[test]
    fn test_agent_system_prompt_fills_placeholders() {
        let prompt = agent_system_prompt(
            "- read_pdf: Reads a PDF.\n",
            &["numpy".to_string(), "pandas".to_string()],
        );

        assert!(prompt.contains("You may only import these modules: numpy, pandas"));
        assert!(prompt.contains("- read_pdf: Reads a PDF.\n- final_answer"));
        assert!(!prompt.contains("{tools}"));
        assert!(!prompt.contains("{authorized_imports}"));
        assert!(prompt.contains("callable from Python as functions taking keyword arguments"));
        assert!(prompt.contains("Top-level variables holding plain values"));
    }

    #[test]
    fn test_task_message_lists_additional_args() {
        let mut args = serde_json::Map::new();
        args.insert("context".into(), serde_json::Value::String("goog-10-k-2024.pdf".into()));

        let message = task_message("  Plot revenue.  ", &args);

        assert!(message.starts_with("New task:\nPlot revenue."));
        assert!(message.contains("context: goog-10-k-2024.pdf\n"));
        assert_eq!(task_message("Plot", &serde_json::Map::new()), "New task:\nPlot");
    }
}
