//! Financial Analyst
//!
//! Configures a code agent for filing analysis: the import allow-list, the
//! step budget and the safety guidance that wraps the caller's context.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::info;

use crate::agents::code_agent::{CodeAgent, Verbosity};
use crate::config::AgentConfig;
use crate::llm::LLM;
use crate::prompts::SAFETY_PREAMBLE;
use crate::sandbox::CodeExecutor;
use crate::tools::{ReadPdfTool, ToolRegistry};
use crate::types::AppResult;

pub const MAX_STEPS: usize = 50;

/// Modules generated code may import
pub const AUTHORIZED_IMPORTS: &[&str] = &[
    "IPython.display",
    "itertools",
    "sklearn",
    "sklearn.preprocessing",
    "sklearn.metrics",
    "sklearn.model_selection",
    "sklearn.tree",
    "sklearn.linear_model",
    "sklearn.pipeline",
    "datetime",
    "unicodedata",
    "missingno",
    "pandas",
    "seaborn",
    "collections",
    "math",
    "stat",
    "queue",
    "re",
    "time",
    "numpy",
    "statistics",
    "random",
    "matplotlib.pyplot",
];

pub struct FinancialAnalyst {
    llm: Arc<LLM>,
    executor: Arc<dyn CodeExecutor>,
    tools: ToolRegistry,
    step_timeout: Duration,
    verbosity: Verbosity,
}

impl FinancialAnalyst {
    /// The PDF reader resolves paths against `config.work_dir`, the same
    /// directory generated code runs in.
    pub fn new(llm: Arc<LLM>, executor: Arc<dyn CodeExecutor>, config: &AgentConfig) -> Self {
        Self {
            llm,
            executor,
            tools: ToolRegistry::new().with_tool(Arc::new(ReadPdfTool::new(config.work_dir.clone()))),
            step_timeout: Duration::from_secs(config.step_timeout_secs),
            verbosity: Verbosity::from_level(config.verbosity),
        }
    }

    /// Context as the agent sees it: safety guidance first.
    pub fn guarded_context(context: &str) -> String {
        format!("{}\n\n{}", SAFETY_PREAMBLE, context)
    }

    /// Run one task against the documents described in `context`.
    ///
    /// Every call builds a fresh agent, so runs never share memory.
    pub async fn use_agent(&self, task: &str, context: &str) -> AppResult<Value> {
        info!(task_len = task.len(), context_len = context.len(), "Starting analyst run");

        let agent = CodeAgent::new(self.llm.clone(), self.tools.clone(), self.executor.clone())
            .with_max_steps(MAX_STEPS)
            .with_authorized_imports(AUTHORIZED_IMPORTS)
            .with_step_timeout(self.step_timeout)
            .with_verbosity(self.verbosity);

        let mut additional_args = Map::new();
        additional_args.insert(
            "context".to_string(),
            Value::String(Self::guarded_context(context)),
        );

        agent.run(task, additional_args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{outcome, ScriptedAdapter, ScriptedExecutor};
    use serde_json::json;
    use std::path::PathBuf;

    fn agent_config(work_dir: PathBuf) -> AgentConfig {
        AgentConfig {
            work_dir,
            python_bin: "python3".into(),
            step_timeout_secs: 7,
            verbosity: 0,
        }
    }

    #[test]
    fn test_guarded_context_puts_safety_first() {
        let context = FinancialAnalyst::guarded_context("Information from the PDF path from:\na.pdf\n");
        assert!(context.starts_with(SAFETY_PREAMBLE));
        assert!(context.ends_with("\n\nInformation from the PDF path from:\na.pdf\n"));
    }

    #[test]
    fn test_authorized_imports() {
        assert_eq!(AUTHORIZED_IMPORTS.len(), 24);
        assert!(AUTHORIZED_IMPORTS.contains(&"matplotlib.pyplot"));
        assert!(!AUTHORIZED_IMPORTS.contains(&"os"));
        assert!(!AUTHORIZED_IMPORTS.contains(&"subprocess"));
    }

    #[tokio::test]
    async fn test_use_agent_passes_guarded_context() {
        let adapter = ScriptedAdapter::new(&["```python\nfinal_answer(context[:10])\n```"]);
        let executor = ScriptedExecutor::new(vec![outcome("", Some(json!("You are a ")))]);
        let analyst = FinancialAnalyst::new(
            adapter.clone().into_llm(),
            Arc::new(executor.clone()),
            &agent_config(PathBuf::from(".")),
        );

        let answer = analyst.use_agent("Summarize", "doc.pdf").await.unwrap();
        assert_eq!(answer, json!("You are a "));

        let executed = executor.executed();
        assert_eq!(executed[0].timeout, Duration::from_secs(7));
        assert_eq!(executed[0].authorized_imports.len(), AUTHORIZED_IMPORTS.len());
        let context = executed[0].variables["context"].as_str().unwrap();
        assert!(context.starts_with(SAFETY_PREAMBLE));
        assert!(context.ends_with("doc.pdf"));

        let requests = adapter.requests.lock().unwrap();
        assert!(requests[0].messages[0].content.contains("- read_pdf:"));
    }
}
