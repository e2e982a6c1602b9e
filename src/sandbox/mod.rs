//! Code Execution Service
//!
//! Generated code runs with real interpreter privileges, so it is isolated
//! behind one narrow interface: submit code plus an import allow-list, get
//! back captured output, the exit status, the variables worth carrying to
//! the next step and an optional final answer. Registered tools are
//! callable from the code; the executor answers those calls while the code
//! runs.
//!
//! ```text
//! ┌─────────────┐  ExecutionRequest   ┌──────────────────┐
//! │ Code agent  │────────────────────▶│  CodeExecutor    │
//! │             │◀────────────────────│  (python child)  │
//! └─────────────┘  ExecutionOutcome   └──────────────────┘
//!                                        │  tool calls
//!                                        ▼
//!                                   ToolRegistry
//! ```

pub mod python;

pub use python::PythonExecutor;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolRegistry;
use crate::types::AppResult;

/// JSON key used to encode plotting-library objects in a final answer
pub const FIGURE_MARKER_KEY: &str = "__figure__";

/// Request to run one code snippet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Source code to execute
    pub code: String,

    /// Top-level modules (or dotted submodules) the code may import
    pub authorized_imports: Vec<String>,

    /// Values bound as global variables before the code runs
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,

    /// Wall-clock limit for the run
    pub timeout: Duration,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            authorized_imports: Vec::new(),
            variables: BTreeMap::new(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_imports(mut self, imports: &[String]) -> Self {
        self.authorized_imports = imports.to_vec();
        self
    }

    pub fn with_variables(mut self, variables: BTreeMap<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Captured result of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Standard output, without the final-answer marker line
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Exit code (None when killed by a signal or on timeout)
    pub exit_code: Option<i32>,

    /// Whether the run was killed for exceeding its timeout
    pub timed_out: bool,

    /// Execution duration in milliseconds
    pub duration_ms: u64,

    /// Value passed to `final_answer`, if the code called it
    pub final_answer: Option<Value>,

    /// JSON-representable top-level variables left by the code
    #[serde(default)]
    pub state: BTreeMap<String, Value>,

    /// Timestamp when execution completed
    pub completed_at: DateTime<Utc>,
}

impl ExecutionOutcome {
    /// Check if the run exited cleanly
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }

    /// Text reported back to the model after a step
    pub fn observation(&self) -> String {
        let mut out = String::new();
        if !self.stdout.trim().is_empty() {
            out.push_str("Execution logs:\n");
            out.push_str(self.stdout.trim_end());
            out.push('\n');
        }
        if self.timed_out {
            out.push_str(&format!(
                "Error: execution timed out after {} ms\n",
                self.duration_ms
            ));
        } else if !self.success() {
            out.push_str("Error:\n");
            out.push_str(self.stderr.trim_end());
            out.push('\n');
        }
        if out.is_empty() {
            out.push_str("Code ran without output.\n");
        }
        out
    }
}

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Run `request`, answering tool calls made by the code from `tools`.
    async fn execute(
        &self,
        request: &ExecutionRequest,
        tools: &ToolRegistry,
    ) -> AppResult<ExecutionOutcome>;
}
