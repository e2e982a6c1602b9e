//! Scripted model and executor used by agent and route tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::llm::{LLMAdapter, LLM};
use crate::sandbox::{CodeExecutor, ExecutionOutcome, ExecutionRequest};
use crate::tools::ToolRegistry;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};

/// Replays canned replies in order. The last reply repeats once the
/// script runs out.
#[derive(Clone, Default)]
pub(crate) struct ScriptedAdapter {
    replies: Arc<Mutex<VecDeque<String>>>,
    pub(crate) requests: Arc<Mutex<Vec<LLMRequest>>>,
}

impl ScriptedAdapter {
    pub(crate) fn new(replies: &[&str]) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.iter().map(|r| r.to_string()).collect())),
            requests: Arc::default(),
        }
    }

    pub(crate) fn into_llm(self) -> Arc<LLM> {
        Arc::new(LLM::with_adapter(Box::new(self), "test-deployment"))
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMAdapter for ScriptedAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let mut replies = self.replies.lock().unwrap();
        let content = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        }
        .ok_or_else(|| AppError::LLMApi("script is empty".into()))?;

        Ok(LLMResponse {
            content,
            finish_reason: "stop".into(),
            usage: TokenUsage::default(),
        })
    }
}

/// Returns queued outcomes and records every request it receives.
#[derive(Clone, Default)]
pub(crate) struct ScriptedExecutor {
    outcomes: Arc<Mutex<VecDeque<ExecutionOutcome>>>,
    pub(crate) requests: Arc<Mutex<Vec<ExecutionRequest>>>,
}

impl ScriptedExecutor {
    pub(crate) fn new(outcomes: Vec<ExecutionOutcome>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.into())),
            requests: Arc::default(),
        }
    }

    pub(crate) fn executed(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        request: &ExecutionRequest,
        _tools: &ToolRegistry,
    ) -> AppResult<ExecutionOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| outcome("", None)))
    }
}

/// A clean exit with the given stdout and optional final answer
pub(crate) fn outcome(stdout: &str, final_answer: Option<Value>) -> ExecutionOutcome {
    ExecutionOutcome {
        stdout: stdout.to_string(),
        stderr: String::new(),
        exit_code: Some(0),
        timed_out: false,
        duration_ms: 3,
        final_answer,
        state: BTreeMap::new(),
        completed_at: Utc::now(),
    }
}

/// A failed run with the given stderr
pub(crate) fn failure(stderr: &str) -> ExecutionOutcome {
    ExecutionOutcome {
        stderr: stderr.to_string(),
        exit_code: Some(1),
        ..outcome("", None)
    }
}
