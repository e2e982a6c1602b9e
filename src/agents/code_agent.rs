//! Code Agent
//!
//! Bounded reason-act loop. Each step the model replies with either a JSON
//! tool call or a python block; the result goes back as an observation until
//! `final_answer` is called or the step budget runs out.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::agents::parse::{parse_action, AgentAction};
use crate::llm::LLM;
use crate::prompts::{agent_system_prompt, task_message};
use crate::sandbox::{CodeExecutor, ExecutionRequest};
use crate::tools::ToolRegistry;
use crate::types::{AppError, AppResult, LLMMessage};

/// Observations longer than this are cut in the middle
pub const MAX_OBSERVATION_CHARS: usize = 20_000;

const FINAL_ANSWER_TOOL: &str = "final_answer";

/// How much of each run is written to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Steps,
    Full,
}

impl Verbosity {
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Verbosity::Quiet,
            1 => Verbosity::Steps,
            _ => Verbosity::Full,
        }
    }
}

pub struct CodeAgent {
    llm: Arc<LLM>,
    tools: ToolRegistry,
    executor: Arc<dyn CodeExecutor>,
    max_steps: usize,
    authorized_imports: Vec<String>,
    step_timeout: Duration,
    verbosity: Verbosity,
}

impl CodeAgent {
    pub fn new(llm: Arc<LLM>, tools: ToolRegistry, executor: Arc<dyn CodeExecutor>) -> Self {
        Self {
            llm,
            tools,
            executor,
            max_steps: 20,
            authorized_imports: Vec::new(),
            step_timeout: Duration::from_secs(120),
            verbosity: Verbosity::Steps,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_authorized_imports(mut self, imports: &[&str]) -> Self {
        self.authorized_imports = imports.iter().map(|i| i.to_string()).collect();
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Run `task` to completion and return the value given to `final_answer`.
    ///
    /// `additional_args` are listed in the task message and bound as globals
    /// in every code step. Model and executor failures abort the run; tool
    /// errors and failing code are reported back to the model instead.
    pub async fn run(&self, task: &str, additional_args: Map<String, Value>) -> AppResult<Value> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("agent_run", %run_id, model = %self.llm.model());
        self.run_steps(task, additional_args).instrument(span).await
    }

    async fn run_steps(&self, task: &str, additional_args: Map<String, Value>) -> AppResult<Value> {
        let mut messages = vec![
            LLMMessage::system(agent_system_prompt(
                &self.tools.describe(),
                &self.authorized_imports,
            )),
            LLMMessage::user(task_message(task, &additional_args)),
        ];
        // additional args plus whatever plain values earlier code steps left
        let mut variables: BTreeMap<String, Value> = additional_args.into_iter().collect();

        if self.verbosity >= Verbosity::Steps {
            info!(max_steps = self.max_steps, task_len = task.len(), "Agent run started");
        }

        for step in 1..=self.max_steps {
            let response = self
                .llm
                .create_chat_completion(&self.llm.request(messages.clone()))
                .await?;
            let reply = response.content;
            if self.verbosity >= Verbosity::Full {
                info!(step, "Model output:\n{}", reply);
            }
            messages.push(LLMMessage::assistant(reply.clone()));

            let observation = match parse_action(&reply) {
                AgentAction::ToolCall { name, arguments } if name == FINAL_ANSWER_TOOL => {
                    self.log_finish(step);
                    return Ok(match arguments {
                        Value::Object(mut map) if map.contains_key("answer") => {
                            map.remove("answer").unwrap_or(Value::Null)
                        }
                        other => other,
                    });
                }
                AgentAction::ToolCall { name, arguments } => {
                    if self.verbosity >= Verbosity::Steps {
                        info!(step, tool = %name, "Calling tool");
                    }
                    match self.tools.call(&name, &arguments).await {
                        Ok(output) => format!("Observation:\n{}", output),
                        Err(e) => {
                            warn!(step, tool = %name, error = %e, "Tool call failed");
                            format!(
                                "Error: {}\nNow let's retry: take care not to repeat previous errors!",
                                e
                            )
                        }
                    }
                }
                AgentAction::Code(code) => {
                    if self.verbosity >= Verbosity::Steps {
                        info!(step, code_lines = code.lines().count(), "Executing code");
                    }
                    let request = ExecutionRequest::new(code)
                        .with_imports(&self.authorized_imports)
                        .with_variables(variables.clone())
                        .with_timeout(self.step_timeout);
                    let mut outcome = self.executor.execute(&request, &self.tools).await?;
                    if let Some(answer) = outcome.final_answer.take() {
                        self.log_finish(step);
                        return Ok(answer);
                    }
                    debug!(
                        step,
                        exit_code = ?outcome.exit_code,
                        carried = outcome.state.len(),
                        "Code step produced no answer"
                    );
                    variables.extend(std::mem::take(&mut outcome.state));
                    outcome.observation()
                }
                AgentAction::Invalid(reason) => {
                    warn!(step, %reason, "Unparseable model output");
                    format!(
                        "Error: {}\nReply with exactly one ```json tool call or one ```python code block.",
                        reason
                    )
                }
            };

            let observation = truncate_content(&observation, MAX_OBSERVATION_CHARS);
            if self.verbosity >= Verbosity::Full {
                info!(step, "Observation:\n{}", observation);
            }
            messages.push(LLMMessage::user(observation));
        }

        warn!(max_steps = self.max_steps, "Agent stopped without a final answer");
        Err(AppError::MaxStepsExceeded(self.max_steps))
    }

    fn log_finish(&self, step: usize) {
        if self.verbosity >= Verbosity::Steps {
            info!(step, "Agent produced a final answer");
        }
    }
}

/// Keep the head and tail of `content`, dropping the middle past `max_chars`.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    let total = content.chars().count();
    if total <= max_chars {
        return content.to_string();
    }
    let half = max_chars / 2;
    let head: String = content.chars().take(half).collect();
    let tail: String = content.chars().skip(total - half).collect();
    format!(
        "{}\n..._This content has been truncated to stay below {} characters. \
         Print smaller slices, or page through documents with read_pdf's offset and limit arguments_...\n{}",
        head, max_chars, tail
    )
}
