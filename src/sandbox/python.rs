use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tracing::{debug, info, warn};

use crate::sandbox::{CodeExecutor, ExecutionOutcome, ExecutionRequest};
use crate::tools::ToolRegistry;
use crate::types::{AppError, AppResult};

/// Prefix of the stdout line carrying the JSON-encoded final answer
pub const FINAL_ANSWER_MARKER: &str = "<<finagent:final_answer>>";
/// Prefix of a stdout line asking the host to run a tool; the reply is one
/// JSON line on stdin, `{"output": ...}` or `{"error": ...}`
pub const TOOL_CALL_MARKER: &str = "<<finagent:tool_call>>";
/// Prefix of the stdout line listing variables to carry to the next step
pub const STATE_MARKER: &str = "<<finagent:state>>";

/// Host side of every step. Reads one JSON line
/// `{code, authorized_imports, variables, tools}` from stdin, builds the
/// namespace the code runs in, guards imports made from that code and runs
/// it under the name `<agent>` so tracebacks point at the model's own lines.
const PREAMBLE: &str = r#"import builtins as __fa_builtins
import json as __fa_json
import linecache as __fa_linecache
import math as __fa_math
import sys as __fa_sys
import traceback as __fa_traceback

__fa_payload = __fa_json.loads(__fa_sys.stdin.readline() or "{}")
__fa_stdout = __fa_sys.stdout


def __fa_make_guard(allowed, real_import):
    def guarded_import(name, globals=None, locals=None, fromlist=(), level=0):
        caller = globals.get("__name__") if globals else None
        # private and codec modules are also pulled in implicitly by C code
        # running on behalf of the snippet (e.g. _strptime, encodings.idna)
        implicit = name.startswith("_") or name.split(".")[0] == "encodings"
        if level == 0 and caller in (None, "__main__") and not implicit:
            if not any(name == a or name.startswith(a + ".") for a in allowed):
                raise ImportError(
                    "Import of '%s' is not allowed. Authorized imports are: %s"
                    % (name, ", ".join(sorted(allowed)))
                )
        return real_import(name, globals, locals, fromlist, level)

    return guarded_import


def __fa_clean(obj):
    # JSON has no NaN or Infinity
    if isinstance(obj, float) and not __fa_math.isfinite(obj):
        return None
    if isinstance(obj, dict):
        return {k: __fa_clean(v) for k, v in obj.items()}
    if isinstance(obj, (list, tuple)):
        return [__fa_clean(v) for v in obj]
    return obj


def __fa_encode(obj):
    kind = type(obj).__name__
    if hasattr(obj, "savefig") or kind in ("Figure", "Axes", "AxesSubplot"):
        return {"__figure__": kind}
    if hasattr(obj, "tolist"):
        try:
            return __fa_clean(obj.tolist())
        except Exception:
            pass
    return str(obj)


def __fa_emit(marker, value, **options):
    line = __fa_json.dumps(value, allow_nan=False, **options)
    __fa_stdout.write("\n" + marker + line + "\n")
    __fa_stdout.flush()


def final_answer(answer):
    try:
        __fa_emit("<<finagent:final_answer>>", __fa_clean(answer), default=__fa_encode)
    except (TypeError, ValueError):
        __fa_emit("<<finagent:final_answer>>", str(answer))
    raise SystemExit(0)


def __fa_make_tool(name, inputs):
    def call_tool(*args, **kwargs):
        if len(args) > len(inputs):
            raise TypeError("%s() takes at most %d positional arguments" % (name, len(inputs)))
        arguments = dict(zip(inputs, args))
        arguments.update(kwargs)
        __fa_emit(
            "<<finagent:tool_call>>",
            {"tool": name, "arguments": __fa_clean(arguments)},
            default=str,
        )
        reply = __fa_json.loads(__fa_sys.stdin.readline() or '{"error": "no reply from host"}')
        if "error" in reply:
            raise RuntimeError(reply["error"])
        return reply.get("output")

    call_tool.__name__ = name
    return call_tool


def __fa_state(namespace):
    state = {}
    for key, value in namespace.items():
        if key.startswith("_") or callable(value) or isinstance(value, type(__fa_sys)):
            continue
        try:
            cleaned = __fa_clean(value)
            __fa_json.dumps(cleaned, allow_nan=False)
        except (TypeError, ValueError, RecursionError):
            continue
        state[key] = cleaned
    return state


__fa_code = __fa_payload.get("code", "")
__fa_linecache.cache["<agent>"] = (len(__fa_code), None, __fa_code.splitlines(True), "<agent>")
__fa_namespace = {"__name__": "__main__", "__builtins__": __fa_builtins, "final_answer": final_answer}
for __fa_tool in __fa_payload.get("tools", []):
    __fa_namespace[__fa_tool["name"]] = __fa_make_tool(__fa_tool["name"], __fa_tool["inputs"])
__fa_namespace.update(__fa_payload.get("variables", {}))
__fa_builtins.__import__ = __fa_make_guard(
    tuple(__fa_payload.get("authorized_imports", [])), __fa_builtins.__import__
)

try:
    exec(compile(__fa_code, "<agent>", "exec"), __fa_namespace)
except SystemExit:
    raise
except BaseException as __fa_error:
    __fa_traceback.print_exception(
        type(__fa_error), __fa_error, __fa_error.__traceback__.tb_next
    )
    __fa_emit("<<finagent:state>>", __fa_state(__fa_namespace))
    __fa_sys.exit(1)
else:
    __fa_emit("<<finagent:state>>", __fa_state(__fa_namespace))
"#;

/// Runs snippets with a local Python interpreter, one child process per step.
pub struct PythonExecutor {
    python_bin: String,
    work_dir: PathBuf,
}

impl PythonExecutor {
    pub fn new(python_bin: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            python_bin: python_bin.into(),
            work_dir: work_dir.into(),
        }
    }

    fn write_script() -> AppResult<tempfile::NamedTempFile> {
        let mut script = tempfile::Builder::new()
            .prefix("finagent-step-")
            .suffix(".py")
            .tempfile()?;
        script.write_all(PREAMBLE.as_bytes())?;
        script.flush()?;
        Ok(script)
    }
}

#[async_trait]
impl CodeExecutor for PythonExecutor {
    async fn execute(
        &self,
        request: &ExecutionRequest,
        tools: &ToolRegistry,
    ) -> AppResult<ExecutionOutcome> {
        let script = Self::write_script()?;
        let tool_signatures: Vec<Value> = tools
            .iter()
            .map(|tool| {
                let inputs: Vec<&str> = tool.inputs().iter().map(|input| input.name).collect();
                json!({ "name": tool.name(), "inputs": inputs })
            })
            .collect();
        let payload = serde_json::to_vec(&json!({
            "code": request.code,
            "authorized_imports": request.authorized_imports,
            "variables": request.variables,
            "tools": tool_signatures,
        }))
        .map_err(|e| AppError::Sandbox(format!("failed to encode variables: {}", e)))?;

        let started = Instant::now();
        let mut child = Command::new(&self.python_bin)
            .arg(script.path())
            .current_dir(&self.work_dir)
            .env("MPLBACKEND", "Agg")
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Sandbox(format!("failed to start {}: {}", self.python_bin, e)))?;

        let (Some(mut stdin), Some(stdout), Some(mut stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(AppError::Sandbox("child pipes were not captured".into()));
        };
        send_line(&mut stdin, payload).await?;

        // drained separately so a chatty child never blocks on a full pipe
        let stderr_reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.map(|_| buf)
        });

        let session = async {
            let mut transcript = Transcript::default();
            let mut lines = BufReader::new(stdout).split(b'\n');
            while let Some(raw) = lines.next_segment().await? {
                let line = String::from_utf8_lossy(&raw);
                if let Some(call) = line.strip_prefix(TOOL_CALL_MARKER) {
                    transcript.drop_separator();
                    let reply = answer_tool_call(call, tools).await;
                    let reply = serde_json::to_vec(&reply)
                        .map_err(|e| AppError::Sandbox(format!("failed to encode tool reply: {}", e)))?;
                    send_line(&mut stdin, reply).await?;
                } else {
                    transcript.push_line(&line);
                }
            }
            let status = child.wait().await?;
            Ok::<_, AppError>((transcript, status))
        };

        let result = tokio::time::timeout(request.timeout, session).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(Ok((transcript, status))) => {
                let stderr = stderr_reader
                    .await
                    .map_err(|e| AppError::Sandbox(format!("failed to collect stderr: {}", e)))??;
                let (logs, final_answer, state) = transcript.finish();
                ExecutionOutcome {
                    stdout: logs,
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    exit_code: status.code(),
                    timed_out: false,
                    duration_ms,
                    final_answer,
                    state,
                    completed_at: Utc::now(),
                }
            }
            Ok(Err(e)) => {
                child.start_kill().ok();
                return Err(e);
            }
            Err(_) => {
                warn!(timeout_ms = request.timeout.as_millis() as u64, "Code step timed out");
                child.start_kill().ok();
                stderr_reader.abort();
                ExecutionOutcome {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: None,
                    timed_out: true,
                    duration_ms,
                    final_answer: None,
                    state: BTreeMap::new(),
                    completed_at: Utc::now(),
                }
            }
        };

        debug!(
            exit_code = ?outcome.exit_code,
            duration_ms = outcome.duration_ms,
            has_final_answer = outcome.final_answer.is_some(),
            carried_variables = outcome.state.len(),
            "Code step finished"
        );
        Ok(outcome)
    }
}

/// Write one line to the child. A child that already exited is not an
/// error; its exit status tells the rest.
async fn send_line(stdin: &mut ChildStdin, mut line: Vec<u8>) -> AppResult<()> {
    line.push(b'\n');
    let written = async {
        stdin.write_all(&line).await?;
        stdin.flush().await
    }
    .await;
    match written {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            debug!("Child closed stdin before the write");
            Ok(())
        }
        other => other.map_err(AppError::from),
    }
}

async fn answer_tool_call(raw: &str, tools: &ToolRegistry) -> Value {
    let call: Value = match serde_json::from_str(raw) {
        Ok(call) => call,
        Err(e) => return json!({ "error": format!("malformed tool call: {}", e) }),
    };
    let name = call.get("tool").and_then(Value::as_str).unwrap_or_default();
    let arguments = call.get("arguments").cloned().unwrap_or_else(|| json!({}));

    info!(tool = %name, "Tool called from code");
    match tools.call(name, &arguments).await {
        Ok(output) => json!({ "output": output }),
        Err(e) => {
            warn!(tool = %name, error = %e, "Tool call from code failed");
            json!({ "error": e.to_string() })
        }
    }
}

/// Ordinary output and marker lines read back from a child.
#[derive(Debug, Default)]
struct Transcript {
    logs: String,
    final_answer: Option<Value>,
    state: BTreeMap<String, Value>,
}

impl Transcript {
    fn push_line(&mut self, line: &str) {
        if let Some(raw) = line.strip_prefix(FINAL_ANSWER_MARKER) {
            self.drop_separator();
            self.final_answer =
                Some(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())));
        } else if let Some(raw) = line.strip_prefix(STATE_MARKER) {
            self.drop_separator();
            if let Ok(Value::Object(state)) = serde_json::from_str::<Value>(raw) {
                self.state = state.into_iter().collect();
            }
        } else {
            self.logs.push_str(line);
            self.logs.push('\n');
        }
    }

    // Marker lines are written after a newline of their own; the empty line
    // that leaves in the logs is not the code's output.
    fn drop_separator(&mut self) {
        if self.logs == "\n" || self.logs.ends_with("\n\n") {
            self.logs.pop();
        }
    }

    fn finish(mut self) -> (String, Option<Value>, BTreeMap<String, Value>) {
        let trimmed = self.logs.trim_end().len();
        self.logs.truncate(trimmed);
        (self.logs, self.final_answer, self.state)
    }
}
