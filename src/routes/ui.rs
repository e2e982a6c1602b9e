use axum::{response::Html, routing::get, Router};
use once_cell::sync::Lazy;

use crate::prompts::DEFAULT_TASK;

pub fn router() -> Router {
    Router::new().route("/", get(index))
}

static INDEX_HTML: Lazy<String> =
    Lazy::new(|| PAGE.replace("{default_task}", &escape_html(DEFAULT_TASK)));

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML.as_str())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Financial Analysis Agent</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 2rem; color: #1d1d1f; }
    h1 { margin-bottom: 0.5rem; }
    .card { border: 1px solid #ddd; padding: 1rem; border-radius: 8px; margin-bottom: 1rem; }
    .warning { background: #fff4e5; border-color: #f0b429; }
    label { display: block; margin-top: 0.75rem; font-weight: 600; }
    textarea { width: 100%; padding: 0.5rem; font-family: monospace; }
    button { margin-top: 1rem; padding: 0.6rem 1rem; }
    img { max-width: 100%; margin-top: 0.5rem; }
  </style>
</head>
<body>
  <h1>Financial Analysis Agent</h1>
  <p>Modify the prompt below to customize the financial analysis. The agent should return analysis text and save a plot image. Uses Google's 10-K report (2024). Click 'Submit' to generate.</p>
  <div class="card warning">
    <strong>Security Warning:</strong> This tool uses an AI agent that can execute Python code based on the prompt.
    While guardrails are in place, malicious prompts could potentially lead to unintended code execution.
    Review prompts carefully before submitting. Do not input sensitive information or requests that could harm your system.
    Use with caution.
  </div>

  <div class="card">
    <label for="task">Task Prompt</label>
    <textarea id="task" rows="20">{default_task}</textarea>
    <button id="submitBtn">Submit</button>
  </div>

  <div class="card">
    <label for="output">Text/Code Output</label>
    <textarea id="output" rows="15" readonly></textarea>
    <label>Generated Plot Image</label>
    <img id="plot" alt="" hidden />
  </div>

  <script>
    const submitBtn = document.getElementById('submitBtn');
    const output = document.getElementById('output');
    const plot = document.getElementById('plot');

    submitBtn.addEventListener('click', async () => {
      submitBtn.disabled = true;
      plot.hidden = true;
      output.value = 'Running analysis...';
      try {
        const res = await fetch('/api/analyze', {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({ task: document.getElementById('task').value })
        });
        const json = await res.json();
        if (!res.ok) {
          output.value = 'Error: ' + (json.error || res.status);
          return;
        }
        output.value = json.text;
        if (json.image_path) {
          plot.src = '/api/artifacts?path=' + encodeURIComponent(json.image_path) + '&t=' + Date.now();
          plot.hidden = false;
        }
      } catch (err) {
        output.value = 'Error: ' + err;
      } finally {
        submitBtn.disabled = false;
      }
    });
  </script>
</body>
</html>"#;
