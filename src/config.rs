use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_DOCUMENT_URL: &str =
    "https://www.abc.xyz/assets/77/51/9841ad5c4fbe85b4440c47a4df8d/goog-10-k-2024.pdf";
pub const DEFAULT_API_VERSION: &str = "2024-12-01-preview";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub documents: DocumentConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Clone)]
pub struct LLMConfig {
    pub deployment: String,
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

// Keeps the credential out of startup logs.
impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("deployment", &self.deployment)
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub sources: Vec<DocumentSource>,
    pub file_prefix: String,
}

/// One remote filing, keyed by a short label such as the fiscal year.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSource {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub work_dir: PathBuf,
    pub python_bin: String,
    pub step_timeout_secs: u64,
    pub verbosity: u8,
}

impl DocumentConfig {
    pub fn filename_for(&self, source: &DocumentSource) -> String {
        format!("{}{}.pdf", self.file_prefix, source.label)
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} must be set"))
        };

        Ok(Self {
            server: ServerConfig {
                port: var("PORT", "7860")
                    .parse()
                    .context("PORT must be a valid port number")?,
                host: var("HOST", "0.0.0.0"),
            },
            llm: LLMConfig {
                deployment: required("AZURE_OPENAI_CHAT_DEPLOYMENT_NAME")?,
                endpoint: required("AZURE_OPENAI_ENDPOINT")?
                    .trim_end_matches('/')
                    .to_string(),
                api_key: required("AZURE_OPENAI_API_KEY")?,
                api_version: var("AZURE_OPENAI_API_VERSION", DEFAULT_API_VERSION),
                max_tokens: lookup("LLM_MAX_TOKENS")
                    .map(|v| v.parse::<u32>())
                    .transpose()
                    .context("LLM_MAX_TOKENS must be an integer")?,
                temperature: lookup("LLM_TEMPERATURE")
                    .map(|v| v.parse::<f32>())
                    .transpose()
                    .context("LLM_TEMPERATURE must be a number")?,
            },
            documents: DocumentConfig {
                sources: parse_document_sources(&var(
                    "DOCUMENT_URLS",
                    &format!("2024={DEFAULT_DOCUMENT_URL}"),
                ))?,
                file_prefix: var("DOCUMENT_FILE_PREFIX", "goog-10-k-"),
            },
            agent: AgentConfig {
                work_dir: PathBuf::from(var("WORK_DIR", ".")),
                python_bin: var("PYTHON_BIN", "python3"),
                step_timeout_secs: var("AGENT_STEP_TIMEOUT_SECS", "120")
                    .parse()
                    .context("AGENT_STEP_TIMEOUT_SECS must be an integer")?,
                verbosity: var("AGENT_VERBOSITY", "2")
                    .parse()
                    .context("AGENT_VERBOSITY must be 0, 1 or 2")?,
            },
        })
    }
}

/// Parse `label=url` pairs separated by commas.
fn parse_document_sources(raw: &str) -> Result<Vec<DocumentSource>> {
    let sources = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (label, url) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("document entry '{entry}' is not of the form label=url"))?;
            Ok(DocumentSource {
                label: label.trim().to_string(),
                url: url.trim().to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if sources.is_empty() {
        return Err(anyhow!("DOCUMENT_URLS must name at least one document"));
    }
    Ok(sources)
}
