use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use finagent::{
    agents::{execute_analysis_pipeline, FinancialAnalyst},
    config::Config,
    document::{build_document_context, download_all, planned_documents},
    llm::LLM,
    prompts::DEFAULT_TASK,
    routes::create_router,
    sandbox::PythonExecutor,
    utils::init_tracing,
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "finagent", version, about = "Financial analysis agent over 10-K filings")]
struct Cli {
    /// Use documents already present in the workspace directory
    #[arg(long, global = true, env = "SKIP_DOWNLOAD")]
    skip_download: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web form (default)
    Serve,
    /// Run a single analysis and print the result
    Run {
        /// File holding the task prompt; the built-in task is used otherwise
        #[arg(long)]
        prompt_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);
    info!(llm = ?config.llm, "Model configuration");

    tokio::fs::create_dir_all(&config.agent.work_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.agent.work_dir.display()))?;

    let documents = if cli.skip_download {
        planned_documents(&config.documents)
    } else {
        let client = reqwest::Client::new();
        download_all(&client, &config.documents, &config.agent.work_dir)
            .await
            .context("Failed to download documents")?
    };
    let context = build_document_context(&documents);

    let llm = Arc::new(LLM::from_config(&config.llm));
    let executor = Arc::new(PythonExecutor::new(
        config.agent.python_bin.clone(),
        config.agent.work_dir.clone(),
    ));
    let analyst = FinancialAnalyst::new(llm, executor, &config.agent);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Run { prompt_file } => {
            let task = match prompt_file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => DEFAULT_TASK.to_string(),
            };
            let output =
                execute_analysis_pipeline(&analyst, &task, &context, &config.agent.work_dir)
                    .await?;
            println!("{}", output.text);
            if let Some(path) = output.image_path {
                println!("\nPlot: {}", path.display());
            }
        }
        Command::Serve => {
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let state = AppState {
                config: Arc::new(config),
                analyst: Arc::new(analyst),
                documents: Arc::new(documents),
                context: Arc::new(context),
            };
            let app = create_router(state);

            let listener = TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("Server listening on {}", addr);
            axum::serve(listener, app)
                .await
                .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;
        }
    }

    Ok(())
}
