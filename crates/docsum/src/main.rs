use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsum_common::{logger, AppConfig};
use docsum_llm::{CancellationToken, Pipeline};
use docsum_server::{extract_document, DocumentKind, SummaryResponse};
use std::path::{Path, PathBuf};

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    }
}

#[derive(Parser)]
#[command(name = "docsum")]
#[command(about = "Docsum - LLM document summarization service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long)]
        port: Option<u16>,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Summarize a PDF or text file and print the result
    Summarize {
        /// Document to summarize
        file: PathBuf,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_dotenv_from_project_root();

    match cli.command {
        Some(Commands::Serve { host, port, config }) => {
            let mut config = AppConfig::load(config.as_deref())?;
            if let Some(host) = host {
                config.server_host = host;
            }
            if let Some(port) = port {
                config.server_port = port;
            }
            serve(config).await?;
        }
        Some(Commands::Summarize { file, json, config }) => {
            let config = AppConfig::load(config.as_deref())?;
            summarize(config, &file, json).await?;
        }
        None => {
            serve(AppConfig::from_env()?).await?;
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    tracing::info!("Docsum starting...");
    tracing::info!("Configuration loaded:");
    tracing::info!("  Bind: {}", config.server_bind_address());
    tracing::info!("  Backend: {:?}", config.backend);
    tracing::info!(
        "  Chunking: target {} / overlap {}",
        config.summarization.target_size,
        config.summarization.overlap
    );

    println!("Server listening on http://{}", config.server_bind_address());

    docsum_server::start_server(config).await?;
    Ok(())
}

async fn summarize(config: AppConfig, file: &Path, json: bool) -> Result<()> {
    // stdout carries the summary only
    logger::setup_console_logging(&config.log_level)?;
    config.validate()?;

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file.file_name().map(|n| n.to_string_lossy().to_string());
    let kind = DocumentKind::detect(None, filename.as_deref())?;
    let document = extract_document(bytes, kind, filename).await?;

    let pipeline = Pipeline::from_config(&config)?;
    let cancel = CancellationToken::new();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling summarization");
            ctrl_c.cancel();
        }
    });

    let summary = pipeline.run(&document, &cancel).await?;

    for warning in &summary.warnings {
        tracing::warn!("{}", warning);
    }

    if json {
        let response = SummaryResponse::from(summary);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if summary.empty {
        eprintln!("Document contains no text");
    } else {
        println!("{}", summary.text);
    }

    Ok(())
}
