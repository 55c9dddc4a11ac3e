//! admissions-nlu binary entry point

use admissions_nlu::logging::{init_logging, LogConfig};
use admissions_nlu::{AdmissionsAssistant, NluConfig, SessionId, TurnOutcome};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(name = "admissions-nlu")]
#[command(about = "Vietnamese admissions question understanding", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory with intent.csv, synonym.csv, entity.json and the reference tables
    #[arg(short, long, env = "NLU_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Session identifier (random when omitted)
    #[arg(short, long)]
    session: Option<String>,

    /// Ignore the stored session context
    #[arg(long)]
    no_context: bool,

    /// Handle a single message and exit
    #[arg(short, long)]
    message: Option<String>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        print!("{}", NluConfig::sample_toml()?);
        return Ok(());
    }

    let mut config = NluConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    // guard を保持しないとファイル出力が失われる
    let _log_guard = init_logging(&LogConfig::from_settings(&config.logging))?;

    let assistant = AdmissionsAssistant::load(&config)
        .with_context(|| format!("failed to load data from {}", config.data_dir.display()))?;
    let session = cli.session.map(SessionId::from).unwrap_or_default();
    let use_context = !cli.no_context;

    if let Some(message) = cli.message {
        let outcome = assistant.handle_message(&session, &message, use_context).await?;
        print_outcome(&outcome)?;
        return Ok(());
    }

    run_repl(&assistant, &session, use_context).await
}

/// 標準入力から一行ずつ処理する
async fn run_repl(assistant: &AdmissionsAssistant, session: &SessionId, use_context: bool) -> Result<()> {
    tracing::info!(session = %session, "🚀 interactive mode, :context / :reset / :quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            ":quit" | ":q" => break,
            ":context" => {
                let context = assistant.get_context(session).await?;
                let body = serde_json::to_string_pretty(&context)?;
                stdout.write_all(body.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
            ":reset" => {
                let existed = assistant.reset_context(session).await?;
                let body = serde_json::json!({ "reset": existed });
                stdout.write_all(body.to_string().as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
            message => match assistant.handle_message(session, message, use_context).await {
                Ok(outcome) => {
                    let body = serde_json::to_string(&outcome)?;
                    stdout.write_all(body.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                }
                Err(e) => {
                    tracing::error!(code = e.code(), "turn failed: {}", e);
                    let body = serde_json::json!({ "error": e.code(), "message": e.to_string() });
                    stdout.write_all(body.to_string().as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                }
            },
        }
        stdout.flush().await?;
    }

    Ok(())
}

fn print_outcome(outcome: &TurnOutcome) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}
