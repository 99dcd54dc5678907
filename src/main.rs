use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use taskpilot::agent::ChatService;
use taskpilot::config::Config;
use taskpilot::db::connect_from_config;
use taskpilot::history::Store;
use taskpilot::llm::create_llm_provider;
use taskpilot::server::{AppState, serve};
use taskpilot::tools::build_registry;

#[derive(Parser)]
#[command(name = "taskpilot", version, about = "Todo-list service with a conversational agent")]
struct Cli {
    /// Load environment variables from this file instead of `.env`.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Apply database migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            // A missing .env is fine; the environment may be set directly.
            let _ = dotenvy::dotenv();
        }
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("taskpilot=info,tower_http=debug"));
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::fmt().with_env_filter(env_filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server().await,
        Command::Migrate => run_migrations().await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    let db = connect_from_config(&config.database)
        .await
        .context("failed to open database")?;
    let store = Store::new(db);
    tracing::info!(path = %config.database.path, "Database ready");

    let llm = create_llm_provider(&config.llm).context("failed to build LLM provider")?;
    tracing::info!(model = %llm.model_name(), "LLM provider ready");

    let registry = Arc::new(
        build_registry(&store).map_err(|e| anyhow::anyhow!("tool registration failed: {e}"))?,
    );
    tracing::info!(tools = ?registry.names(), "Tools registered");

    let chat = ChatService::new(store.clone(), llm, registry, &config.agent);
    let state = AppState::new(store, chat, &config);

    serve(state, config.http.socket_addr()).await
}

async fn run_migrations() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    // connect_from_config runs migrations as part of opening the backend.
    connect_from_config(&config.database)
        .await
        .context("migration failed")?;
    tracing::info!(path = %config.database.path, "Migrations applied");
    Ok(())
}
