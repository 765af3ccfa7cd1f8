use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use querent_core::provider::LlmProvider;
use querent_engine::{introspection_registry, Pipeline};
use querent_llm::{OpenAiConfig, OpenAiProvider, TimeoutProvider};
use querent_server::{AppState, ServerConfig};
use querent_telemetry::TelemetryConfig;

/// Natural-language to SQL query service.
#[derive(Debug, Parser)]
#[command(name = "querent", version)]
struct Args {
    /// JSON settings file (defaults to querent.json or $QUERENT_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind, overriding settings.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overriding settings.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = querent_settings::load(args.config.as_deref()).context("failed to load settings")?;

    let telemetry = querent_telemetry::init_telemetry(TelemetryConfig {
        level: settings.logging.level.clone(),
        json: settings.logging.json,
        log_dir: settings.logging.directory.clone(),
    })
    .context("failed to initialize logging")?;
    if let Some(dir) = telemetry.log_dir() {
        tracing::info!(dir = %dir.display(), "writing logs to daily files");
    }

    tracing::info!("starting querent");

    let db = querent_db::connect(&settings.database)
        .await
        .context("failed to connect to database")?;

    let api_key = settings
        .llm
        .api_key
        .clone()
        .context("an OpenAI API key is required (set OPENAI_API_KEY)")?;
    let call_timeout = Duration::from_secs(settings.llm.call_timeout_secs);

    let openai = OpenAiProvider::new(OpenAiConfig {
        api_key,
        model: settings.llm.model.clone(),
        base_url: settings.llm.base_url.clone(),
        temperature: settings.llm.temperature,
    })?;
    let provider: Arc<dyn LlmProvider> = Arc::new(TimeoutProvider::new(openai, call_timeout));
    tracing::info!(model = provider.model(), "LLM provider initialized");

    let registry = Arc::new(introspection_registry(Arc::clone(&db)));
    let pipeline = Pipeline::new(provider, registry, db.dialect())?.with_tool_timeout(call_timeout);

    let config = ServerConfig {
        host: args.host.unwrap_or(settings.server.host),
        port: args.port.unwrap_or(settings.server.port),
        request_timeout_secs: settings.server.request_timeout_secs,
    };
    let handle = querent_server::start(config, AppState::new(pipeline))
        .await
        .context("failed to start server")?;

    tracing::info!(addr = %handle.addr(), "querent ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    handle.shutdown().await;
    Ok(())
}
