mod cli;
mod commands;
mod render;
mod repl;

use std::process::ExitCode;
use std::time::Duration;

use parlance_chat::{ChatController, ControllerOptions, FileBackend, HttpTransport, HttpTransportConfig};
use parlance_common::ParlanceError;
use parlance_config::schema::LogLevel;
use parlance_config::ParlanceConfig;
use tracing_subscriber::EnvFilter;

/// `--log-level` wins, then `RUST_LOG`, then the config file.
fn init_logging(cli_level: Option<&str>, config_level: LogLevel) {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config_level.as_directive())),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn controller_options(config: &ParlanceConfig) -> ControllerOptions {
    ControllerOptions {
        max_tokens: config.chat.max_tokens,
        media_base_url: config.backend.base_url.clone(),
        image_size: config.images.size.clone(),
        image_style: config.images.style.clone(),
        image_log_capacity: config.images.log_capacity as usize,
    }
}

fn transport_config(config: &ParlanceConfig) -> HttpTransportConfig {
    HttpTransportConfig::new(config.backend.base_url.clone())
        .with_chat_path(config.backend.chat_path.clone())
        .with_image_path(config.backend.image_path.clone())
        .with_connect_timeout(Duration::from_secs(u64::from(
            config.backend.connect_timeout_secs,
        )))
}

async fn run(args: cli::Args, config: ParlanceConfig) -> Result<(), ParlanceError> {
    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => parlance_config::resolve_data_dir(&config)?,
    };
    let backend = FileBackend::open(&data_dir)?;
    tracing::info!(data_dir = %data_dir.display(), "session data");

    let transport = HttpTransport::new(transport_config(&config))
        .map_err(|e| ParlanceError::Chat(e.to_string()))?;
    tracing::info!(endpoint = %config.backend.chat_url(), "backend configured");

    let mut controller = ChatController::new(transport, backend, controller_options(&config));
    repl::run(&mut controller).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    // Logging depends on the config, so load errors are reported after init.
    let loaded = parlance_config::load_config(args.config.as_deref());
    let config_level = loaded
        .as_ref()
        .map(|c| c.logging.level)
        .unwrap_or_default();
    init_logging(args.log_level.as_deref(), config_level);

    tracing::info!("Parlance v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {}", path.display());
    }
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        ParlanceConfig::default()
    });

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("parlance: {e}");
            ExitCode::FAILURE
        }
    }
}
