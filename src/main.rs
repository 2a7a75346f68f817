use anyhow::{Context, Result};
use clap::Parser;
use speech_gateway::{create_router, AppState, Config, GoogleSpeechClient, Recognizer};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "speech-gateway", version, about = "Speech-to-text gateway")]
struct Args {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/speech-gateway")]
    config: String,

    /// Override the HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("Speech Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!(
        "Upload limit {} MB, formats [{}], language {}",
        cfg.stt.max_file_size_mb, cfg.stt.supported_formats, cfg.stt.default_language_code
    );

    let recognizer: Arc<dyn Recognizer> = Arc::new(
        GoogleSpeechClient::from_settings(&cfg.recognizer)
            .context("Failed to create recognizer client")?,
    );
    info!("Recognizer endpoint: {}", cfg.recognizer.endpoint);

    let app = create_router(AppState::new(&cfg, recognizer));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
