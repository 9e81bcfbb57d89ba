use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod tts;

#[cfg(test)]
mod test_support;

use api::routes::{create_router, AppState};
use config::ServerConfig;
use tts::{PiperEngine, TtsService};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Piper synthesis server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Piper binary: {}", config.piper_bin.display());
    tracing::info!("Piper model: {}", config.piper_model.display());
    tracing::info!("Output directory: {}", config.output_dir.display());

    std::fs::create_dir_all(&config.output_dir)?;

    let engine = PiperEngine::new(&config.piper_bin, &config.piper_model)
        .with_timeout(config.synth_timeout)
        .with_self_test_timeout(config.self_test_timeout)
        .with_speaker_arg(config.speaker_arg);

    let tts = TtsService::new(Arc::new(engine), config.output_dir.clone())
        .with_max_text_chars(config.max_text_chars);

    // Report problems early; the server still starts so /health can explain them.
    let health = tts.check_health().await;
    match &health.error {
        None => tracing::info!(
            "Engine ready (version {})",
            health.engine_version.as_deref().unwrap_or("unknown")
        ),
        Some(error) => tracing::warn!("Engine not ready: {}", error),
    }

    let state = Arc::new(AppState { tts });
    let app = create_router(state);

    tracing::info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
