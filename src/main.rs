//! MediPredict: Multi-disease risk prediction service
//!
//! Main entry point for the HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use medipredict::adapters::artifact_fs::verifying_key_from_b64;
use medipredict::adapters::redact::RedactingMakeWriter;
use medipredict::adapters::{DisabledNarrative, FsArtifactStore, GeminiNarrative};
use medipredict::application::{ModelRegistry, PredictionService};
use medipredict::config::ServiceConfig;
use medipredict::ports::NarrativeGenerator;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    //
    // - stdout (default): suits containers and `journalctl`
    // - file: appends to MEDIPREDICT_LOG_FILE
    let log_mode = std::env::var("MEDIPREDICT_LOG_MODE").unwrap_or_else(|_| "stdout".to_string());

    let (writer, _guard) = if log_mode == "file" {
        let log_file = std::env::var("MEDIPREDICT_LOG_FILE")
            .unwrap_or_else(|_| "medipredict.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("cannot open log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(RedactingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting MediPredict...");

    let config = ServiceConfig::from_env()?;

    let mut store = FsArtifactStore::new(&config.model_dir).require_manifest(config.require_manifest);
    if let Some(path) = &config.artifact_pubkey_file {
        let b64 = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read artifact public key {}", path.display()))?;
        store = store.with_verifying_key(verifying_key_from_b64(&b64)?);
        tracing::info!("Signed artifact manifest required");
    }

    // Artifacts load before the listener is bound.
    let registry = ModelRegistry::load(&store)
        .with_context(|| format!("no model could be loaded from {:?}", store.dir()))?;

    let narrative: Arc<dyn NarrativeGenerator> = match config.narrative {
        Some(n) => {
            tracing::info!("Narrative reports enabled (model={})", n.model);
            Arc::new(GeminiNarrative::new(n.endpoint, n.model, n.api_key, n.timeout))
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not set; narrative reports disabled");
            Arc::new(DisabledNarrative)
        }
    };

    let service = Arc::new(PredictionService::new(Arc::new(registry), narrative));
    let app = medipredict::http::router(service);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.bind_addr))?;
    tracing::info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("MediPredict shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
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
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
