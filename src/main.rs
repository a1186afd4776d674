//! Fieldglass backend server

use std::path::PathBuf;
use std::sync::Arc;

use color_eyre::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fieldglass::api::{self, AppContext};
use fieldglass::capture::V4l2Source;
use fieldglass::knowledge::KnowledgeBase;
use fieldglass::vision::{DetectionProvider, SimulatedOcr, TextExtractionProvider};
use fieldglass::{Config, CONFIG_PATH_ENV};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("Fieldglass launching...");

    // No inference runtime is linked; detection runs in mock mode
    let detector = DetectionProvider::unavailable(format!(
        "no inference backend for model {}",
        config.vision.model
    ));
    let ocr = if config.vision.simulated_ocr {
        TextExtractionProvider::new(Box::new(SimulatedOcr::default()))
    } else {
        TextExtractionProvider::unavailable("text recognition disabled")
    };

    let bind = config.server.bind;
    let ctx = AppContext::new(
        config,
        Arc::new(V4l2Source::default()),
        detector,
        ocr,
        KnowledgeBase::default(),
    );
    let manager = ctx.manager.clone();

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on {}", bind);

    axum::serve(listener, api::router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, releasing camera");
    if let Err(e) = tokio::task::spawn_blocking(move || manager.stop()).await {
        warn!("Stream shutdown task failed: {}", e);
    }

    info!("Fieldglass stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
