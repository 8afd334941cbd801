mod config;
mod errors;
mod handlers;
mod models;
mod server;
mod services;

use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;

use config::Config;
use handlers::FoodAnalyzer;
use server::create_router;
use services::{GeminiService, VisionModel};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    let config = Config::from_env();
    let debug = config.as_ref().map(|c| c.debug).unwrap_or(false);

    // Initialize logger (RUST_LOG still wins)
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if debug { "debug" } else { "info" }),
    )
    .init();

    log::info!("🚀 Starting food vision API...");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Error configuring Gemini API: {}", e);
            return Err(e.into());
        }
    };

    let gemini = Arc::new(GeminiService::new(&config)?);
    log::info!("✅ Gemini service initialized with model: {}", gemini.model_name());

    let analyzer = FoodAnalyzer::new(gemini, config.max_image_dimension, config.jpeg_quality);
    let app = create_router(analyzer, config.max_upload_bytes);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("🌐 Server listening on http://{}", addr);
    log::info!(
        "📏 Upload limit {} bytes, images larger than {}px are downscaled",
        config.max_upload_bytes,
        config.max_image_dimension
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("🛑 Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("❌ Failed to listen for shutdown signal: {}", e);
    }
}
