mod config;
mod error;
mod handlers;
mod models;
mod prompt;
mod services;
mod session;
#[cfg(feature = "web-server")]
mod web; // HTML form + JSON API

#[cfg(feature = "web-server")]
use web::{
    page::PageRenderer,
    server::{create_router, AppState},
};

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;

use config::Config;
use handlers::SubmissionHandler;
use services::{GeminiService, InferenceClient};
use session::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables first so RUST_LOG from .env applies
    dotenv().ok();

    // Initialize logger
    env_logger::init();

    log::info!("🚀 Starting FoodAnalyzer AI...");

    // Fail fast on a missing credential instead of at the first analysis
    let config = Config::from_env().context("invalid configuration")?;

    let gemini = Arc::new(GeminiService::new(
        config.google_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
    ));
    log::info!("✅ Gemini service initialized with model: {}", gemini.model_name());

    let handler = SubmissionHandler::new(gemini as Arc<dyn InferenceClient>);
    log::info!("✅ Submission handler initialized");

    let sessions = Arc::new(SessionStore::new(config.session_ttl));

    // Sweep idle sessions in the background
    let sweep_every = config.session_ttl.min(Duration::from_secs(60));
    let sweeper_sessions = sessions.clone();
    let sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            sweeper_sessions.prune_idle(chrono::Utc::now()).await;
            log::debug!("👥 Live sessions: {}", sweeper_sessions.len().await);
        }
    });
    log::info!(
        "✅ Session sweeper started (ttl: {} min)",
        config.session_ttl.as_secs() / 60
    );

    #[cfg(feature = "web-server")]
    {
        let state = Arc::new(AppState {
            handler,
            sessions: sessions.clone(),
            pages: PageRenderer::new().context("failed to load page template")?,
        });
        let app = create_router(state, config.max_upload_bytes);

        let listener = tokio::net::TcpListener::bind(&config.bind_addr)
            .await
            .with_context(|| format!("failed to bind {}", config.bind_addr))?;

        log::info!("🌐 Web server listening on http://{}", config.bind_addr);
        log::info!("🎉 FoodAnalyzer AI is ready!");

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
            })
            .await
            .context("web server failed")?;
    }

    #[cfg(not(feature = "web-server"))]
    {
        drop(handler);
        log::warn!("⚠️ Built without the web-server feature, nothing to serve");
    }

    log::info!("🛑 Shutting down...");
    sweeper.abort();

    Ok(())
}
