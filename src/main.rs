mod config;
mod handlers;
mod models;
mod prompts;
mod services;
mod web;

use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;

use config::Config;
use handlers::{EstimationService, FoodIdentifier, SessionHandler};
use services::{Completer, GroqClient, HuggingFaceCaptioner, HuggingFaceClassifier, NameInference};
use web::server::create_router;

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so it can set RUST_LOG
    dotenv().ok();
    env_logger::init();

    log::info!("🚀 Starting Food Calorie Estimator...");

    let config = Config::from_env()?;

    if config.groq_api_key.is_none() {
        log::warn!("⚠️ GROQ_API_KEY not set, LLM answers will report the missing key");
    }
    let completer: Arc<dyn Completer> = Arc::new(GroqClient::new(
        config.groq_api_key.clone(),
        config.groq_api_url.clone(),
        config.groq_model.clone(),
    ));
    log::info!("✅ LLM client initialized with model: {}", config.groq_model);

    // Model adapters are built once and shared by every session
    let classifier = Arc::new(HuggingFaceClassifier::new(
        config.hf_api_token.clone(),
        &config.hf_inference_url,
        &config.classifier_model,
    ));
    let captioner = Arc::new(HuggingFaceCaptioner::new(
        config.hf_api_token.clone(),
        &config.hf_inference_url,
        &config.caption_model,
    ));
    log::info!(
        "✅ Vision adapters initialized (classifier: {}, caption: {})",
        config.classifier_model,
        config.caption_model
    );

    let identifier = Arc::new(FoodIdentifier::new(
        classifier,
        captioner,
        NameInference::new(completer.clone()),
        config.top_k,
    ));
    let estimator = Arc::new(EstimationService::new(completer));
    let handler = Arc::new(SessionHandler::new(
        identifier,
        estimator,
        config.confidence_threshold,
    ));
    log::info!(
        "✅ Session handler ready (threshold {:.2}, top-{})",
        config.confidence_threshold,
        config.top_k
    );

    let app = create_router(
        handler,
        config.max_upload_bytes,
        chrono::Duration::minutes(config.session_idle_minutes),
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    log::info!("🌐 Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("🛑 Shutting down...");
        })
        .await?;

    Ok(())
}
