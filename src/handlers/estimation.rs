use std::sync::Arc;

use crate::models::{ConfirmedFoodName, PromptRequest};
use crate::prompts;
use crate::services::{Completer, LlmError};

/// Calorie, health and tip prompts for a confirmed food name. Each call is
/// independent of the others.
pub struct EstimationService {
    completer: Arc<dyn Completer>,
}

impl EstimationService {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self { completer }
    }

    pub async fn calories(&self, name: &ConfirmedFoodName) -> Result<String, LlmError> {
        log::info!("🔥 Estimating calories for {}", name);
        let request = PromptRequest::new(prompts::calorie_estimation(name.as_str()))
            .with_max_tokens(prompts::CALORIE_MAX_TOKENS);
        self.completer.complete(&request).await
    }

    pub async fn health(&self, name: &ConfirmedFoodName) -> Result<String, LlmError> {
        log::info!("❤️ Evaluating health of {}", name);
        let request = PromptRequest::new(prompts::health_evaluation(name.as_str()))
            .with_max_tokens(prompts::HEALTH_MAX_TOKENS);
        self.completer.complete(&request).await
    }

    pub async fn tip(&self, name: &ConfirmedFoodName) -> Result<String, LlmError> {
        log::info!("💡 Generating health tip for {}", name);
        let request = PromptRequest::new(prompts::health_tip(name.as_str()))
            .with_max_tokens(prompts::TIP_MAX_TOKENS);
        self.completer.complete(&request).await
    }
}

/// Text to display for an estimate: the answer, or the error message.
/// An empty prompt is a warning, everything else an error.
pub fn display_text(result: Result<String, LlmError>) -> String {
    match result {
        Ok(text) => text,
        Err(e @ LlmError::EmptyPrompt) => {
            log::warn!("⚠️ Estimation skipped: {}", e);
            format!("⚠️ {}", e)
        }
        Err(e) => {
            log::error!("❌ Estimation failed: {}", e);
            format!("❌ {}", e)
        }
    }
}
