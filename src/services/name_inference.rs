use std::sync::Arc;

use super::llm::{Completer, LlmError};
use crate::models::PromptRequest;
use crate::prompts;

/// Asks the LLM which food a caption describes.
pub struct NameInference {
    completer: Arc<dyn Completer>,
}

impl NameInference {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self { completer }
    }

    /// Proposed food name, or the literal `"non-food"` when the model says so.
    pub async fn infer(&self, caption: &str) -> Result<String, LlmError> {
        let request = PromptRequest::new(prompts::food_name_from_caption(caption))
            .with_max_tokens(prompts::NAME_INFERENCE_MAX_TOKENS);

        let reply = self.completer.complete(&request).await?;
        let name = reply.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string();
        log::info!("🧠 Inferred food name from caption: {}", name);
        Ok(name)
    }
}
