use std::sync::Arc;
use thiserror::Error;

use crate::models::{ClassificationCandidate, IdentificationResult, IdentificationSource, UploadedImage};
use crate::services::classifier::is_food_label;
use crate::services::{CaptionModel, Classifier, LlmError, NameInference};

/// The classifier produced nothing usable. Always recovered from by
/// switching to the caption path.
#[derive(Debug, Error)]
#[error("Classifier unavailable: {reason}")]
pub struct ClassifierUnavailable {
    pub reason: String,
}

/// The caption fallback itself failed.
#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("Caption generation failed: {0:#}")]
    Caption(anyhow::Error),
    #[error("Food name inference failed: {0}")]
    NameInference(#[from] LlmError),
}

/// First candidate, in rank order, that is a food label at or above `threshold`.
pub fn first_confident_food(
    candidates: &[ClassificationCandidate],
    threshold: f32,
) -> Option<&ClassificationCandidate> {
    candidates
        .iter()
        .find(|c| is_food_label(&c.label) && c.confidence >= threshold)
}

/// Classifier first, caption + LLM when the classifier is not confident.
/// `top_k` is passed through as given; a zero asks for no candidates and
/// always takes the caption path.
pub struct FoodIdentifier {
    classifier: Arc<dyn Classifier>,
    captioner: Arc<dyn CaptionModel>,
    name_inference: NameInference,
    top_k: usize,
}

impl FoodIdentifier {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        captioner: Arc<dyn CaptionModel>,
        name_inference: NameInference,
        top_k: usize,
    ) -> Self {
        Self {
            classifier,
            captioner,
            name_inference,
            top_k,
        }
    }

    pub async fn identify(
        &self,
        image: &UploadedImage,
        threshold: f32,
    ) -> Result<IdentificationResult, IdentifyError> {
        log::info!("🔍 Identifying food in {} (threshold {:.2})", image.signature, threshold);

        let fallback_confidence = match self.ranked_candidates(image).await {
            Ok(candidates) => {
                if let Some(hit) = first_confident_food(&candidates, threshold) {
                    log::info!("✅ Classifier detected {} ({:.2}%)", hit.label, hit.confidence * 100.0);
                    return Ok(IdentificationResult::from_classifier(hit));
                }
                log::info!("🤔 No confident food label, falling back to caption");
                candidates.first().map(|c| c.confidence)
            }
            Err(e) => {
                log::warn!("⚠️ {}, falling back to caption", e);
                None
            }
        };

        let caption = self
            .captioner
            .caption(&image.pixels)
            .await
            .map_err(IdentifyError::Caption)?;
        let name = self.name_inference.infer(&caption).await?;

        Ok(IdentificationResult {
            name,
            confidence: fallback_confidence,
            source: IdentificationSource::CaptionLlm,
            caption: Some(caption),
        })
    }

    async fn ranked_candidates(
        &self,
        image: &UploadedImage,
    ) -> Result<Vec<ClassificationCandidate>, ClassifierUnavailable> {
        let candidates = self
            .classifier
            .classify(&image.pixels, self.top_k)
            .await
            .map_err(|e| ClassifierUnavailable {
                reason: format!("{:#}", e),
            })?;

        if candidates.is_empty() {
            return Err(ClassifierUnavailable {
                reason: "no candidates returned".to_string(),
            });
        }
        Ok(candidates)
    }
}
