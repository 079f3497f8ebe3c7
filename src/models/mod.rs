use anyhow::Result;
use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Identity of an upload: file name plus byte size.
///
/// Two uploads with the same signature are treated as the same image, even if
/// their content differs. This mirrors how a browser re-submits the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSignature {
    pub file_name: String,
    pub size: usize,
}

impl ImageSignature {
    pub fn new(file_name: impl Into<String>, size: usize) -> Self {
        Self {
            file_name: file_name.into(),
            size,
        }
    }
}

impl std::fmt::Display for ImageSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.file_name, self.size)
    }
}

/// A decoded RGB image owned by one session.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub signature: ImageSignature,
    pub pixels: DynamicImage,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadedImage {
    /// Decode raw file bytes (JPEG/PNG) into an RGB bitmap.
    pub fn decode(file_name: &str, bytes: &[u8]) -> Result<Self> {
        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        log::debug!(
            "🖼️ Decoded {} ({} bytes) to {}x{}",
            file_name,
            bytes.len(),
            rgb.width(),
            rgb.height()
        );

        Ok(Self::from_pixels(
            ImageSignature::new(file_name, bytes.len()),
            DynamicImage::ImageRgb8(rgb),
        ))
    }

    pub fn from_pixels(signature: ImageSignature, pixels: DynamicImage) -> Self {
        Self {
            signature,
            pixels,
            uploaded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationCandidate {
    pub label: String,
    pub confidence: f32, // probability between 0.0 and 1.0
}

impl ClassificationCandidate {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentificationSource {
    Classifier,
    CaptionLlm,
}

impl std::fmt::Display for IdentificationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IdentificationSource::Classifier => "classifier",
            IdentificationSource::CaptionLlm => "caption_llm",
        };
        write!(f, "{}", s)
    }
}

/// Best guess for the food in an uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentificationResult {
    pub name: String,
    /// Classifier probability for `Classifier` results.
    ///
    /// For `CaptionLlm` results this is the top score of the rejected
    /// classifier attempt, kept for display only. It says nothing about how
    /// likely the inferred name is, and is `None` when the classifier produced
    /// no candidates at all.
    pub confidence: Option<f32>,
    pub source: IdentificationSource,
    /// Caption the name was inferred from (`CaptionLlm` only).
    pub caption: Option<String>,
}

/// Name reply used by the caption fallback when the image is not food.
pub const NON_FOOD: &str = "non-food";

impl IdentificationResult {
    pub fn from_classifier(candidate: &ClassificationCandidate) -> Self {
        Self {
            name: candidate.label.clone(),
            confidence: Some(candidate.confidence),
            source: IdentificationSource::Classifier,
            caption: None,
        }
    }

    pub fn is_non_food(&self) -> bool {
        self.name.trim().eq_ignore_ascii_case(NON_FOOD)
    }
}

/// Food name a human explicitly confirmed. Never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConfirmedFoodName(String);

impl ConfirmedFoodName {
    /// Trim `text`; `None` if nothing is left.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConfirmedFoodName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One chat-completion call: persona, prompt and sampling limits.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub persona: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

pub const FOOD_PERSONA: &str =
    "You are a helpful assistant specialized in food, nutrition, and healthy eating.";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

impl PromptRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            persona: FOOD_PERSONA.to_string(),
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Displayed LLM output for a confirmed name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EstimationReport {
    pub calories: Option<String>,
    pub health: Option<String>,
    pub tip: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmed_name_is_trimmed() {
        let name = ConfirmedFoodName::parse("  Idli \n").unwrap();
        assert_eq!(name.as_str(), "Idli");
        assert!(ConfirmedFoodName::parse("   ").is_none());
        assert!(ConfirmedFoodName::parse("").is_none());
    }

    #[test]
    fn test_signature_display() {
        let signature = ImageSignature::new("lunch.jpg", 2048);
        assert_eq!(signature.to_string(), "lunch.jpg_2048");
        assert_ne!(signature, ImageSignature::new("lunch.jpg", 2049));
    }

    #[test]
    fn test_non_food_detection() {
        let result = IdentificationResult {
            name: "Non-Food".to_string(),
            confidence: None,
            source: IdentificationSource::CaptionLlm,
            caption: Some("a red car".to_string()),
        };
        assert!(result.is_non_food());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(UploadedImage::decode("x.jpg", b"not an image").is_err());
    }
}
