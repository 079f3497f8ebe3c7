use anyhow::Result;
use base64::{engine::general_purpose, Engine};
use image::{imageops::FilterType, DynamicImage, ImageOutputFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::models::ClassificationCandidate;

/// Labels containing any of these (case-insensitive) count as food.
pub const FOOD_KEYWORDS: &[&str] = &[
    "pizza", "sandwich", "burger", "hotdog", "burrito", "taco",
    "salad", "soup", "noodles", "spaghetti", "cake", "dessert",
    "meat", "steak", "rice", "bread", "food", "dish", "plate",
    "fries", "coffee", "biryani", "idli", "dosa", "samosa", "paneer",
    "chapati", "tikka", "dal", "saag", "kheer", "halwa", "poha", "ladoo",
];

pub fn is_food_label(label: &str) -> bool {
    let label = label.to_lowercase();
    FOOD_KEYWORDS.iter().any(|keyword| label.contains(keyword))
}

/// Input edge length the classifier model was trained on.
pub const CLASSIFIER_INPUT_SIZE: u32 = 224;

/// Image classification model.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    /// Up to `top_k` candidates, highest confidence first.
    async fn classify(&self, image: &DynamicImage, top_k: usize)
        -> Result<Vec<ClassificationCandidate>>;
}

/// Square resize plus PNG encoding, ready to post to the model.
pub fn preprocess(image: &DynamicImage) -> Result<Vec<u8>> {
    let resized = image.resize_exact(CLASSIFIER_INPUT_SIZE, CLASSIFIER_INPUT_SIZE, FilterType::Triangle);
    let mut buf = Vec::new();
    resized.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)?;
    Ok(buf)
}

/// JSON body for the hosted model; without `top_k` it answers with five labels.
#[derive(Debug, Serialize)]
struct ClassifyRequest {
    inputs: String,
    parameters: ClassifyParameters,
}

#[derive(Debug, Serialize)]
struct ClassifyParameters {
    top_k: usize,
}

impl ClassifyRequest {
    fn new(png: &[u8], top_k: usize) -> Self {
        Self {
            inputs: general_purpose::STANDARD.encode(png),
            parameters: ClassifyParameters { top_k },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPrediction {
    label: String,
    score: f32,
}

/// Sort by score (descending) and keep the first `top_k`.
fn rank(mut predictions: Vec<RawPrediction>, top_k: usize) -> Vec<ClassificationCandidate> {
    predictions.sort_by(|a, b| b.score.total_cmp(&a.score));
    predictions
        .into_iter()
        .take(top_k)
        .map(|p| ClassificationCandidate::new(p.label, p.score))
        .collect()
}

/// Hosted image classifier on the Hugging Face inference API.
pub struct HuggingFaceClassifier {
    api_token: Option<String>,
    model_url: String,
    client: reqwest::Client,
}

impl HuggingFaceClassifier {
    pub fn new(api_token: Option<String>, inference_url: &str, model: &str) -> Self {
        Self {
            api_token,
            model_url: format!("{}/{}", inference_url.trim_end_matches('/'), model),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Classifier for HuggingFaceClassifier {
    async fn classify(
        &self,
        image: &DynamicImage,
        top_k: usize,
    ) -> Result<Vec<ClassificationCandidate>> {
        let png = preprocess(image)?;
        log::info!("🔍 Classifying image via {} (top-{})", self.model_url, top_k);
        log::debug!("📤 Classifier payload size: {} bytes", png.len());

        let mut request = self
            .client
            .post(&self.model_url)
            .json(&ClassifyRequest::new(&png, top_k));
        if let Some(token) = &self.api_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            log::error!("❌ Classifier API error ({}): {}", status, error_text);
            anyhow::bail!("Classifier API error ({}): {}", status, error_text);
        }

        let predictions: Vec<RawPrediction> = response.json().await?;
        let candidates = rank(predictions, top_k);
        log::debug!("📊 Classifier candidates: {:?}", candidates);
        Ok(candidates)
    }
}
