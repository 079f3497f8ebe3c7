use anyhow::Result;
use image::{DynamicImage, ImageOutputFormat};
use serde::Deserialize;
use std::io::Cursor;

/// Longest edge sent to the caption model.
pub const CAPTION_MAX_EDGE: u32 = 384;

/// Caption-generation model.
#[async_trait::async_trait]
pub trait CaptionModel: Send + Sync {
    async fn caption(&self, image: &DynamicImage) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct GeneratedCaption {
    generated_text: String,
}

fn first_caption(captions: Vec<GeneratedCaption>) -> Result<String> {
    let caption = captions
        .into_iter()
        .map(|c| c.generated_text.trim().to_string())
        .find(|c| !c.is_empty());

    match caption {
        Some(caption) => Ok(caption),
        None => anyhow::bail!("Caption model returned no text"),
    }
}

/// Hosted caption model on the Hugging Face inference API.
pub struct HuggingFaceCaptioner {
    api_token: Option<String>,
    model_url: String,
    client: reqwest::Client,
}

impl HuggingFaceCaptioner {
    pub fn new(api_token: Option<String>, inference_url: &str, model: &str) -> Self {
        Self {
            api_token,
            model_url: format!("{}/{}", inference_url.trim_end_matches('/'), model),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl CaptionModel for HuggingFaceCaptioner {
    async fn caption(&self, image: &DynamicImage) -> Result<String> {
        // thumbnail() keeps the aspect ratio and never upscales
        let scaled = image.thumbnail(CAPTION_MAX_EDGE, CAPTION_MAX_EDGE);
        let mut payload = Vec::new();
        scaled.write_to(&mut Cursor::new(&mut payload), ImageOutputFormat::Png)?;

        log::info!("📝 Generating caption via {}", self.model_url);
        log::debug!("📤 Caption payload size: {} bytes", payload.len());

        let mut request = self
            .client
            .post(&self.model_url)
            .header("Content-Type", "image/png")
            .body(payload);
        if let Some(token) = &self.api_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            log::error!("❌ Caption API error ({}): {}", status, error_text);
            anyhow::bail!("Caption API error ({}): {}", status, error_text);
        }

        let captions: Vec<GeneratedCaption> = response.json().await?;
        let caption = first_caption(captions)?;
        log::info!("💬 Caption: {}", caption);
        Ok(caption)
    }
}
