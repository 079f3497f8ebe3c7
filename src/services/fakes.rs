//! Deterministic stand-ins for the model and LLM adapters.

use anyhow::Result;
use image::DynamicImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::caption::CaptionModel;
use super::classifier::Classifier;
use super::llm::{Completer, LlmError};
use crate::models::{ClassificationCandidate, PromptRequest};

type Responder = Box<dyn Fn(&PromptRequest) -> Result<String, LlmError> + Send + Sync>;

pub struct FakeCompleter {
    responder: Responder,
    prompts: Mutex<Vec<PromptRequest>>,
}

impl FakeCompleter {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&PromptRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    pub fn failing_missing_credential() -> Self {
        Self::new(|_| Err(LlmError::MissingCredential))
    }

    /// Answers by prompt kind, so a whole session can run on one fake.
    pub fn by_topic(food_name: &str) -> Self {
        let food_name = food_name.to_string();
        Self::new(move |request| {
            let prompt = &request.prompt;
            let reply = if prompt.contains("image caption") {
                food_name.clone()
            } else if prompt.contains("Estimate the total calories") {
                "- 350 kcal per serving".to_string()
            } else if prompt.contains("evaluate whether") {
                "Moderately healthy.".to_string()
            } else {
                "Use less oil.".to_string()
            };
            Ok(reply)
        })
    }

    pub fn prompts(&self) -> Vec<PromptRequest> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Completer for FakeCompleter {
    async fn complete(&self, request: &PromptRequest) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }
}

pub struct FakeClassifier {
    candidates: Option<Vec<ClassificationCandidate>>,
    calls: AtomicUsize,
}

impl FakeClassifier {
    pub fn returning(candidates: &[(&str, f32)]) -> Self {
        Self {
            candidates: Some(
                candidates
                    .iter()
                    .map(|(label, confidence)| ClassificationCandidate::new(*label, *confidence))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            candidates: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Classifier for FakeClassifier {
    async fn classify(
        &self,
        _image: &DynamicImage,
        top_k: usize,
    ) -> Result<Vec<ClassificationCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.candidates {
            Some(candidates) => Ok(candidates.iter().take(top_k).cloned().collect()),
            None => anyhow::bail!("model not loaded"),
        }
    }
}

pub struct FakeCaptioner {
    caption: Option<String>,
    calls: AtomicUsize,
}

impl FakeCaptioner {
    pub fn returning(caption: &str) -> Self {
        Self {
            caption: Some(caption.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            caption: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CaptionModel for FakeCaptioner {
    async fn caption(&self, _image: &DynamicImage) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.caption {
            Some(caption) => Ok(caption.clone()),
            None => anyhow::bail!("caption model timed out"),
        }
    }
}

/// Small solid image with the given upload identity.
pub fn test_image(file_name: &str, size: usize) -> crate::models::UploadedImage {
    use crate::models::{ImageSignature, UploadedImage};

    UploadedImage::from_pixels(
        ImageSignature::new(file_name, size),
        DynamicImage::ImageRgb8(image::RgbImage::from_pixel(8, 8, image::Rgb([200, 120, 40]))),
    )
}

/// Serve `app` on a random local port; returns its base URL.
pub async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

/// Answer every request with `status` and `body`.
pub async fn serve_status(status: axum::http::StatusCode, body: &'static str) -> String {
    serve(axum::Router::new().fallback(move || async move { (status, body) })).await
}

/// Base URL of a local port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
