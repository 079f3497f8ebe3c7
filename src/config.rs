use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_GROQ_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_CLASSIFIER_MODEL: &str = "google/mobilenet_v2_1.0_224";
pub const DEFAULT_CAPTION_MODEL: &str = "Salesforce/blip-image-captioning-base";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.70;
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_SESSION_IDLE_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    /// Missing key is not fatal: every LLM call reports it instead.
    pub groq_api_key: Option<String>,
    pub groq_api_url: String,
    pub groq_model: String,
    pub hf_api_token: Option<String>,
    pub hf_inference_url: String,
    pub classifier_model: String,
    pub caption_model: String,
    pub confidence_threshold: f32,
    pub top_k: usize,
    pub bind_addr: String,
    pub max_upload_bytes: usize,
    /// Sessions untouched for longer than this are dropped.
    pub session_idle_minutes: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let confidence_threshold = match get("FOOD_CONFIDENCE_THRESHOLD") {
            Some(raw) => raw
                .trim()
                .parse::<f32>()
                .with_context(|| format!("FOOD_CONFIDENCE_THRESHOLD is not a number: {}", raw))?,
            None => DEFAULT_CONFIDENCE_THRESHOLD,
        };
        if !(0.0..=1.0).contains(&confidence_threshold) {
            anyhow::bail!(
                "FOOD_CONFIDENCE_THRESHOLD must be between 0 and 1, got {}",
                confidence_threshold
            );
        }

        let top_k = match get("CLASSIFIER_TOP_K") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("CLASSIFIER_TOP_K is not a positive integer: {}", raw))?,
            None => DEFAULT_TOP_K,
        };
        if top_k == 0 {
            anyhow::bail!("CLASSIFIER_TOP_K must be at least 1");
        }

        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("MAX_UPLOAD_BYTES is not a positive integer: {}", raw))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let session_idle_minutes = match get("SESSION_IDLE_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("SESSION_IDLE_MINUTES is not a number: {}", raw))?,
            None => DEFAULT_SESSION_IDLE_MINUTES,
        };
        if session_idle_minutes <= 0 {
            anyhow::bail!("SESSION_IDLE_MINUTES must be positive, got {}", session_idle_minutes);
        }

        Ok(Self {
            groq_api_key: get("GROQ_API_KEY"),
            groq_api_url: or("GROQ_API_URL", DEFAULT_GROQ_API_URL),
            groq_model: or("GROQ_MODEL", DEFAULT_GROQ_MODEL),
            hf_api_token: get("HF_API_TOKEN"),
            hf_inference_url: or("HF_INFERENCE_URL", DEFAULT_HF_INFERENCE_URL),
            classifier_model: or("CLASSIFIER_MODEL", DEFAULT_CLASSIFIER_MODEL),
            caption_model: or("CAPTION_MODEL", DEFAULT_CAPTION_MODEL),
            confidence_threshold,
            top_k,
            bind_addr: or("BIND_ADDR", DEFAULT_BIND_ADDR),
            max_upload_bytes,
            session_idle_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert!(config.groq_api_key.is_none());
        assert_eq!(config.groq_model, "llama3-70b-8192");
        assert_eq!(config.confidence_threshold, 0.70);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.session_idle_minutes, 30);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("FOOD_CONFIDENCE_THRESHOLD", "0.55"),
            ("CLASSIFIER_TOP_K", "5"),
        ])
        .unwrap();

        assert_eq!(config.groq_api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.confidence_threshold, 0.55);
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = config_from(&[("GROQ_API_KEY", "   ")]).unwrap();
        assert!(config.groq_api_key.is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("FOOD_CONFIDENCE_THRESHOLD", "1.5")]).is_err());
        assert!(config_from(&[("FOOD_CONFIDENCE_THRESHOLD", "high")]).is_err());
        assert!(config_from(&[("CLASSIFIER_TOP_K", "0")]).is_err());
        assert!(config_from(&[("SESSION_IDLE_MINUTES", "0")]).is_err());
    }
}
