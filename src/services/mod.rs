pub mod caption; // Caption generation (fallback path)
pub mod classifier; // Image classification + food keywords
pub mod llm; // Chat-completion client
pub mod name_inference;

#[cfg(test)]
pub mod fakes;

pub use caption::{CaptionModel, HuggingFaceCaptioner};
pub use classifier::{Classifier, HuggingFaceClassifier};
pub use llm::{Completer, GroqClient, LlmError};
pub use name_inference::NameInference;
