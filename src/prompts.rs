//! Prompt templates sent to the LLM. Pure text, no branching.

use crate::models::NON_FOOD;

pub const NAME_INFERENCE_MAX_TOKENS: u32 = 500;
pub const CALORIE_MAX_TOKENS: u32 = 500;
pub const HEALTH_MAX_TOKENS: u32 = 250;
pub const TIP_MAX_TOKENS: u32 = 150;

pub fn food_name_from_caption(caption: &str) -> String {
    format!(
        "The following image caption was generated: \"{}\"\n\n\
         Based on this caption, what is the most likely name of the food item?\n\
         Return only the food name. If the caption is not related to food, say \"{}\".",
        caption, NON_FOOD
    )
}

pub fn calorie_estimation(food_name: &str) -> String {
    format!(
        "Estimate the total calories in one serving of '{}'. \
         Break down the calorie content by major ingredients. \
         Provide the response in bullet points, without adding disclaimers.",
        food_name
    )
}

pub fn health_evaluation(food_name: &str) -> String {
    format!(
        "In under 100 words, evaluate whether '{}' is healthy or not. \
         Mention 2–3 nutrition highlights and any dietary precautions.",
        food_name
    )
}

pub fn health_tip(food_name: &str) -> String {
    format!(
        "Suggest a short, practical tip (1–2 sentences) to make '{}' healthier \
         without losing its core taste. Avoid generic advice.",
        food_name
    )
}
