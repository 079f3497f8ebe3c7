use crate::models::ConfirmedFoodName;

/// Editable food name plus the value a human last confirmed.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationGate {
    proposed: Option<String>,
    draft: String,
    confirmed: Option<ConfirmedFoodName>,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-fill the edit field. Only the first proposal for an image counts;
    /// later calls keep whatever the human has typed.
    pub fn prefill(&mut self, proposed: &str) {
        if self.proposed.is_some() {
            return;
        }
        self.proposed = Some(proposed.to_string());
        self.draft = proposed.to_string();
    }

    pub fn edit(&mut self, text: &str) {
        self.draft = text.to_string();
    }

    /// Confirm `text`. Blank text leaves the previous confirmed value alone and
    /// returns `None` (still pending).
    pub fn confirm(&mut self, text: &str) -> Option<ConfirmedFoodName> {
        self.draft = text.to_string();
        let name = ConfirmedFoodName::parse(text)?;
        log::info!("✅ Food name confirmed: {}", name);
        self.confirmed = Some(name.clone());
        Some(name)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn proposed(&self) -> Option<&str> {
        self.proposed.as_deref()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn confirmed(&self) -> Option<&ConfirmedFoodName> {
        self.confirmed.as_ref()
    }
}
