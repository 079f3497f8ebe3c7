use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use super::confirmation::ConfirmationGate;
use super::estimation::{display_text, EstimationService};
use super::identification::FoodIdentifier;
use crate::models::{EstimationReport, IdentificationResult, UploadedImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingUpload,
    Identifying,
    AwaitingConfirmation,
    Confirmed,
    AwaitingTip,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::AwaitingUpload => "awaiting_upload",
            SessionState::Identifying => "identifying",
            SessionState::AwaitingConfirmation => "awaiting_confirmation",
            SessionState::Confirmed => "confirmed",
            SessionState::AwaitingTip => "awaiting_tip",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug)]
pub enum SessionEvent {
    ImageUploaded(UploadedImage),
    DraftEdited(String),
    ConfirmPressed(String),
    TipRequested,
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::ImageUploaded(_) => "image_uploaded",
            SessionEvent::DraftEdited(_) => "draft_edited",
            SessionEvent::ConfirmPressed(_) => "confirm_pressed",
            SessionEvent::TipRequested => "tip_requested",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot handle {event} while {state}")]
    InvalidTransition {
        state: SessionState,
        event: &'static str,
    },
}

/// Everything one interactive session knows. Nothing outlives it.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    image: Option<UploadedImage>,
    identification: Option<IdentificationResult>,
    gate: ConfirmationGate,
    report: EstimationReport,
    notice: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::AwaitingUpload,
            image: None,
            identification: None,
            gate: ConfirmationGate::new(),
            report: EstimationReport::default(),
            notice: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    pub fn identification(&self) -> Option<&IdentificationResult> {
        self.identification.as_ref()
    }

    pub fn gate(&self) -> &ConfirmationGate {
        &self.gate
    }

    pub fn report(&self) -> &EstimationReport {
        &self.report
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Drop everything tied to the previous image and hold the new one.
    fn start_image(&mut self, image: UploadedImage) {
        self.identification = None;
        self.gate.reset();
        self.report = EstimationReport::default();
        self.notice = None;
        self.image = Some(image);
        self.transition(SessionState::Identifying);
    }

    fn transition(&mut self, next: SessionState) {
        log::debug!("🔄 Session {} -> {}", self.state, next);
        self.state = next;
    }
}

/// Drives a [`Session`] through its events, calling the pipeline and the
/// estimation layer as each transition requires.
pub struct SessionHandler {
    identifier: Arc<FoodIdentifier>,
    estimator: Arc<EstimationService>,
    threshold: f32,
}

impl SessionHandler {
    pub fn new(
        identifier: Arc<FoodIdentifier>,
        estimator: Arc<EstimationService>,
        threshold: f32,
    ) -> Self {
        Self {
            identifier,
            estimator,
            threshold,
        }
    }

    pub async fn handle(&self, session: &mut Session, event: SessionEvent) -> Result<(), SessionError> {
        log::info!("📨 Session event {} in state {}", event.name(), session.state);

        match event {
            SessionEvent::ImageUploaded(image) => {
                self.on_image(session, image).await;
                Ok(())
            }
            SessionEvent::DraftEdited(text) => {
                Self::require_image(session, "draft_edited")?;
                session.gate.edit(&text);
                Ok(())
            }
            SessionEvent::ConfirmPressed(text) => {
                Self::require_image(session, "confirm_pressed")?;
                self.on_confirm(session, &text).await;
                Ok(())
            }
            SessionEvent::TipRequested => self.on_tip(session).await,
        }
    }

    fn require_image(session: &Session, event: &'static str) -> Result<(), SessionError> {
        match session.state {
            SessionState::AwaitingConfirmation | SessionState::Confirmed => Ok(()),
            state => Err(SessionError::InvalidTransition { state, event }),
        }
    }

    async fn on_image(&self, session: &mut Session, image: UploadedImage) {
        if session.image.as_ref().map(|i| &i.signature) == Some(&image.signature) {
            log::debug!("♻️ Same upload {} again, keeping identification", image.signature);
            return;
        }

        log::info!("📸 New upload {}, resetting session", image.signature);
        session.start_image(image);

        let result = match &session.image {
            Some(image) => self.identifier.identify(image, self.threshold).await,
            None => return,
        };

        match result {
            Ok(identification) => {
                log::info!(
                    "🍽️ Proposed name: {} (via {})",
                    identification.name,
                    identification.source
                );
                if identification.is_non_food() {
                    session.notice = Some(
                        "🤔 This doesn't look like food. Edit the name if it is.".to_string(),
                    );
                }
                session.gate.prefill(&identification.name);
                session.identification = Some(identification);
            }
            Err(e) => {
                log::error!("❌ Identification failed: {}", e);
                session.gate.prefill("");
                session.notice = Some(format!(
                    "❌ {}. Please type the food name yourself.",
                    e
                ));
            }
        }
        session.transition(SessionState::AwaitingConfirmation);
    }

    async fn on_confirm(&self, session: &mut Session, text: &str) {
        let name = match session.gate.confirm(text) {
            Some(name) => name,
            None => {
                session.notice = Some("⚠️ Please enter a food name before confirming.".to_string());
                return;
            }
        };

        session.notice = None;
        session.transition(SessionState::Confirmed);

        let calories = display_text(self.estimator.calories(&name).await);
        let health = display_text(self.estimator.health(&name).await);
        session.report = EstimationReport {
            calories: Some(calories),
            health: Some(health),
            tip: None,
        };
    }

    async fn on_tip(&self, session: &mut Session) -> Result<(), SessionError> {
        let name = match (session.state, session.gate.confirmed()) {
            (SessionState::Confirmed, Some(name)) => name.clone(),
            (state, _) => {
                return Err(SessionError::InvalidTransition {
                    state,
                    event: "tip_requested",
                })
            }
        };

        session.transition(SessionState::AwaitingTip);
        let tip = display_text(self.estimator.tip(&name).await);
        session.report.tip = Some(tip);
        session.transition(SessionState::Confirmed);
        Ok(())
    }
}
