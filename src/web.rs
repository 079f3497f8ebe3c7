use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::handlers::{Session, SessionState};
use crate::models::{EstimationReport, IdentificationResult, UploadedImage};

/// Image upload: original file name plus base64 file bytes.
#[derive(Debug, Deserialize, Serialize)]
pub struct UploadRequest {
    pub file_name: String,
    pub data: String,
}

impl UploadRequest {
    pub fn decode(&self) -> Result<UploadedImage> {
        let bytes = general_purpose::STANDARD
            .decode(self.data.trim())
            .context("image data is not valid base64")?;
        log::debug!("📊 Upload {} is {} bytes", self.file_name, bytes.len());

        UploadedImage::decode(&self.file_name, &bytes)
            .with_context(|| format!("could not decode {} as an image", self.file_name))
    }
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub food_name: String,
}

#[derive(Debug, Serialize)]
pub struct ImageView {
    pub file_name: String,
    pub size: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// Everything a client needs to render the current session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub state: SessionState,
    pub image: Option<ImageView>,
    pub identification: Option<IdentificationResult>,
    pub proposed_name: Option<String>,
    pub draft: String,
    pub confirmed_name: Option<String>,
    pub estimates: EstimationReport,
    pub notice: Option<String>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        let gate = session.gate();
        Self {
            state: session.state(),
            image: session.image().map(|image| ImageView {
                file_name: image.signature.file_name.clone(),
                size: image.signature.size,
                uploaded_at: image.uploaded_at,
            }),
            identification: session.identification().cloned(),
            proposed_name: gate.proposed().map(str::to_string),
            draft: gate.draft().to_string(),
            confirmed_name: gate.confirmed().map(|n| n.as_str().to_string()),
            estimates: session.report().clone(),
            notice: session.notice().map(str::to_string),
        }
    }
}

pub mod server {
    use super::*;
    use axum::{
        extract::{DefaultBodyLimit, Path, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{get, post, put},
        Json, Router,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tower_http::limit::RequestBodyLimitLayer;

    use crate::handlers::{SessionError, SessionEvent, SessionHandler};

    struct SessionEntry {
        session: Arc<tokio::sync::Mutex<Session>>,
        last_touched: DateTime<Utc>,
    }

    pub struct AppState {
        pub handler: Arc<SessionHandler>,
        idle_timeout: chrono::Duration,
        sessions: Mutex<HashMap<String, SessionEntry>>,
    }

    impl AppState {
        pub fn new(handler: Arc<SessionHandler>, idle_timeout: chrono::Duration) -> Self {
            Self {
                handler,
                idle_timeout,
                sessions: Mutex::new(HashMap::new()),
            }
        }

        fn table(&self) -> Result<MutexGuard<'_, HashMap<String, SessionEntry>>, ApiError> {
            self.sessions
                .lock()
                .map_err(|_| ApiError::Internal("session table poisoned".to_string()))
        }

        /// Existing session for `id`. Unknown ids are never created here.
        fn existing(&self, id: &str) -> Result<Arc<tokio::sync::Mutex<Session>>, ApiError> {
            let now = Utc::now();
            let mut sessions = self.table()?;
            Self::evict_idle(&mut sessions, self.idle_timeout, now);

            match sessions.get_mut(id) {
                Some(entry) => {
                    entry.last_touched = now;
                    Ok(entry.session.clone())
                }
                None => Err(ApiError::NotFound(format!("Unknown session: {}", id))),
            }
        }

        /// Session for `id`, created if needed. Only uploads start sessions.
        fn existing_or_new(&self, id: &str) -> Result<Arc<tokio::sync::Mutex<Session>>, ApiError> {
            let now = Utc::now();
            let mut sessions = self.table()?;
            Self::evict_idle(&mut sessions, self.idle_timeout, now);
            let sessions_open = sessions.len();

            let entry = sessions.entry(id.to_string()).or_insert_with(|| {
                log::info!("🆕 New session: {} ({} already open)", id, sessions_open);
                SessionEntry {
                    session: Arc::new(tokio::sync::Mutex::new(Session::new())),
                    last_touched: now,
                }
            });
            entry.last_touched = now;
            Ok(entry.session.clone())
        }

        fn evict_idle(
            sessions: &mut HashMap<String, SessionEntry>,
            idle_timeout: chrono::Duration,
            now: DateTime<Utc>,
        ) {
            sessions.retain(|id, entry| {
                let keep = now - entry.last_touched <= idle_timeout;
                if !keep {
                    log::info!("🧹 Dropping idle session: {}", id);
                }
                keep
            });
        }

        #[cfg(test)]
        pub fn session_count(&self) -> usize {
            self.sessions.lock().map(|s| s.len()).unwrap_or(0)
        }
    }

    pub enum ApiError {
        BadRequest(String),
        NotFound(String),
        Conflict(String),
        Internal(String),
    }

    impl From<SessionError> for ApiError {
        fn from(err: SessionError) -> Self {
            ApiError::Conflict(err.to_string())
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            let (status, message) = match self {
                ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
                ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
                ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
                ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
            };
            log::warn!("⚠️ Request failed ({}): {}", status, message);
            (status, Json(serde_json::json!({ "error": message }))).into_response()
        }
    }

    pub fn create_router(
        handler: Arc<SessionHandler>,
        max_upload_bytes: usize,
        idle_timeout: chrono::Duration,
    ) -> Router {
        router_with_state(Arc::new(AppState::new(handler, idle_timeout)), max_upload_bytes)
    }

    pub fn router_with_state(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_check))
            .route("/sessions/:id", get(get_session))
            .route("/sessions/:id/image", post(upload_image))
            .route("/sessions/:id/draft", put(edit_draft))
            .route("/sessions/:id/confirm", post(confirm_name))
            .route("/sessions/:id/tip", post(request_tip))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(max_upload_bytes))
            .with_state(state)
    }

    async fn dispatch(
        state: &AppState,
        id: &str,
        event: SessionEvent,
    ) -> Result<Json<SessionView>, ApiError> {
        let session = match &event {
            SessionEvent::ImageUploaded(_) => state.existing_or_new(id)?,
            _ => state.existing(id)?,
        };
        let mut session = session.lock().await;
        state.handler.handle(&mut session, event).await?;
        Ok(Json(SessionView::from(&*session)))
    }

    async fn get_session(
        Path(id): Path<String>,
        State(state): State<Arc<AppState>>,
    ) -> Result<Json<SessionView>, ApiError> {
        let session = state.existing(&id)?;
        let session = session.lock().await;
        Ok(Json(SessionView::from(&*session)))
    }

    async fn upload_image(
        Path(id): Path<String>,
        State(state): State<Arc<AppState>>,
        Json(request): Json<UploadRequest>,
    ) -> Result<Json<SessionView>, ApiError> {
        log::info!("📤 Upload {} for session {}", request.file_name, id);
        let image = request
            .decode()
            .map_err(|e| ApiError::BadRequest(format!("{:#}", e)))?;
        dispatch(&state, &id, SessionEvent::ImageUploaded(image)).await
    }

    async fn edit_draft(
        Path(id): Path<String>,
        State(state): State<Arc<AppState>>,
        Json(request): Json<DraftRequest>,
    ) -> Result<Json<SessionView>, ApiError> {
        dispatch(&state, &id, SessionEvent::DraftEdited(request.text)).await
    }

    async fn confirm_name(
        Path(id): Path<String>,
        State(state): State<Arc<AppState>>,
        Json(request): Json<ConfirmRequest>,
    ) -> Result<Json<SessionView>, ApiError> {
        dispatch(&state, &id, SessionEvent::ConfirmPressed(request.food_name)).await
    }

    async fn request_tip(
        Path(id): Path<String>,
        State(state): State<Arc<AppState>>,
    ) -> Result<Json<SessionView>, ApiError> {
        dispatch(&state, &id, SessionEvent::TipRequested).await
    }

    async fn root_handler() -> &'static str {
        "Food Calorie Estimator - upload a photo to /sessions/{id}/image"
    }

    async fn health_check() -> &'static str {
        "OK"
    }
}
