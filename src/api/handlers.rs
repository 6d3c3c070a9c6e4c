//! HTTP request handlers for participants

use super::admin;
use super::types::{
    ChatRequest, ChatResponse, ErrorResponse, LoginRequest, StoryDraftRequest, SubmitRequest,
};
use super::AppState;
use crate::export::ExportError;
use crate::relay::RelayError;
use crate::runtime::{ParticipantView, RuntimeError, SessionId};
use crate::state_machine::{Event, TransitionError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        // Phase events
        .route("/api/sessions/:id/login", post(login))
        .route("/api/sessions/:id/ready", post(ready))
        .route(
            "/api/sessions/:id/finish-brainstorming",
            post(finish_brainstorming),
        )
        .route("/api/sessions/:id/story", put(save_draft))
        .route("/api/sessions/:id/submit", post(submit_story))
        // AI partner
        .route("/api/sessions/:id/chat", post(send_chat))
        // Researcher console
        .merge(admin::routes())
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<ParticipantView>) {
    (StatusCode::CREATED, Json(state.runtime.create_session().await))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<ParticipantView>, AppError> {
    Ok(Json(state.runtime.view(id).await?))
}

// ============================================================
// Phase Events
// ============================================================

async fn login(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ParticipantView>, AppError> {
    dispatch(
        &state,
        id,
        Event::Login {
            participant_id: req.participant_id,
        },
    )
    .await
}

async fn ready(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<ParticipantView>, AppError> {
    dispatch(&state, id, Event::Ready).await
}

async fn finish_brainstorming(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<ParticipantView>, AppError> {
    dispatch(&state, id, Event::FinishBrainstorming).await
}

async fn save_draft(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(req): Json<StoryDraftRequest>,
) -> Result<Json<ParticipantView>, AppError> {
    dispatch(&state, id, Event::SaveDraft { text: req.text }).await
}

async fn submit_story(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<ParticipantView>, AppError> {
    dispatch(&state, id, Event::SubmitStory { story: req.story }).await
}

async fn dispatch(
    state: &AppState,
    id: SessionId,
    event: Event,
) -> Result<Json<ParticipantView>, AppError> {
    Ok(Json(state.runtime.dispatch(id, event).await?))
}

// ============================================================
// AI Partner
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let outcome = state.runtime.chat(id, req.text).await?;
    Ok(Json(ChatResponse {
        reply: outcome.reply,
        view: outcome.view,
    }))
}

async fn get_version() -> &'static str {
    concat!("cowrite-study ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

pub enum AppError {
    BadRequest(String),
    Unauthorized,
    NotFound(String),
    Conflict(String),
    Upstream(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(err: RuntimeError) -> Self {
        let message = err.to_string();
        match err {
            RuntimeError::SessionNotFound(_) => AppError::NotFound(message),
            RuntimeError::UnknownCondition(_)
            | RuntimeError::Transition(TransitionError::EmptyParticipantId)
            | RuntimeError::Relay(RelayError::EmptyMessage) => AppError::BadRequest(message),
            RuntimeError::Transition(TransitionError::InvalidTransition { .. })
            | RuntimeError::Relay(
                RelayError::PhaseClosed(_)
                | RelayError::NoCondition
                | RelayError::UnknownCondition(_),
            )
            | RuntimeError::Export(
                ExportError::MissingParticipant
                | ExportError::MissingCondition
                | ExportError::UnknownCondition(_),
            ) => AppError::Conflict(message),
            RuntimeError::Relay(RelayError::Upstream(_)) => AppError::Upstream(message),
            RuntimeError::Export(ExportError::Encode(_)) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("Researcher credential required"),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::new(msg)),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, ErrorResponse::retryable(msg)),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(msg))
            }
        };

        (status, Json(body)).into_response()
    }
}
