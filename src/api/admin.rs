//! Researcher console routes
//!
//! Every handler takes an [`AdminGrant`], so none of them runs without a
//! verified bearer credential.

use super::handlers::AppError;
use super::types::{
    ConditionOverrideRequest, ExportQuery, PhaseOverrideRequest, SessionListResponse,
};
use super::AppState;
use crate::auth::AdminGrant;
use crate::runtime::{SessionId, SessionStatus};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header, request::Parts, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/sessions", get(list_sessions))
        .route("/api/admin/sessions/:id", get(session_status))
        .route("/api/admin/sessions/:id/phase", post(override_phase))
        .route("/api/admin/sessions/:id/condition", post(override_condition))
        .route("/api/admin/sessions/:id/export", get(export_log))
        .route("/api/admin/sessions/:id/reset", post(reset_session))
}

#[async_trait]
impl FromRequestParts<AppState> for AdminGrant {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized)?;

        state.admin.verify(bearer.token()).ok_or_else(|| {
            tracing::warn!(path = %parts.uri.path(), "Rejected researcher credential");
            AppError::Unauthorized
        })
    }
}

async fn list_sessions(
    State(state): State<AppState>,
    grant: AdminGrant,
) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.runtime.list(grant).await,
    })
}

async fn session_status(
    State(state): State<AppState>,
    grant: AdminGrant,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionStatus>, AppError> {
    Ok(Json(state.runtime.status(id, grant).await?))
}

async fn override_phase(
    State(state): State<AppState>,
    grant: AdminGrant,
    Path(id): Path<SessionId>,
    Json(req): Json<PhaseOverrideRequest>,
) -> Result<Json<SessionStatus>, AppError> {
    Ok(Json(state.runtime.override_phase(id, req.phase, grant).await?))
}

async fn override_condition(
    State(state): State<AppState>,
    grant: AdminGrant,
    Path(id): Path<SessionId>,
    Json(req): Json<ConditionOverrideRequest>,
) -> Result<Json<SessionStatus>, AppError> {
    Ok(Json(
        state
            .runtime
            .override_condition(id, req.condition, grant)
            .await?,
    ))
}

async fn export_log(
    State(state): State<AppState>,
    grant: AdminGrant,
    Path(id): Path<SessionId>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let artifact = state.runtime.export(id, query.format, grant).await?;
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        artifact.filename
    ))
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(artifact.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}

async fn reset_session(
    State(state): State<AppState>,
    grant: AdminGrant,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionStatus>, AppError> {
    Ok(Json(state.runtime.reset(id, grant).await?))
}
