//! HTTP endpoint handlers. These are thin wrappers that forward to core logic or the store.
//! Each handler is instrumented and logs ids and basic result info, never payloads.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
  extract::{FromRequestParts, Path, State},
  http::{request::Parts, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::ViewerSettings;
use crate::error::{AiError, StoreError};
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

pub const SESSION_HEADER: &str = "x-session-id";

/// Error body for every failing endpoint: `{"error": "..."}` with a matching status.
#[derive(Debug)]
pub struct ApiError {
  status: StatusCode,
  message: String,
}

impl ApiError {
  pub fn bad_request(message: impl Into<String>) -> Self {
    Self { status: StatusCode::BAD_REQUEST, message: message.into() }
  }
}

impl From<AiError> for ApiError {
  fn from(e: AiError) -> Self {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
    Self { status, message: e.to_string() }
  }
}

impl From<StoreError> for ApiError {
  fn from(e: StoreError) -> Self {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Self { status, message: e.to_string() }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    if self.status.is_server_error() {
      warn!(target: "esl_backend", status = %self.status, error = %self.message, "Request failed");
    }
    (self.status, Json(ErrorOut { error: self.message })).into_response()
  }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Opaque client-generated session id from the `x-session-id` header.
pub struct SessionId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for SessionId
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .headers
      .get(SESSION_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(|s| SessionId(s.to_string()))
      .ok_or_else(|| ApiError::bad_request(format!("missing {SESSION_HEADER} header")))
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, ai: state.openai.is_some() })
}

// -------- AI-backed endpoints --------

#[instrument(level = "info", skip(state, body), fields(topic = %body.topic, cefr_level = %body.cefr_level))]
pub async fn http_generate_lesson(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateLessonIn>,
) -> ApiResult<LessonOut> {
  if body.topic.trim().is_empty() && body.remix_instruction.is_none() {
    return Err(ApiError::bad_request("topic is required"));
  }
  let (lesson, origin) = generate_lesson(&state, &body).await?;
  info!(target: "lesson", topic = %lesson.topic, slides = lesson.slides.len(), origin = origin.as_str(), "HTTP lesson served");
  Ok(Json(LessonOut { lesson }))
}

#[instrument(level = "info", skip(state, body), fields(title = %body.slide_title))]
pub async fn http_generate_image(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ImageRequest>,
) -> ApiResult<ImageOut> {
  let image_url = generate_image(&state, &body).await?;
  Ok(Json(ImageOut { image_url }))
}

#[instrument(level = "info", skip(state, body), fields(title = %body.slide_title))]
pub async fn http_validate_image(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ImageValidationIn>,
) -> Json<ImageValidationOut> {
  let validation = validate_image(&state, &body).await;
  Json(ImageValidationOut { validation })
}

#[instrument(level = "info", skip(state, body), fields(topic = %body.lesson.topic))]
pub async fn http_validate_quality(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QualityIn>,
) -> Json<QualityOut> {
  let validation = validate_quality(&state, &body).await;
  info!(target: "lesson", score = validation.quality_score, issues = validation.issues.len(), "HTTP quality review served");
  Json(QualityOut { validation })
}

// -------- saved lessons --------

#[instrument(level = "info", skip(state, session), fields(session = %session.0))]
pub async fn http_list_lessons(State(state): State<Arc<AppState>>, session: SessionId) -> impl IntoResponse {
  Json(state.store.list_lessons(&session.0).await)
}

#[instrument(level = "info", skip(state, session, body), fields(session = %session.0))]
pub async fn http_save_lesson(
  State(state): State<Arc<AppState>>,
  session: SessionId,
  Json(body): Json<SaveLessonIn>,
) -> Result<impl IntoResponse, ApiError> {
  let saved = state.store.save_lesson(&session.0, body.lesson).await?;
  Ok((StatusCode::CREATED, Json(saved)))
}

#[instrument(level = "info", skip(state, session), fields(session = %session.0))]
pub async fn http_get_lesson(
  State(state): State<Arc<AppState>>,
  session: SessionId,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(state.store.get_lesson(&session.0, id).await?))
}

#[instrument(level = "info", skip(state, session, body), fields(session = %session.0))]
pub async fn http_update_lesson(
  State(state): State<Arc<AppState>>,
  session: SessionId,
  Path(id): Path<Uuid>,
  Json(body): Json<SaveLessonIn>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(state.store.update_lesson(&session.0, id, body.lesson).await?))
}

#[instrument(level = "info", skip(state, session), fields(session = %session.0))]
pub async fn http_delete_lesson(
  State(state): State<Arc<AppState>>,
  session: SessionId,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.store.delete_lesson(&session.0, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// -------- templates --------

#[instrument(level = "info", skip(state, session), fields(session = %session.0))]
pub async fn http_list_templates(State(state): State<Arc<AppState>>, session: SessionId) -> impl IntoResponse {
  Json(state.store.list_templates(&session.0).await)
}

#[instrument(level = "info", skip(state, session, body), fields(session = %session.0, name = %body.name))]
pub async fn http_create_template(
  State(state): State<Arc<AppState>>,
  session: SessionId,
  Json(body): Json<TemplateIn>,
) -> Result<impl IntoResponse, ApiError> {
  let t = state.store.create_template(&session.0, &body.name, body.preferences).await?;
  Ok((StatusCode::CREATED, Json(t)))
}

#[instrument(level = "info", skip(state, session), fields(session = %session.0))]
pub async fn http_delete_template(
  State(state): State<Arc<AppState>>,
  session: SessionId,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.store.delete_template(&session.0, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// -------- ratings & settings --------

#[instrument(level = "info", skip(state, session, body), fields(session = %session.0, lesson_id = %body.lesson_id, rating = body.rating))]
pub async fn http_rate_lesson(
  State(state): State<Arc<AppState>>,
  session: SessionId,
  Json(body): Json<RatingIn>,
) -> Result<impl IntoResponse, ApiError> {
  let r = state.store.rate_lesson(&session.0, body.lesson_id, body.rating, body.feedback).await?;
  Ok((StatusCode::CREATED, Json(r)))
}

#[instrument(level = "info", skip(state, session), fields(session = %session.0))]
pub async fn http_get_settings(State(state): State<Arc<AppState>>, session: SessionId) -> Json<ViewerSettings> {
  Json(state.store.settings(&session.0).await)
}

#[instrument(level = "info", skip(state, session, settings), fields(session = %session.0))]
pub async fn http_put_settings(
  State(state): State<Arc<AppState>>,
  session: SessionId,
  Json(settings): Json<ViewerSettings>,
) -> Result<Json<ViewerSettings>, ApiError> {
  state.store.save_settings(&session.0, settings).await?;
  Ok(Json(settings))
}
