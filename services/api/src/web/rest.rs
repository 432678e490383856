//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the topic, lesson and quiz REST endpoints and
//! the master definition for the OpenAPI specification.
//!
//! Every lesson write realigns each section's timing array with its text and
//! then validates the whole payload. Nothing is stored while any issue remains.

use crate::error::{http_error, port_error, validation_error, ErrorBody, HttpError};
use crate::web::{auth, state::AppState, uploads};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use lesson_studio_core::validation::{validate_lesson, validate_quiz};
use lesson_studio_core::{LessonContent, LessonForm, LessonQuiz, QuizForm, Topic};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        list_topics_handler,
        create_topic_handler,
        get_topic_handler,
        update_topic_handler,
        delete_topic_handler,
        list_lessons_handler,
        create_lesson_handler,
        get_lesson_handler,
        upsert_lesson_handler,
        create_quiz_handler,
        get_quiz_handler,
        update_quiz_handler,
        uploads::upload_handler,
    ),
    components(
        schemas(
            TopicRequest,
            TopicResponse,
            ErrorBody,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            uploads::UploadResponse,
        )
    ),
    tags(
        (name = "Lesson Studio API", description = "Admin endpoints for authoring lessons, section timings and quizzes.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopicRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopicResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Topic> for TopicResponse {
    fn from(topic: Topic) -> Self {
        Self {
            id: topic.id,
            name: topic.name,
            description: topic.description,
            created_at: topic.created_at,
        }
    }
}

impl TopicRequest {
    /// Trimmed name and description; a blank description is dropped.
    fn cleaned(&self) -> Result<(&str, Option<&str>), HttpError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(http_error(
                StatusCode::BAD_REQUEST,
                "bad_request",
                "Topic name is required",
            ));
        }
        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        Ok((name, description))
    }
}

/// Realigns timings, then validates. Returns the form ready to store.
pub fn prepare_lesson(mut form: LessonForm) -> Result<LessonForm, HttpError> {
    form.resync_all();
    validate_lesson(&form.text, &form.sections).map_err(validation_error)?;
    Ok(form)
}

pub fn prepare_quiz(form: QuizForm) -> Result<QuizForm, HttpError> {
    validate_quiz(&form.questions).map_err(validation_error)?;
    Ok(form)
}

//=========================================================================================
// Topic Handlers
//=========================================================================================

/// List all topics, oldest first.
#[utoipa::path(
    get,
    path = "/topics",
    responses(
        (status = 200, description = "All topics", body = [TopicResponse]),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_topics_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<TopicResponse>>, HttpError> {
    let topics = app_state
        .db
        .list_topics()
        .await
        .map_err(|e| port_error("Failed to list topics", e))?;
    Ok(Json(topics.into_iter().map(TopicResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/topics",
    request_body = TopicRequest,
    responses(
        (status = 201, description = "Topic created", body = TopicResponse),
        (status = 400, description = "Missing name", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn create_topic_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<TopicRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let (name, description) = req.cleaned()?;
    let topic = app_state
        .db
        .create_topic(name, description)
        .await
        .map_err(|e| port_error("Failed to create topic", e))?;
    info!("Created topic {}", topic.id);
    Ok((StatusCode::CREATED, Json(TopicResponse::from(topic))))
}

#[utoipa::path(
    get,
    path = "/topics/{topic_id}",
    params(("topic_id" = Uuid, Path, description = "The topic id.")),
    responses(
        (status = 200, description = "The topic", body = TopicResponse),
        (status = 404, description = "No such topic", body = ErrorBody)
    )
)]
pub async fn get_topic_handler(
    State(app_state): State<Arc<AppState>>,
    Path(topic_id): Path<Uuid>,
) -> Result<Json<TopicResponse>, HttpError> {
    let topic = app_state
        .db
        .get_topic(topic_id)
        .await
        .map_err(|e| port_error("Failed to load topic", e))?;
    Ok(Json(topic.into()))
}

#[utoipa::path(
    put,
    path = "/topics/{topic_id}",
    params(("topic_id" = Uuid, Path, description = "The topic id.")),
    request_body = TopicRequest,
    responses(
        (status = 200, description = "Topic updated", body = TopicResponse),
        (status = 400, description = "Missing name", body = ErrorBody),
        (status = 404, description = "No such topic", body = ErrorBody)
    )
)]
pub async fn update_topic_handler(
    State(app_state): State<Arc<AppState>>,
    Path(topic_id): Path<Uuid>,
    Json(req): Json<TopicRequest>,
) -> Result<Json<TopicResponse>, HttpError> {
    let (name, description) = req.cleaned()?;
    let topic = app_state
        .db
        .update_topic(topic_id, name, description)
        .await
        .map_err(|e| port_error("Failed to update topic", e))?;
    Ok(Json(topic.into()))
}

/// Delete a topic together with its lessons and quizzes.
#[utoipa::path(
    delete,
    path = "/topics/{topic_id}",
    params(("topic_id" = Uuid, Path, description = "The topic id.")),
    responses(
        (status = 204, description = "Topic deleted"),
        (status = 404, description = "No such topic", body = ErrorBody)
    )
)]
pub async fn delete_topic_handler(
    State(app_state): State<Arc<AppState>>,
    Path(topic_id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    app_state
        .db
        .delete_topic(topic_id)
        .await
        .map_err(|e| port_error("Failed to delete topic", e))?;
    info!("Deleted topic {}", topic_id);
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Lesson Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/topics/{topic_id}/lessons",
    params(("topic_id" = Uuid, Path, description = "The topic id.")),
    responses(
        (status = 200, description = "Lessons of the topic"),
        (status = 404, description = "No such topic", body = ErrorBody)
    )
)]
pub async fn list_lessons_handler(
    State(app_state): State<Arc<AppState>>,
    Path(topic_id): Path<Uuid>,
) -> Result<Json<Vec<LessonContent>>, HttpError> {
    app_state
        .db
        .get_topic(topic_id)
        .await
        .map_err(|e| port_error("Failed to load topic", e))?;
    let lessons = app_state
        .db
        .list_lessons(topic_id)
        .await
        .map_err(|e| port_error("Failed to list lessons", e))?;
    Ok(Json(lessons))
}

/// Create lesson content under a topic.
///
/// The body mirrors the editor form: `text` (the title), `subHeading` (the
/// sections), and optional lesson-level `audio` and `video` URLs.
#[utoipa::path(
    post,
    path = "/topics/{topic_id}/lessons",
    params(("topic_id" = Uuid, Path, description = "The topic id.")),
    request_body(content_type = "application/json", description = "The lesson form."),
    responses(
        (status = 201, description = "Lesson created"),
        (status = 404, description = "No such topic", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ErrorBody)
    )
)]
pub async fn create_lesson_handler(
    State(app_state): State<Arc<AppState>>,
    Path(topic_id): Path<Uuid>,
    Json(form): Json<LessonForm>,
) -> Result<impl IntoResponse, HttpError> {
    let form = prepare_lesson(form)?;
    let lesson = app_state
        .db
        .create_lesson(topic_id, &form)
        .await
        .map_err(|e| port_error("Failed to create lesson", e))?;
    info!("Created lesson {} in topic {}", lesson.id, topic_id);
    Ok((StatusCode::CREATED, Json(lesson)))
}

#[utoipa::path(
    get,
    path = "/topics/{topic_id}/lessons/{lesson_id}",
    params(
        ("topic_id" = Uuid, Path, description = "The topic id."),
        ("lesson_id" = Uuid, Path, description = "The lesson id.")
    ),
    responses(
        (status = 200, description = "The lesson content"),
        (status = 404, description = "No such lesson", body = ErrorBody)
    )
)]
pub async fn get_lesson_handler(
    State(app_state): State<Arc<AppState>>,
    Path((topic_id, lesson_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<LessonContent>, HttpError> {
    let lesson = app_state
        .db
        .get_lesson(topic_id, lesson_id)
        .await
        .map_err(|e| port_error("Failed to load lesson", e))?;
    Ok(Json(lesson))
}

/// Create or replace the content stored under a lesson id.
#[utoipa::path(
    put,
    path = "/topics/{topic_id}/lessons/{lesson_id}",
    params(
        ("topic_id" = Uuid, Path, description = "The topic id."),
        ("lesson_id" = Uuid, Path, description = "The lesson id.")
    ),
    request_body(content_type = "application/json", description = "The lesson form."),
    responses(
        (status = 200, description = "Lesson stored"),
        (status = 404, description = "No such topic", body = ErrorBody),
        (status = 409, description = "The lesson belongs to another topic", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ErrorBody)
    )
)]
pub async fn upsert_lesson_handler(
    State(app_state): State<Arc<AppState>>,
    Path((topic_id, lesson_id)): Path<(Uuid, Uuid)>,
    Json(form): Json<LessonForm>,
) -> Result<Json<LessonContent>, HttpError> {
    let form = prepare_lesson(form)?;
    let lesson = app_state
        .db
        .upsert_lesson(topic_id, lesson_id, &form)
        .await
        .map_err(|e| port_error("Failed to store lesson", e))?;
    Ok(Json(lesson))
}

//=========================================================================================
// Quiz Handlers
//=========================================================================================

#[utoipa::path(
    post,
    path = "/lessons/{lesson_id}/quiz",
    params(("lesson_id" = Uuid, Path, description = "The lesson id.")),
    request_body(content_type = "application/json", description = "The quiz form: `questions`."),
    responses(
        (status = 201, description = "Quiz created"),
        (status = 404, description = "No such lesson", body = ErrorBody),
        (status = 409, description = "The lesson already has a quiz", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ErrorBody)
    )
)]
pub async fn create_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(lesson_id): Path<Uuid>,
    Json(form): Json<QuizForm>,
) -> Result<impl IntoResponse, HttpError> {
    let form = prepare_quiz(form)?;
    let quiz = app_state
        .db
        .create_quiz(lesson_id, &form)
        .await
        .map_err(|e| port_error("Failed to create quiz", e))?;
    info!("Created quiz for lesson {}", lesson_id);
    Ok((StatusCode::CREATED, Json(quiz)))
}

#[utoipa::path(
    get,
    path = "/lessons/{lesson_id}/quiz",
    params(("lesson_id" = Uuid, Path, description = "The lesson id.")),
    responses(
        (status = 200, description = "The lesson's quiz"),
        (status = 404, description = "The lesson has no quiz", body = ErrorBody)
    )
)]
pub async fn get_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(lesson_id): Path<Uuid>,
) -> Result<Json<LessonQuiz>, HttpError> {
    let quiz = app_state
        .db
        .get_quiz(lesson_id)
        .await
        .map_err(|e| port_error("Failed to load quiz", e))?;
    Ok(Json(quiz))
}

#[utoipa::path(
    put,
    path = "/lessons/{lesson_id}/quiz",
    params(("lesson_id" = Uuid, Path, description = "The lesson id.")),
    request_body(content_type = "application/json", description = "The quiz form: `questions`."),
    responses(
        (status = 200, description = "Quiz updated"),
        (status = 404, description = "The lesson has no quiz", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ErrorBody)
    )
)]
pub async fn update_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(lesson_id): Path<Uuid>,
    Json(form): Json<QuizForm>,
) -> Result<Json<LessonQuiz>, HttpError> {
    let form = prepare_quiz(form)?;
    let quiz = app_state
        .db
        .update_quiz(lesson_id, &form)
        .await
        .map_err(|e| port_error("Failed to update quiz", e))?;
    Ok(Json(quiz))
}
