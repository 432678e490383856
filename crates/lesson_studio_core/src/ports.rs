//! crates/lesson_studio_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete database, draft storage, and object storage.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AdminAccount, AdminCredentials, LessonContent, LessonForm, LessonQuiz, QuizForm, Topic,
};
use crate::media::MediaKind;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, disk).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Admin Accounts ---
    async fn create_admin(&self, email: &str, hashed_password: &str) -> PortResult<AdminAccount>;

    async fn get_admin_by_email(&self, email: &str) -> PortResult<AdminCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        admin_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the admin owning a live (unexpired) session.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Topics ---
    async fn list_topics(&self) -> PortResult<Vec<Topic>>;

    async fn get_topic(&self, topic_id: Uuid) -> PortResult<Topic>;

    async fn create_topic(&self, name: &str, description: Option<&str>) -> PortResult<Topic>;

    async fn update_topic(
        &self,
        topic_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<Topic>;

    /// Deleting a topic removes its lessons and their quizzes.
    async fn delete_topic(&self, topic_id: Uuid) -> PortResult<()>;

    // --- Lesson Content ---
    async fn list_lessons(&self, topic_id: Uuid) -> PortResult<Vec<LessonContent>>;

    async fn get_lesson(&self, topic_id: Uuid, lesson_id: Uuid) -> PortResult<LessonContent>;

    async fn create_lesson(&self, topic_id: Uuid, form: &LessonForm) -> PortResult<LessonContent>;

    /// Inserts the lesson under the given id, or replaces its content.
    async fn upsert_lesson(
        &self,
        topic_id: Uuid,
        lesson_id: Uuid,
        form: &LessonForm,
    ) -> PortResult<LessonContent>;

    // --- Lesson Quizzes ---
    async fn get_quiz(&self, lesson_id: Uuid) -> PortResult<LessonQuiz>;

    /// Fails with `Conflict` when the lesson already has a quiz.
    async fn create_quiz(&self, lesson_id: Uuid, form: &QuizForm) -> PortResult<LessonQuiz>;

    /// Fails with `NotFound` when the lesson has no quiz yet.
    async fn update_quiz(&self, lesson_id: Uuid, form: &QuizForm) -> PortResult<LessonQuiz>;

    async fn upsert_quiz(&self, lesson_id: Uuid, form: &QuizForm) -> PortResult<LessonQuiz>;
}

/// A durable key-value slot holding serialized drafts.
#[async_trait]
pub trait DraftSlot: Send + Sync {
    async fn read(&self, key: &str) -> PortResult<Option<String>>;

    /// Replaces whatever is stored under `key`.
    async fn write(&self, key: &str, payload: &str) -> PortResult<()>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> PortResult<()>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores an object and returns its public URL.
    async fn put_object(
        &self,
        kind: MediaKind,
        object_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> PortResult<String>;
}
