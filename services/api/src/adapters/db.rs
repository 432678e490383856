//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` and `DraftSlot` ports from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lesson_studio_core::domain::{
    AdminAccount, AdminCredentials, LessonContent, LessonForm, LessonQuiz, QuizForm, QuizQuestion,
    Section, Topic,
};
use lesson_studio_core::ports::{DatabaseService, DraftSlot, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` and `DraftSlot` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Translates constraint failures into the port's vocabulary.
fn map_db_err(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    match &e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => PortError::NotFound(what()),
        sqlx::Error::Database(db) if db.is_unique_violation() => PortError::Conflict(what()),
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AdminRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct TopicRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}
impl TopicRecord {
    fn to_domain(self) -> Topic {
        Topic {
            id: self.id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct LessonRecord {
    id: Uuid,
    topic_id: Uuid,
    title: String,
    sections: Json<Vec<Section>>,
    audio: Option<String>,
    video: Option<String>,
    updated_at: DateTime<Utc>,
}
impl LessonRecord {
    fn to_domain(self) -> LessonContent {
        LessonContent {
            id: self.id,
            topic_id: self.topic_id,
            text: self.title,
            sections: self.sections.0,
            audio: self.audio,
            video: self.video,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct QuizRecord {
    lesson_id: Uuid,
    questions: Json<Vec<QuizQuestion>>,
    updated_at: DateTime<Utc>,
}
impl QuizRecord {
    fn to_domain(self) -> LessonQuiz {
        LessonQuiz {
            lesson_id: self.lesson_id,
            questions: self.questions.0,
            updated_at: self.updated_at,
        }
    }
}

const LESSON_COLUMNS: &str = "id, topic_id, title, sections, audio, video, updated_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_admin(&self, email: &str, hashed_password: &str) -> PortResult<AdminAccount> {
        let record = sqlx::query_as::<_, AdminRecord>(
            "INSERT INTO admins (id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING id, email, hashed_password",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err(e, || format!("Admin {} already exists", email)))?;

        Ok(AdminAccount {
            id: record.id,
            email: record.email,
        })
    }

    async fn get_admin_by_email(&self, email: &str) -> PortResult<AdminCredentials> {
        let record = sqlx::query_as::<_, AdminRecord>(
            "SELECT id, email, hashed_password FROM admins WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err(e, || format!("Admin {} not found", email)))?;

        Ok(AdminCredentials {
            id: record.id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        admin_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, admin_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(admin_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let admin_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT admin_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        admin_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_topics(&self) -> PortResult<Vec<Topic>> {
        let records = sqlx::query_as::<_, TopicRecord>(
            "SELECT id, name, description, created_at FROM topics ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_topic(&self, topic_id: Uuid) -> PortResult<Topic> {
        let record = sqlx::query_as::<_, TopicRecord>(
            "SELECT id, name, description, created_at FROM topics WHERE id = $1",
        )
        .bind(topic_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err(e, || format!("Topic {} not found", topic_id)))?;
        Ok(record.to_domain())
    }

    async fn create_topic(&self, name: &str, description: Option<&str>) -> PortResult<Topic> {
        let record = sqlx::query_as::<_, TopicRecord>(
            "INSERT INTO topics (id, name, description) VALUES ($1, $2, $3) \
             RETURNING id, name, description, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_topic(
        &self,
        topic_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<Topic> {
        let record = sqlx::query_as::<_, TopicRecord>(
            "UPDATE topics SET name = $2, description = $3 WHERE id = $1 \
             RETURNING id, name, description, created_at",
        )
        .bind(topic_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err(e, || format!("Topic {} not found", topic_id)))?;
        Ok(record.to_domain())
    }

    async fn delete_topic(&self, topic_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM topics WHERE id = $1")
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Topic {} not found", topic_id)));
        }
        Ok(())
    }

    async fn list_lessons(&self, topic_id: Uuid) -> PortResult<Vec<LessonContent>> {
        let records = sqlx::query_as::<_, LessonRecord>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE topic_id = $1 ORDER BY created_at ASC"
        ))
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_lesson(&self, topic_id: Uuid, lesson_id: Uuid) -> PortResult<LessonContent> {
        let record = sqlx::query_as::<_, LessonRecord>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1 AND topic_id = $2"
        ))
        .bind(lesson_id)
        .bind(topic_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err(e, || format!("Lesson {} not found", lesson_id)))?;
        Ok(record.to_domain())
    }

    async fn create_lesson(&self, topic_id: Uuid, form: &LessonForm) -> PortResult<LessonContent> {
        let record = sqlx::query_as::<_, LessonRecord>(&format!(
            "INSERT INTO lessons (id, topic_id, title, sections, audio, video) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {LESSON_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(topic_id)
        .bind(&form.text)
        .bind(Json(&form.sections))
        .bind(&form.audio)
        .bind(&form.video)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err(e, || format!("Topic {} not found", topic_id)))?;
        Ok(record.to_domain())
    }

    async fn upsert_lesson(
        &self,
        topic_id: Uuid,
        lesson_id: Uuid,
        form: &LessonForm,
    ) -> PortResult<LessonContent> {
        // The WHERE clause keeps a lesson from being moved between topics.
        let record = sqlx::query_as::<_, LessonRecord>(&format!(
            "INSERT INTO lessons (id, topic_id, title, sections, audio, video) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title, sections = EXCLUDED.sections, \
             audio = EXCLUDED.audio, video = EXCLUDED.video, updated_at = now() \
             WHERE lessons.topic_id = EXCLUDED.topic_id \
             RETURNING {LESSON_COLUMNS}"
        ))
        .bind(lesson_id)
        .bind(topic_id)
        .bind(&form.text)
        .bind(Json(&form.sections))
        .bind(&form.audio)
        .bind(&form.video)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_err(e, || format!("Topic {} not found", topic_id)))?;

        record.map(LessonRecord::to_domain).ok_or_else(|| {
            PortError::Conflict(format!(
                "Lesson {} belongs to a different topic",
                lesson_id
            ))
        })
    }

    async fn get_quiz(&self, lesson_id: Uuid) -> PortResult<LessonQuiz> {
        let record = sqlx::query_as::<_, QuizRecord>(
            "SELECT lesson_id, questions, updated_at FROM lesson_quizzes WHERE lesson_id = $1",
        )
        .bind(lesson_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err(e, || format!("Quiz for lesson {} not found", lesson_id)))?;
        Ok(record.to_domain())
    }

    async fn create_quiz(&self, lesson_id: Uuid, form: &QuizForm) -> PortResult<LessonQuiz> {
        let record = sqlx::query_as::<_, QuizRecord>(
            "INSERT INTO lesson_quizzes (lesson_id, questions) VALUES ($1, $2) \
             RETURNING lesson_id, questions, updated_at",
        )
        .bind(lesson_id)
        .bind(Json(&form.questions))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let exists = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
            if exists {
                PortError::Conflict(format!("Lesson {} already has a quiz", lesson_id))
            } else {
                map_db_err(e, || format!("Lesson {} not found", lesson_id))
            }
        })?;
        Ok(record.to_domain())
    }

    async fn update_quiz(&self, lesson_id: Uuid, form: &QuizForm) -> PortResult<LessonQuiz> {
        let record = sqlx::query_as::<_, QuizRecord>(
            "UPDATE lesson_quizzes SET questions = $2, updated_at = now() WHERE lesson_id = $1 \
             RETURNING lesson_id, questions, updated_at",
        )
        .bind(lesson_id)
        .bind(Json(&form.questions))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err(e, || format!("Quiz for lesson {} not found", lesson_id)))?;
        Ok(record.to_domain())
    }

    async fn upsert_quiz(&self, lesson_id: Uuid, form: &QuizForm) -> PortResult<LessonQuiz> {
        let record = sqlx::query_as::<_, QuizRecord>(
            "INSERT INTO lesson_quizzes (lesson_id, questions) VALUES ($1, $2) \
             ON CONFLICT (lesson_id) DO UPDATE SET questions = EXCLUDED.questions, updated_at = now() \
             RETURNING lesson_id, questions, updated_at",
        )
        .bind(lesson_id)
        .bind(Json(&form.questions))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err(e, || format!("Lesson {} not found", lesson_id)))?;
        Ok(record.to_domain())
    }
}

//=========================================================================================
// `DraftSlot` Trait Implementation
//=========================================================================================

#[async_trait]
impl DraftSlot for DbAdapter {
    async fn read(&self, key: &str) -> PortResult<Option<String>> {
        sqlx::query_scalar("SELECT payload FROM drafts WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn write(&self, key: &str, payload: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO drafts (key, payload) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET payload = EXCLUDED.payload, updated_at = now()",
        )
        .bind(key)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM drafts WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
