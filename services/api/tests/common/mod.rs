//! Shared in-memory ports for the API tests.
#![allow(dead_code)]

use api_lib::config::Config;
use api_lib::web::state::AppState;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use lesson_studio_core::draft::MemoryDraftSlot;
use lesson_studio_core::media::MediaKind;
use lesson_studio_core::ports::{DatabaseService, ObjectStorage, PortError, PortResult};
use lesson_studio_core::{
    AdminAccount, AdminCredentials, LessonContent, LessonForm, LessonQuiz, QuizForm, Topic,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    admins: Vec<AdminCredentials>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    topics: Vec<Topic>,
    lessons: HashMap<Uuid, LessonContent>,
    quizzes: HashMap<Uuid, LessonQuiz>,
}

#[derive(Default)]
pub struct MemoryDb {
    tables: Mutex<Tables>,
    /// When set, every lesson and quiz write fails.
    pub fail_writes: std::sync::atomic::AtomicBool,
}

impl MemoryDb {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    fn check_writes(&self) -> PortResult<()> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(PortError::Unexpected("database unavailable".to_string()));
        }
        Ok(())
    }

    pub fn stored_lesson(&self, lesson_id: Uuid) -> Option<LessonContent> {
        self.tables().lessons.get(&lesson_id).cloned()
    }

    pub fn lesson_count(&self) -> usize {
        self.tables().lessons.len()
    }

    pub fn stored_quiz(&self, lesson_id: Uuid) -> Option<LessonQuiz> {
        self.tables().quizzes.get(&lesson_id).cloned()
    }

    fn write_lesson(&self, topic_id: Uuid, lesson_id: Uuid, form: &LessonForm) -> PortResult<LessonContent> {
        let mut t = self.tables();
        if !t.topics.iter().any(|topic| topic.id == topic_id) {
            return Err(PortError::NotFound(format!("Topic {} not found", topic_id)));
        }
        if let Some(existing) = t.lessons.get(&lesson_id) {
            if existing.topic_id != topic_id {
                return Err(PortError::Conflict(format!(
                    "Lesson {} belongs to another topic",
                    lesson_id
                )));
            }
        }
        let lesson = LessonContent {
            id: lesson_id,
            topic_id,
            text: form.text.clone(),
            sections: form.sections.clone(),
            audio: form.audio.clone(),
            video: form.video.clone(),
            updated_at: Utc::now(),
        };
        t.lessons.insert(lesson_id, lesson.clone());
        Ok(lesson)
    }

    fn write_quiz(&self, lesson_id: Uuid, form: &QuizForm) -> PortResult<LessonQuiz> {
        let mut t = self.tables();
        if !t.lessons.contains_key(&lesson_id) {
            return Err(PortError::NotFound(format!("Lesson {} not found", lesson_id)));
        }
        let quiz = LessonQuiz {
            lesson_id,
            questions: form.questions.clone(),
            updated_at: Utc::now(),
        };
        t.quizzes.insert(lesson_id, quiz.clone());
        Ok(quiz)
    }
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn create_admin(&self, email: &str, hashed_password: &str) -> PortResult<AdminAccount> {
        let mut t = self.tables();
        if t.admins.iter().any(|a| a.email == email) {
            return Err(PortError::Conflict(format!("Admin {} already exists", email)));
        }
        let id = Uuid::new_v4();
        t.admins.push(AdminCredentials {
            id,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        });
        Ok(AdminAccount {
            id,
            email: email.to_string(),
        })
    }

    async fn get_admin_by_email(&self, email: &str) -> PortResult<AdminCredentials> {
        self.tables()
            .admins
            .iter()
            .find(|a| a.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Admin {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        admin_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.tables()
            .sessions
            .insert(session_id.to_string(), (admin_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.tables().sessions.get(session_id) {
            Some((admin_id, expires_at)) if *expires_at > Utc::now() => Ok(*admin_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables().sessions.remove(session_id);
        Ok(())
    }

    async fn list_topics(&self) -> PortResult<Vec<Topic>> {
        Ok(self.tables().topics.clone())
    }

    async fn get_topic(&self, topic_id: Uuid) -> PortResult<Topic> {
        self.tables()
            .topics
            .iter()
            .find(|t| t.id == topic_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Topic {} not found", topic_id)))
    }

    async fn create_topic(&self, name: &str, description: Option<&str>) -> PortResult<Topic> {
        let topic = Topic {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };
        self.tables().topics.push(topic.clone());
        Ok(topic)
    }

    async fn update_topic(
        &self,
        topic_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<Topic> {
        let mut t = self.tables();
        let topic = t
            .topics
            .iter_mut()
            .find(|t| t.id == topic_id)
            .ok_or_else(|| PortError::NotFound(format!("Topic {} not found", topic_id)))?;
        topic.name = name.to_string();
        topic.description = description.map(str::to_string);
        Ok(topic.clone())
    }

    async fn delete_topic(&self, topic_id: Uuid) -> PortResult<()> {
        let mut t = self.tables();
        let before = t.topics.len();
        t.topics.retain(|topic| topic.id != topic_id);
        if t.topics.len() == before {
            return Err(PortError::NotFound(format!("Topic {} not found", topic_id)));
        }
        let removed: Vec<Uuid> = t
            .lessons
            .values()
            .filter(|l| l.topic_id == topic_id)
            .map(|l| l.id)
            .collect();
        for id in removed {
            t.lessons.remove(&id);
            t.quizzes.remove(&id);
        }
        Ok(())
    }

    async fn list_lessons(&self, topic_id: Uuid) -> PortResult<Vec<LessonContent>> {
        Ok(self
            .tables()
            .lessons
            .values()
            .filter(|l| l.topic_id == topic_id)
            .cloned()
            .collect())
    }

    async fn get_lesson(&self, topic_id: Uuid, lesson_id: Uuid) -> PortResult<LessonContent> {
        self.tables()
            .lessons
            .get(&lesson_id)
            .filter(|l| l.topic_id == topic_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Lesson {} not found", lesson_id)))
    }

    async fn create_lesson(&self, topic_id: Uuid, form: &LessonForm) -> PortResult<LessonContent> {
        self.check_writes()?;
        self.write_lesson(topic_id, Uuid::new_v4(), form)
    }

    async fn upsert_lesson(
        &self,
        topic_id: Uuid,
        lesson_id: Uuid,
        form: &LessonForm,
    ) -> PortResult<LessonContent> {
        self.check_writes()?;
        self.write_lesson(topic_id, lesson_id, form)
    }

    async fn get_quiz(&self, lesson_id: Uuid) -> PortResult<LessonQuiz> {
        self.stored_quiz(lesson_id)
            .ok_or_else(|| PortError::NotFound(format!("Quiz for lesson {} not found", lesson_id)))
    }

    async fn create_quiz(&self, lesson_id: Uuid, form: &QuizForm) -> PortResult<LessonQuiz> {
        self.check_writes()?;
        if self.stored_quiz(lesson_id).is_some() {
            return Err(PortError::Conflict(format!(
                "Lesson {} already has a quiz",
                lesson_id
            )));
        }
        self.write_quiz(lesson_id, form)
    }

    async fn update_quiz(&self, lesson_id: Uuid, form: &QuizForm) -> PortResult<LessonQuiz> {
        self.check_writes()?;
        if self.stored_quiz(lesson_id).is_none() {
            return Err(PortError::NotFound(format!(
                "Quiz for lesson {} not found",
                lesson_id
            )));
        }
        self.write_quiz(lesson_id, form)
    }

    async fn upsert_quiz(&self, lesson_id: Uuid, form: &QuizForm) -> PortResult<LessonQuiz> {
        self.check_writes()?;
        self.write_quiz(lesson_id, form)
    }
}

/// Records every object it is asked to store.
#[derive(Default)]
pub struct RecordingStorage {
    pub objects: Mutex<Vec<(MediaKind, String, usize)>>,
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn put_object(
        &self,
        kind: MediaKind,
        object_name: &str,
        _content_type: &str,
        data: Bytes,
    ) -> PortResult<String> {
        self.objects
            .lock()
            .unwrap()
            .push((kind, object_name.to_string(), data.len()));
        Ok(format!("http://media.test/{}/{}", kind, object_name))
    }
}

pub struct Harness {
    pub state: Arc<AppState>,
    pub db: Arc<MemoryDb>,
    pub drafts: Arc<MemoryDraftSlot>,
    pub storage: Arc<RecordingStorage>,
}

pub fn test_config() -> Config {
    Config::from_lookup(|name| match name {
        "DATABASE_URL" => Some("postgres://unused".to_string()),
        "MAX_UPLOAD_BYTES" => Some("1024".to_string()),
        "DRAFT_DEBOUNCE_MS" => Some("1200".to_string()),
        _ => None,
    })
    .unwrap()
}

pub fn harness() -> Harness {
    let db = Arc::new(MemoryDb::default());
    let drafts = Arc::new(MemoryDraftSlot::new());
    let storage = Arc::new(RecordingStorage::default());
    let state = Arc::new(AppState {
        db: db.clone(),
        drafts: drafts.clone(),
        storage: storage.clone(),
        config: Arc::new(test_config()),
    });
    Harness {
        state,
        db,
        drafts,
        storage,
    }
}
