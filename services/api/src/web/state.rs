//! services/api/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::config::Config;
use lesson_studio_core::draft::{
    self, Draft, DraftConfig, DraftError, DraftKey, DraftKind, DraftScope, DraftStore,
};
use lesson_studio_core::editor::EditError;
use lesson_studio_core::media::UploadPolicy;
use lesson_studio_core::ports::{DatabaseService, DraftSlot, ObjectStorage, PortError};
use lesson_studio_core::{LessonForm, QuizForm};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub drafts: Arc<dyn DraftSlot>,
    pub storage: Arc<dyn ObjectStorage>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy::new(self.config.max_upload_bytes)
    }

    pub fn draft_config(&self) -> DraftConfig {
        DraftConfig {
            debounce: self.config.draft_debounce,
        }
    }
}

//=========================================================================================
// EditorSession (Specific to One WebSocket Connection)
//=========================================================================================

/// Everything that can go wrong while driving an editor session.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("A {0} editor needs a {1}")]
    MissingId(DraftKind, &'static str),
    #[error("This message does not apply to a {0} editor")]
    WrongEditor(DraftKind),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Port(#[from] PortError),
    #[error(transparent)]
    Draft(#[from] DraftError),
}

/// The form being edited, together with its draft store.
pub enum EditorForm {
    Lesson(DraftStore<LessonForm>),
    Quiz(DraftStore<QuizForm>),
}

impl EditorForm {
    pub fn kind(&self) -> DraftKind {
        match self {
            EditorForm::Lesson(_) => DraftKind::Lesson,
            EditorForm::Quiz(_) => DraftKind::Quiz,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<draft::DraftState> {
        match self {
            EditorForm::Lesson(store) => store.subscribe(),
            EditorForm::Quiz(store) => store.subscribe(),
        }
    }

    pub fn exit_guard(&self) -> draft::ExitGuard {
        match self {
            EditorForm::Lesson(store) => store.exit_guard(),
            EditorForm::Quiz(store) => store.exit_guard(),
        }
    }

    /// The current form as JSON, for the `editorReady` reply.
    pub async fn to_json(&self) -> serde_json::Value {
        let value = match self {
            EditorForm::Lesson(store) => store.read(|form| serde_json::to_value(form)).await,
            EditorForm::Quiz(store) => store.read(|form| serde_json::to_value(form)).await,
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

/// The state for a single, active editor connection.
pub struct EditorSession {
    pub admin_id: Uuid,
    /// Route identifiers. A lesson created by this session gets its id filled
    /// in, and its draft store is moved to match.
    pub scope: DraftScope,
    pub form: EditorForm,
    /// Whether the form came from a persisted draft rather than the backend.
    pub restored: bool,
}

impl EditorSession {
    /// Opens an editor: a matching draft wins, then the stored record, then an empty form.
    pub async fn open(
        app_state: &AppState,
        admin_id: Uuid,
        kind: DraftKind,
        scope: DraftScope,
    ) -> Result<Self, EditorError> {
        let key = DraftKey::new(admin_id, kind, scope);
        let slot = app_state.drafts.clone();
        let config = app_state.draft_config();

        let (form, restored) = match kind {
            DraftKind::Lesson => {
                let topic_id = scope
                    .topic_id
                    .ok_or(EditorError::MissingId(kind, "topicId"))?;
                match draft::restore::<LessonForm>(slot.as_ref(), &key).await? {
                    Some(saved) => (EditorForm::Lesson(from_draft(slot, key, config, saved)), true),
                    None => {
                        let mut form = match scope.lesson_id {
                            Some(lesson_id) => match app_state.db.get_lesson(topic_id, lesson_id).await {
                                Ok(lesson) => LessonForm::from(lesson),
                                Err(PortError::NotFound(_)) => LessonForm::default(),
                                Err(e) => return Err(e.into()),
                            },
                            None => {
                                app_state.db.get_topic(topic_id).await?;
                                LessonForm::default()
                            }
                        };
                        form.resync_all();
                        (EditorForm::Lesson(DraftStore::new(slot, key, config, form)), false)
                    }
                }
            }
            DraftKind::Quiz => {
                let lesson_id = scope
                    .lesson_id
                    .ok_or(EditorError::MissingId(kind, "lessonId"))?;
                match draft::restore::<QuizForm>(slot.as_ref(), &key).await? {
                    Some(saved) => (EditorForm::Quiz(DraftStore::from_draft(slot, key, config, saved)), true),
                    None => {
                        let form = match app_state.db.get_quiz(lesson_id).await {
                            Ok(quiz) => QuizForm::from(quiz),
                            Err(PortError::NotFound(_)) => QuizForm::default(),
                            Err(e) => return Err(e.into()),
                        };
                        (EditorForm::Quiz(DraftStore::new(slot, key, config, form)), false)
                    }
                }
            }
        };

        info!(
            "Opened {} editor for admin {} (restored from draft: {})",
            kind, admin_id, restored
        );
        Ok(Self {
            admin_id,
            scope,
            form,
            restored,
        })
    }
}

/// Restored lesson drafts are realigned before use; older clients may have left gaps.
fn from_draft(
    slot: Arc<dyn DraftSlot>,
    key: DraftKey,
    config: DraftConfig,
    mut saved: Draft<LessonForm>,
) -> DraftStore<LessonForm> {
    saved.form.resync_all();
    DraftStore::from_draft(slot, key, config, saved)
}
