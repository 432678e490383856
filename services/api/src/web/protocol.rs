//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the admin console and the API
//! server for the lesson and quiz editors.

use chrono::{DateTime, Utc};
use lesson_studio_core::draft::DraftKind;
use lesson_studio_core::editor::{LessonMedia, SectionField};
use lesson_studio_core::validation::ValidationIssue;
use lesson_studio_core::{QuestionType, QuizQuestion};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================
// NOTE: Section and question indexes are zero-based.
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Opens an editor. This must be the first message sent on the connection.
    Init {
        kind: DraftKind,
        #[serde(default)]
        topic_id: Option<Uuid>,
        #[serde(default)]
        lesson_id: Option<Uuid>,
    },

    // --- Lesson editor ---
    SetTitle { text: String },
    SetLessonMedia { media: LessonMedia, url: Option<String> },
    AddSection,
    RemoveSection { index: usize },
    SetSectionText { index: usize, text: String },
    SetTiming { index: usize, line: usize, seconds: f64 },
    SetSectionField {
        index: usize,
        field: SectionField,
        value: Option<String>,
    },
    AddMcq { index: usize },
    RemoveMcq { index: usize, mcq: usize },
    SetMcq {
        index: usize,
        mcq: usize,
        question: QuizQuestion,
    },

    // --- Quiz editor ---
    AddQuestion {
        #[serde(default)]
        question_type: QuestionType,
    },
    RemoveQuestion { index: usize },
    SetQuestionText { index: usize, text: String },
    SetQuestionType { index: usize, question_type: QuestionType },
    AddOption { index: usize, text: String },
    SetOption { index: usize, option: usize, text: String },
    RemoveOption { index: usize, option: usize },
    SetCorrectAnswer { index: usize, answer: Option<String> },

    // --- Both editors ---
    /// Writes the draft immediately instead of waiting for the quiet period.
    SaveDraft,
    /// Validates and stores the form, then clears the draft.
    Submit,
    /// Asks whether the editor can be left without losing work.
    RequestLeave,
    /// Leaves the editor; unsaved changes may be lost.
    ConfirmLeave,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// The editor is open. `restored` is true when the form came from a draft.
    EditorReady {
        restored: bool,
        form: serde_json::Value,
    },

    /// A section's timing array was realigned with its text.
    SectionSynced { index: usize, timing_array: Vec<f64> },

    /// The draft was written to storage.
    DraftSaved { saved_at: DateTime<Utc> },

    /// The form was stored. `id` is the lesson id for both editors.
    Submitted { id: Uuid },

    /// Submission was blocked; nothing was stored.
    ValidationFailed { issues: Vec<ValidationIssue> },

    /// The backend refused or failed the submission; the draft is kept.
    SubmitFailed { message: String },

    LeaveAllowed,

    /// There are unsaved changes or a submission in flight.
    LeaveConfirmationRequired,

    /// A single message could not be applied. The session stays open.
    Error { message: String },
}
