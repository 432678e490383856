//! crates/lesson_studio_core/src/domain.rs
//!
//! Defines the core data structures for lesson authoring.
//! Field names on the wire are camelCase, mirroring what the admin console sends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timing;

/// A subject area that groups lessons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Whether a question is answered freely or by picking an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    #[default]
    OpenEnded,
    MultipleChoice,
}

/// A single quiz question. Also used for the MCQs attached to a section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
}

impl QuizQuestion {
    pub fn multiple_choice() -> Self {
        Self {
            question_type: QuestionType::MultipleChoice,
            ..Self::default()
        }
    }
}

/// The smallest content unit inside a lesson (a "subHeading" on the wire).
///
/// `timing_array` holds one playback offset in seconds per tokenized line of
/// `text`, aligned by position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "timing::deserialize_lenient")]
    pub timing_array: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default)]
    pub mcqs: Vec<QuizQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

/// The stored content of one lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonContent {
    pub id: Uuid,
    pub topic_id: Uuid,
    /// The lesson title.
    pub text: String,
    #[serde(rename = "subHeading")]
    pub sections: Vec<Section>,
    pub audio: Option<String>,
    pub video: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// The quiz attached to a lesson. There is at most one per lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonQuiz {
    pub lesson_id: Uuid,
    pub questions: Vec<QuizQuestion>,
    pub updated_at: DateTime<Utc>,
}

/// The editable body of a lesson, as submitted by the console and held in drafts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonForm {
    #[serde(default)]
    pub text: String,
    #[serde(rename = "subHeading", default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
}

impl Default for LessonForm {
    /// A new lesson starts with one empty section.
    fn default() -> Self {
        Self {
            text: String::new(),
            sections: vec![Section::default()],
            audio: None,
            video: None,
        }
    }
}

impl From<LessonContent> for LessonForm {
    fn from(lesson: LessonContent) -> Self {
        Self {
            text: lesson.text,
            sections: lesson.sections,
            audio: lesson.audio,
            video: lesson.video,
        }
    }
}

/// The editable body of a lesson quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizForm {
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

impl Default for QuizForm {
    fn default() -> Self {
        Self {
            questions: vec![QuizQuestion::default()],
        }
    }
}

impl From<LessonQuiz> for QuizForm {
    fn from(quiz: LessonQuiz) -> Self {
        Self {
            questions: quiz.questions,
        }
    }
}

/// An administrator allowed to use the console.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub id: Uuid,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
}
