pub mod domain;
pub mod draft;
pub mod editor;
pub mod lines;
pub mod media;
pub mod ports;
pub mod timing;
pub mod validation;

pub use domain::{
    AdminAccount, AdminCredentials, LessonContent, LessonForm, LessonQuiz, QuestionType,
    QuizForm, QuizQuestion, Section, Topic,
};
pub use draft::{Draft, DraftConfig, DraftKey, DraftKind, DraftScope, DraftStatus, DraftStore, ExitGuard};
pub use ports::{DatabaseService, DraftSlot, ObjectStorage, PortError, PortResult};
pub use validation::{ValidationIssue, ValidationReport};
