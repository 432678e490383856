//! crates/lesson_studio_core/src/validation.rs
//!
//! Pre-submission checks for lessons and quizzes. Every problem found is
//! collected into one report so the console can show them together; nothing
//! is submitted while the report is non-empty.

use serde::Serialize;
use std::fmt;

use crate::domain::{QuestionType, QuizQuestion, Section};
use crate::lines;

/// Where in a form a question lives. Indexes are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "in", rename_all = "camelCase")]
pub enum QuestionPath {
    Quiz { question: usize },
    Section { section: usize, mcq: usize },
}

impl fmt::Display for QuestionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionPath::Quiz { question } => write!(f, "question {}", question + 1),
            QuestionPath::Section { section, mcq } => {
                write!(f, "section {} MCQ {}", section + 1, mcq + 1)
            }
        }
    }
}

/// A single problem that blocks submission.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "code", rename_all = "camelCase")]
pub enum ValidationIssue {
    #[error("Lesson title is required")]
    MissingTitle,
    #[error("A lesson needs at least one section")]
    NoSections,
    #[error("Section {} has no text", .section + 1)]
    MissingSectionText { section: usize },
    #[error("Section {} has {timings} timings for {lines} lines", .section + 1)]
    TimingMismatch {
        section: usize,
        lines: usize,
        timings: usize,
    },
    #[error("Section {} line {} has an invalid timing", .section + 1, .line + 1)]
    InvalidTiming { section: usize, line: usize },
    #[error("A quiz needs at least one question")]
    NoQuestions,
    #[error("{at}: question text is required")]
    MissingQuestionText { at: QuestionPath },
    #[error("{at}: multiple-choice questions need at least 2 options, found {found}")]
    TooFewOptions { at: QuestionPath, found: usize },
    #[error("{at}: option {} is blank", .option + 1)]
    BlankOption { at: QuestionPath, option: usize },
    #[error("{at}: a correct answer is required")]
    MissingCorrectAnswer { at: QuestionPath },
    #[error("{at}: correct answer must match one of the options")]
    AnswerNotAnOption { at: QuestionPath },
}

/// All issues found in one form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// `Ok(())` when nothing was found.
    pub fn into_result(self) -> Result<(), ValidationReport> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

/// Checks one question. Open-ended questions may leave the answer empty.
pub fn check_question(question: &QuizQuestion, at: QuestionPath, report: &mut ValidationReport) {
    if question.question.trim().is_empty() {
        report.push(ValidationIssue::MissingQuestionText { at });
    }
    if question.question_type == QuestionType::OpenEnded {
        return;
    }

    if question.options.len() < 2 {
        report.push(ValidationIssue::TooFewOptions {
            at,
            found: question.options.len(),
        });
    }
    for (option, text) in question.options.iter().enumerate() {
        if text.trim().is_empty() {
            report.push(ValidationIssue::BlankOption { at, option });
        }
    }
    match question.correct_answer.as_deref().map(str::trim) {
        None | Some("") => report.push(ValidationIssue::MissingCorrectAnswer { at }),
        Some(answer) => {
            if !question.options.iter().any(|o| o.trim() == answer) {
                report.push(ValidationIssue::AnswerNotAnOption { at });
            }
        }
    }
}

pub fn validate_question(question: &QuizQuestion) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::default();
    check_question(question, QuestionPath::Quiz { question: 0 }, &mut report);
    report.into_result()
}

pub fn validate_quiz(questions: &[QuizQuestion]) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::default();
    if questions.is_empty() {
        report.push(ValidationIssue::NoQuestions);
    }
    for (i, q) in questions.iter().enumerate() {
        check_question(q, QuestionPath::Quiz { question: i }, &mut report);
    }
    report.into_result()
}

fn check_section(index: usize, section: &Section, report: &mut ValidationReport) {
    let line_count = lines::count_lines(section.text.as_str());
    if line_count == 0 {
        report.push(ValidationIssue::MissingSectionText { section: index });
    } else if section.timing_array.len() != line_count {
        report.push(ValidationIssue::TimingMismatch {
            section: index,
            lines: line_count,
            timings: section.timing_array.len(),
        });
    }
    for (line, t) in section.timing_array.iter().enumerate() {
        if !t.is_finite() || *t < 0.0 {
            report.push(ValidationIssue::InvalidTiming {
                section: index,
                line,
            });
        }
    }
    for (mcq, q) in section.mcqs.iter().enumerate() {
        check_question(
            q,
            QuestionPath::Section {
                section: index,
                mcq,
            },
            report,
        );
    }
}

/// Checks a lesson's title, sections and section MCQs.
///
/// Timing arrays are expected to be normalized already; a length mismatch is
/// reported rather than fixed here.
pub fn validate_lesson(title: &str, sections: &[Section]) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::default();
    if title.trim().is_empty() {
        report.push(ValidationIssue::MissingTitle);
    }
    if sections.is_empty() {
        report.push(ValidationIssue::NoSections);
    }
    for (i, section) in sections.iter().enumerate() {
        check_section(i, section, &mut report);
    }
    report.into_result()
}
