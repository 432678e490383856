//! crates/lesson_studio_core/src/editor.rs
//!
//! Field-level mutations for the lesson and quiz editors.
//!
//! Every change to a section's text re-tokenizes it and realigns the timing
//! array. Operations report whether the timing array actually changed so a
//! reactive caller can skip redundant updates.

use serde::Deserialize;

use crate::domain::{LessonForm, QuestionType, QuizForm, QuizQuestion, Section};
use crate::{lines, timing};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("No section at index {0}")]
    NoSuchSection(usize),
    #[error("Section has {lines} lines; there is no line {line}")]
    NoSuchLine { line: usize, lines: usize },
    #[error("No question at index {0}")]
    NoSuchQuestion(usize),
    #[error("No option at index {0}")]
    NoSuchOption(usize),
    #[error("At least one item must remain")]
    LastItem,
    #[error("Timings must be finite, non-negative seconds")]
    InvalidTiming,
    #[error("Open-ended questions have no options")]
    NotMultipleChoice,
}

pub type EditResult<T> = Result<T, EditError>;

/// A free-text field of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionField {
    Question,
    Answer,
    Hint,
    Audio,
}

/// A lesson-level media attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LessonMedia {
    Audio,
    Video,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Section {
    /// Realigns `timing_array` with the current text. Returns `true` if it changed.
    pub fn resync_timing(&mut self) -> bool {
        let line_count = lines::count_lines(self.text.as_str());
        timing::sync_in_place(&mut self.timing_array, line_count)
    }
}

//=========================================================================================
// Lesson Form
//=========================================================================================

impl LessonForm {
    fn section_mut(&mut self, index: usize) -> EditResult<&mut Section> {
        self.sections
            .get_mut(index)
            .ok_or(EditError::NoSuchSection(index))
    }

    pub fn set_title(&mut self, title: String) {
        self.text = title;
    }

    pub fn set_media(&mut self, media: LessonMedia, url: Option<String>) {
        let url = blank_to_none(url);
        match media {
            LessonMedia::Audio => self.audio = url,
            LessonMedia::Video => self.video = url,
        }
    }

    /// Appends an empty section and returns its index.
    pub fn add_section(&mut self) -> usize {
        self.sections.push(Section::default());
        self.sections.len() - 1
    }

    pub fn remove_section(&mut self, index: usize) -> EditResult<Section> {
        if index >= self.sections.len() {
            return Err(EditError::NoSuchSection(index));
        }
        if self.sections.len() == 1 {
            return Err(EditError::LastItem);
        }
        Ok(self.sections.remove(index))
    }

    /// Replaces a section's text and realigns its timings.
    /// Returns `true` when the timing array changed.
    pub fn set_section_text(&mut self, index: usize, text: String) -> EditResult<bool> {
        let section = self.section_mut(index)?;
        section.text = text;
        Ok(section.resync_timing())
    }

    /// Sets the playback offset of one line.
    pub fn set_timing(&mut self, index: usize, line: usize, seconds: f64) -> EditResult<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(EditError::InvalidTiming);
        }
        let section = self.section_mut(index)?;
        section.resync_timing();
        let lines = section.timing_array.len();
        let slot = section
            .timing_array
            .get_mut(line)
            .ok_or(EditError::NoSuchLine { line, lines })?;
        *slot = seconds;
        Ok(())
    }

    pub fn set_section_field(
        &mut self,
        index: usize,
        field: SectionField,
        value: Option<String>,
    ) -> EditResult<()> {
        let section = self.section_mut(index)?;
        let value = blank_to_none(value);
        match field {
            SectionField::Question => section.question = value,
            SectionField::Answer => section.answer = value,
            SectionField::Hint => section.hint = value,
            SectionField::Audio => section.audio = value,
        }
        Ok(())
    }

    /// Appends an empty multiple-choice question to a section.
    pub fn add_mcq(&mut self, index: usize) -> EditResult<usize> {
        let section = self.section_mut(index)?;
        section.mcqs.push(QuizQuestion::multiple_choice());
        Ok(section.mcqs.len() - 1)
    }

    /// Sections may have no MCQs at all, so there is no floor here.
    pub fn remove_mcq(&mut self, index: usize, mcq: usize) -> EditResult<QuizQuestion> {
        let section = self.section_mut(index)?;
        if mcq >= section.mcqs.len() {
            return Err(EditError::NoSuchQuestion(mcq));
        }
        Ok(section.mcqs.remove(mcq))
    }

    pub fn set_mcq(&mut self, index: usize, mcq: usize, question: QuizQuestion) -> EditResult<()> {
        let section = self.section_mut(index)?;
        let slot = section
            .mcqs
            .get_mut(mcq)
            .ok_or(EditError::NoSuchQuestion(mcq))?;
        *slot = question;
        Ok(())
    }

    /// Realigns every section. Returns the indexes whose timings changed.
    pub fn resync_all(&mut self) -> Vec<usize> {
        self.sections
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.resync_timing().then_some(i))
            .collect()
    }
}

//=========================================================================================
// Quiz Form
//=========================================================================================

impl QuizForm {
    fn question_mut(&mut self, index: usize) -> EditResult<&mut QuizQuestion> {
        self.questions
            .get_mut(index)
            .ok_or(EditError::NoSuchQuestion(index))
    }

    pub fn add_question(&mut self, question_type: QuestionType) -> usize {
        self.questions.push(QuizQuestion {
            question_type,
            ..QuizQuestion::default()
        });
        self.questions.len() - 1
    }

    pub fn remove_question(&mut self, index: usize) -> EditResult<QuizQuestion> {
        if index >= self.questions.len() {
            return Err(EditError::NoSuchQuestion(index));
        }
        if self.questions.len() == 1 {
            return Err(EditError::LastItem);
        }
        Ok(self.questions.remove(index))
    }

    pub fn set_question_text(&mut self, index: usize, text: String) -> EditResult<()> {
        self.question_mut(index)?.question = text;
        Ok(())
    }

    /// Switching to open-ended drops the options and an answer that pointed at one.
    pub fn set_question_type(&mut self, index: usize, question_type: QuestionType) -> EditResult<()> {
        let q = self.question_mut(index)?;
        if q.question_type == question_type {
            return Ok(());
        }
        q.question_type = question_type;
        if question_type == QuestionType::OpenEnded {
            let options = std::mem::take(&mut q.options);
            if let Some(answer) = &q.correct_answer {
                if options.iter().any(|o| o == answer) {
                    q.correct_answer = None;
                }
            }
        }
        Ok(())
    }

    pub fn add_option(&mut self, index: usize, text: String) -> EditResult<usize> {
        let q = self.question_mut(index)?;
        if q.question_type != QuestionType::MultipleChoice {
            return Err(EditError::NotMultipleChoice);
        }
        q.options.push(text);
        Ok(q.options.len() - 1)
    }

    /// Renaming the option that is the correct answer renames the answer too.
    pub fn set_option(&mut self, index: usize, option: usize, text: String) -> EditResult<()> {
        let q = self.question_mut(index)?;
        let slot = q
            .options
            .get_mut(option)
            .ok_or(EditError::NoSuchOption(option))?;
        if q.correct_answer.as_deref() == Some(slot.as_str()) {
            q.correct_answer = Some(text.clone());
        }
        *slot = text;
        Ok(())
    }

    pub fn remove_option(&mut self, index: usize, option: usize) -> EditResult<String> {
        let q = self.question_mut(index)?;
        if option >= q.options.len() {
            return Err(EditError::NoSuchOption(option));
        }
        let removed = q.options.remove(option);
        if q.correct_answer.as_deref() == Some(removed.as_str()) {
            q.correct_answer = None;
        }
        Ok(removed)
    }

    pub fn set_correct_answer(&mut self, index: usize, answer: Option<String>) -> EditResult<()> {
        self.question_mut(index)?.correct_answer = blank_to_none(answer);
        Ok(())
    }
}
