use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ids::{AssessmentId, CourseId, LearnerId, OptionId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("assessment must contain at least one question")]
    NoQuestions,

    #[error("choice question must offer at least two options")]
    NotEnoughOptions,

    #[error("duplicate question id: {0}")]
    DuplicateQuestionId(QuestionId),
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

/// Question kinds supported by the assessment engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    Text,
}

/// One selectable option of a choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: OptionId,
    pub text: String,
}

/// Read-only question reference data supplied by the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    title: String,
    description: Option<String>,
    question_type: QuestionType,
    options: Vec<QuestionOption>,
    points: u32,
    min_text_length: Option<usize>,
}

impl Question {
    /// Builds a choice question (single or multiple select).
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::NotEnoughOptions` with fewer than two options.
    pub fn choice(
        id: QuestionId,
        title: impl Into<String>,
        question_type: QuestionType,
        options: Vec<QuestionOption>,
        points: u32,
    ) -> Result<Self, AssessmentError> {
        if options.len() < 2 {
            return Err(AssessmentError::NotEnoughOptions);
        }
        Ok(Self {
            id,
            title: title.into(),
            description: None,
            question_type,
            options,
            points,
            min_text_length: None,
        })
    }

    /// Builds a true/false question.
    #[must_use]
    pub fn true_false(id: QuestionId, title: impl Into<String>, points: u32) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            question_type: QuestionType::TrueFalse,
            options: Vec::new(),
            points,
            min_text_length: None,
        }
    }

    /// Builds a free-text question with an optional minimum length.
    #[must_use]
    pub fn text(
        id: QuestionId,
        title: impl Into<String>,
        points: u32,
        min_text_length: Option<usize>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            question_type: QuestionType::Text,
            options: Vec::new(),
            points,
            min_text_length,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    #[must_use]
    pub fn options(&self) -> &[QuestionOption] {
        &self.options
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn min_text_length(&self) -> Option<usize> {
        self.min_text_length
    }

    /// Replaces option ordering; used once at session creation for shuffling.
    #[must_use]
    pub fn with_options(mut self, options: Vec<QuestionOption>) -> Self {
        self.options = options;
        self
    }
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// An answer value, shaped by the question's type.
///
/// The session state machine treats these as opaque; interpretation happens
/// at the UI and grading boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    /// Selected option of a single-choice question.
    Option(OptionId),
    /// Selected options of a multiple-choice question.
    Options(Vec<OptionId>),
    /// True/false answer.
    Bool(bool),
    /// Free-text answer.
    Text(String),
}

/// Ordered answer map keyed by question id.
pub type AnswerMap = BTreeMap<QuestionId, AnswerValue>;

//
// ─── ASSESSMENT ────────────────────────────────────────────────────────────────
//

/// An assessment definition as read from the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    id: AssessmentId,
    course_id: CourseId,
    title: String,
    questions: Vec<Question>,
    passing_score: u8,
    shuffle_questions: bool,
    shuffle_options: bool,
}

impl Assessment {
    /// Builds an assessment definition.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::NoQuestions` for an empty question list and
    /// `AssessmentError::DuplicateQuestionId` for repeated ids.
    pub fn new(
        id: AssessmentId,
        course_id: CourseId,
        title: impl Into<String>,
        questions: Vec<Question>,
        passing_score: u8,
    ) -> Result<Self, AssessmentError> {
        if questions.is_empty() {
            return Err(AssessmentError::NoQuestions);
        }
        let mut seen = std::collections::HashSet::new();
        for q in &questions {
            if !seen.insert(q.id().clone()) {
                return Err(AssessmentError::DuplicateQuestionId(q.id().clone()));
            }
        }
        Ok(Self {
            id,
            course_id,
            title: title.into(),
            questions,
            passing_score: passing_score.min(100),
            shuffle_questions: false,
            shuffle_options: false,
        })
    }

    /// Requests shuffled question order at session creation.
    #[must_use]
    pub fn with_shuffled_questions(mut self, shuffle: bool) -> Self {
        self.shuffle_questions = shuffle;
        self
    }

    /// Requests shuffled option order for choice questions at session creation.
    #[must_use]
    pub fn with_shuffled_options(mut self, shuffle: bool) -> Self {
        self.shuffle_options = shuffle;
        self
    }

    #[must_use]
    pub fn id(&self) -> &AssessmentId {
        &self.id
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }

    #[must_use]
    pub fn shuffle_questions(&self) -> bool {
        self.shuffle_questions
    }

    #[must_use]
    pub fn shuffle_options(&self) -> bool {
        self.shuffle_options
    }
}

//
// ─── DRAFTS & SUBMISSIONS ──────────────────────────────────────────────────────
//

/// An unfinished, resumable answer set persisted by autosave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentDraft {
    pub learner_id: LearnerId,
    pub assessment_id: AssessmentId,
    pub answers: AnswerMap,
    pub last_saved_at: DateTime<Utc>,
}

/// The finalized, immutable answer set. Once this exists for a
/// (learner, assessment) pair the draft is superseded and editing ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSubmission {
    pub learner_id: LearnerId,
    pub assessment_id: AssessmentId,
    pub answers: AnswerMap,
    pub submitted_at: DateTime<Utc>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
