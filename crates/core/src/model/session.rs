use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::deadline::compute_deadline;
use crate::model::answer::AnswerValue;
use crate::model::ids::{ClassId, QuestionId, TestId};
use crate::model::question::{Question, QuestionKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("session already completed")]
    Completed,
}

/// Test metadata as published by the teacher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestInfo {
    pub test_id: TestId,
    pub class_id: ClassId,
    #[serde(default)]
    pub title: String,
    /// Per-student allotted time. Only meaningful when `is_test` is set.
    pub duration_minutes: u32,
    /// Test-wide closing time; binds every student regardless of start time.
    pub hard_end: DateTime<Utc>,
    /// Timed test vs open-ended practice. Open tests never run a clock.
    pub is_test: bool,
}

/// Lifecycle state of one student's attempt.
///
/// "Not started" is the absence of any durable record; by the time a
/// `TestSession` value exists the bootstrapper has already fixed a start
/// timestamp, so the enum only distinguishes in-progress from done.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionState {
    InProgress {
        started_at: DateTime<Utc>,
    },
    /// Terminal. Answers are frozen and a fresh session key is required to
    /// retake.
    Done {
        completed_at: Option<DateTime<Utc>>,
        score: Option<f64>,
    },
}

/// One student's attempt at one test: metadata, the immutable question list,
/// the answer map, and the lifecycle state.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSession {
    info: TestInfo,
    questions: Vec<Question>,
    answers: BTreeMap<QuestionId, AnswerValue>,
    state: SessionState,
}

impl TestSession {
    /// Builds an in-progress session with the given start timestamp.
    #[must_use]
    pub fn in_progress(
        info: TestInfo,
        questions: Vec<Question>,
        answers: BTreeMap<QuestionId, AnswerValue>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            info,
            questions,
            answers,
            state: SessionState::InProgress { started_at },
        }
    }

    /// Builds a session that is already closed, with frozen answers.
    #[must_use]
    pub fn done(
        info: TestInfo,
        questions: Vec<Question>,
        answers: BTreeMap<QuestionId, AnswerValue>,
        completed_at: Option<DateTime<Utc>>,
        score: Option<f64>,
    ) -> Self {
        Self {
            info,
            questions,
            answers,
            state: SessionState::Done {
                completed_at,
                score,
            },
        }
    }

    #[must_use]
    pub fn info(&self) -> &TestInfo {
        &self.info
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Looks up the type tag for a question in this session.
    #[must_use]
    pub fn kind_of(&self, question_id: &QuestionId) -> Option<QuestionKind> {
        self.questions
            .iter()
            .find(|question| &question.id == question_id)
            .map(Question::kind)
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, AnswerValue> {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, question_id: &QuestionId) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.state, SessionState::Done { .. })
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SessionState::InProgress { started_at } => Some(started_at),
            SessionState::Done { .. } => None,
        }
    }

    #[must_use]
    pub fn score(&self) -> Option<f64> {
        match self.state {
            SessionState::InProgress { .. } => None,
            SessionState::Done { score, .. } => score,
        }
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Number of questions with a non-empty answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers
            .values()
            .filter(|answer| !answer.is_empty())
            .count()
    }

    /// The effective cutoff, present only while a timed session is open.
    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SessionState::InProgress { started_at } if self.info.is_test => Some(
                compute_deadline(started_at, self.info.duration_minutes, self.info.hard_end),
            ),
            _ => None,
        }
    }

    /// Freezes the final answer snapshot and closes the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::Completed` if the session is already done;
    /// Done is terminal and never mutated again.
    pub fn complete(
        &mut self,
        answers: BTreeMap<QuestionId, AnswerValue>,
        score: Option<f64>,
        completed_at: DateTime<Utc>,
    ) -> Result<(), SessionStateError> {
        if self.is_done() {
            return Err(SessionStateError::Completed);
        }
        self.answers = answers;
        self.state = SessionState::Done {
            completed_at: Some(completed_at),
            score,
        };
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
