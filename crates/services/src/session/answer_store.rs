//! In-memory answer state with write-through persistence.

use std::collections::BTreeMap;
use std::sync::Arc;

use quiz_core::codec::{self, AnswerEdit, CodecError};
use quiz_core::model::{AnswerValue, Question, QuestionId, QuestionKind, TestId};
use storage::repository::{AnswerMap, SessionCacheStore};

use crate::error::SessionError;

use super::progress::SessionProgress;

/// Durability status of the most recent answer write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    /// Nothing written yet this session.
    #[default]
    Idle,
    /// A write is in flight.
    Saving,
    /// The latest snapshot reached durable storage.
    Saved,
    /// The latest write failed; the in-memory value is ahead of storage.
    Error,
}

/// Holds the student's answers while a session is open.
///
/// Every mutation validates the answer shape against the question kind,
/// updates the in-memory map, and writes the full snapshot through to the
/// session cache. A failed write never loses the keystroke: the in-memory
/// value stays and the status turns to [`SaveStatus::Error`].
pub struct AnswerStore {
    test_id: TestId,
    kinds: BTreeMap<QuestionId, QuestionKind>,
    answers: AnswerMap,
    status: SaveStatus,
    cache: Arc<dyn SessionCacheStore>,
}

impl AnswerStore {
    #[must_use]
    pub fn new(
        test_id: TestId,
        questions: &[Question],
        cache: Arc<dyn SessionCacheStore>,
    ) -> Self {
        let kinds = questions
            .iter()
            .map(|question| (question.id.clone(), question.kind()))
            .collect();
        Self {
            test_id,
            kinds,
            answers: AnswerMap::new(),
            status: SaveStatus::Idle,
            cache,
        }
    }

    /// Seeds the in-memory map from a restored snapshot without writing it
    /// back out. Empty values are dropped on the way in.
    pub fn hydrate(&mut self, answers: AnswerMap) {
        self.answers = answers;
        self.answers.retain(|_, answer| !answer.is_empty());
        self.status = SaveStatus::Idle;
    }

    #[must_use]
    pub fn get(&self, question_id: &QuestionId) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    #[must_use]
    pub fn snapshot(&self) -> &AnswerMap {
        &self.answers
    }

    #[must_use]
    pub fn status(&self) -> SaveStatus {
        self.status
    }

    #[must_use]
    pub fn kind_of(&self, question_id: &QuestionId) -> Option<QuestionKind> {
        self.kinds.get(question_id).copied()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            answered: self
                .answers
                .values()
                .filter(|answer| !answer.is_empty())
                .count(),
            total: self.kinds.len(),
        }
    }

    /// Stores a normalized answer for a question.
    ///
    /// Setting the value a question already holds is a no-op. Setting an
    /// empty value removes the entry instead of storing it.
    ///
    /// # Errors
    ///
    /// Fails when the question is unknown, the answer shape does not match
    /// the question kind, or the cache write fails.
    pub async fn set(
        &mut self,
        question_id: QuestionId,
        answer: AnswerValue,
    ) -> Result<(), SessionError> {
        let kind = self
            .kinds
            .get(&question_id)
            .copied()
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.clone()))?;
        if !codec::matches(kind, &answer) {
            return Err(CodecError::KindMismatch {
                expected: kind,
                found: answer.kind(),
            }
            .into());
        }
        if self.answers.get(&question_id) == Some(&answer) {
            return Ok(());
        }
        if answer.is_empty() {
            return self.remove(&question_id).await;
        }
        self.answers.insert(question_id, answer);
        self.persist().await
    }

    /// Drops the answer for a question, if any.
    ///
    /// # Errors
    ///
    /// Fails when the cache write fails.
    pub async fn remove(&mut self, question_id: &QuestionId) -> Result<(), SessionError> {
        if self.answers.remove(question_id).is_none() {
            return Ok(());
        }
        self.persist().await
    }

    /// Applies a raw edit event to a question's current answer and persists
    /// the outcome. An edit that empties the answer removes the entry.
    ///
    /// # Errors
    ///
    /// Fails when the question is unknown, the edit does not fit the
    /// question kind, or the cache write fails.
    pub async fn apply(
        &mut self,
        question_id: &QuestionId,
        edit: AnswerEdit,
    ) -> Result<(), SessionError> {
        let kind = self
            .kinds
            .get(question_id)
            .copied()
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.clone()))?;
        let current = self.answers.get(question_id).cloned();
        match codec::apply_edit(kind, current, edit)? {
            Some(next) => self.set(question_id.clone(), next).await,
            None => self.remove(question_id).await,
        }
    }

    async fn persist(&mut self) -> Result<(), SessionError> {
        self.status = SaveStatus::Saving;
        match self.cache.save_answers(&self.test_id, &self.answers).await {
            Ok(()) => {
                self.status = SaveStatus::Saved;
                Ok(())
            }
            Err(err) => {
                self.status = SaveStatus::Error;
                Err(err.into())
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
