use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{AnswerValue, QuestionId, TestId};
use quiz_core::wire::SessionBundle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// The live answer map as persisted: always a complete snapshot, never a diff,
/// so a reload rebuilds state from a single read.
pub type AnswerMap = BTreeMap<QuestionId, AnswerValue>;

/// Errors surfaced by cache adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// The four durable records scoped to one test id.
///
/// Written independently while the session is open; all four share one
/// lifecycle and are cleared together when the session closes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedSession {
    /// The fetched question/test-info/submission bundle.
    pub bundle: Option<SessionBundle>,
    /// The student's latest answer snapshot.
    pub answers: Option<AnswerMap>,
    /// When this attempt started.
    pub started_at: Option<DateTime<Utc>>,
    /// The computed effective cutoff.
    pub deadline: Option<DateTime<Utc>>,
}

impl CachedSession {
    /// Returns true when no record exists for the test.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bundle.is_none()
            && self.answers.is_none()
            && self.started_at.is_none()
            && self.deadline.is_none()
    }
}

/// Durable session cache contract.
///
/// The engine depends on this interface, never on a process-wide singleton,
/// so tests substitute an in-memory fake. Implementations must clear all four
/// records of a test id atomically.
#[async_trait]
pub trait SessionCacheStore: Send + Sync {
    /// Fetch every cached record for a test id. Missing records come back as
    /// `None` fields; an unknown test id yields an all-empty value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be read.
    async fn load(&self, test_id: &TestId) -> Result<CachedSession, StorageError>;

    /// Persist the fetched session bundle.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write is rejected.
    async fn save_bundle(
        &self,
        test_id: &TestId,
        bundle: &SessionBundle,
    ) -> Result<(), StorageError>;

    /// Persist the full answer snapshot, replacing any prior one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write is rejected (e.g. quota).
    async fn save_answers(&self, test_id: &TestId, answers: &AnswerMap)
    -> Result<(), StorageError>;

    /// Persist the session start timestamp.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write is rejected.
    async fn save_started_at(
        &self,
        test_id: &TestId,
        started_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Persist the computed deadline.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write is rejected.
    async fn save_deadline(
        &self,
        test_id: &TestId,
        deadline: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Drop all four records for a test id in one step.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn clear(&self, test_id: &TestId) -> Result<(), StorageError>;
}

/// Simple in-memory cache implementation for testing and prototyping.
///
/// `fail_next_save` injects a single quota failure so save-error paths can be
/// exercised without a real storage backend.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    sessions: Arc<Mutex<HashMap<TestId, CachedSession>>>,
    fail_next_save: Arc<AtomicBool>,
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next save call fail with `StorageError::QuotaExceeded`.
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    fn check_injected_failure(&self) -> Result<(), StorageError> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(StorageError::QuotaExceeded);
        }
        Ok(())
    }

    fn with_entry(
        &self,
        test_id: &TestId,
        update: impl FnOnce(&mut CachedSession),
    ) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        update(guard.entry(test_id.clone()).or_default());
        Ok(())
    }
}

#[async_trait]
impl SessionCacheStore for InMemoryCache {
    async fn load(&self, test_id: &TestId) -> Result<CachedSession, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(test_id).cloned().unwrap_or_default())
    }

    async fn save_bundle(
        &self,
        test_id: &TestId,
        bundle: &SessionBundle,
    ) -> Result<(), StorageError> {
        self.check_injected_failure()?;
        self.with_entry(test_id, |entry| entry.bundle = Some(bundle.clone()))
    }

    async fn save_answers(
        &self,
        test_id: &TestId,
        answers: &AnswerMap,
    ) -> Result<(), StorageError> {
        self.check_injected_failure()?;
        self.with_entry(test_id, |entry| entry.answers = Some(answers.clone()))
    }

    async fn save_started_at(
        &self,
        test_id: &TestId,
        started_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.check_injected_failure()?;
        self.with_entry(test_id, |entry| entry.started_at = Some(started_at))
    }

    async fn save_deadline(
        &self,
        test_id: &TestId,
        deadline: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.check_injected_failure()?;
        self.with_entry(test_id, |entry| entry.deadline = Some(deadline))
    }

    async fn clear(&self, test_id: &TestId) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(test_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::OptionId;
    use quiz_core::time::fixed_now;

    fn test_id() -> TestId {
        TestId::new("t1")
    }

    fn sample_answers() -> AnswerMap {
        let mut answers = AnswerMap::new();
        answers.insert(
            QuestionId::new("q1"),
            AnswerValue::single(OptionId::new("o1")),
        );
        answers
    }

    #[tokio::test]
    async fn unknown_test_id_loads_empty() {
        let cache = InMemoryCache::new();
        let cached = cache.load(&test_id()).await.unwrap();
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn records_persist_independently_and_clear_together() {
        let cache = InMemoryCache::new();
        let id = test_id();

        cache.save_answers(&id, &sample_answers()).await.unwrap();
        cache.save_started_at(&id, fixed_now()).await.unwrap();

        let cached = cache.load(&id).await.unwrap();
        assert_eq!(cached.answers, Some(sample_answers()));
        assert_eq!(cached.started_at, Some(fixed_now()));
        assert!(cached.bundle.is_none());

        cache.clear(&id).await.unwrap();
        assert!(cache.load(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_failure_rejects_one_save() {
        let cache = InMemoryCache::new();
        let id = test_id();

        cache.fail_next_save();
        let err = cache
            .save_answers(&id, &sample_answers())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded));

        // the failure is one-shot
        cache.save_answers(&id, &sample_answers()).await.unwrap();
        assert!(cache.load(&id).await.unwrap().answers.is_some());
    }
}
