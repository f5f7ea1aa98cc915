//! Final submission with exactly-once semantics.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use quiz_core::Clock;
use quiz_core::codec;
use quiz_core::model::TestSession;
use quiz_core::wire::{ServerSubmission, SessionBundle, SubmitAck, TestSubmission};
use storage::repository::SessionCacheStore;

use crate::error::SessionError;
use crate::remote::TestBackend;

use super::answer_store::AnswerStore;

/// What caused the final submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    /// The student pressed submit; the UI has already confirmed.
    Explicit,
    /// The countdown reached zero on a timed test.
    DeadlineExpiry,
}

/// Posts the final answer set at most once per session.
///
/// The one-shot guard is claimed before the network call, so a concurrent
/// second submit fails fast instead of double-posting. An explicit submit
/// that fails releases the guard for a retry; an expiry-driven submit does
/// not, because the countdown never re-arms, and instead freezes the session
/// locally so no further edits can land. The freeze is durable: the cached
/// bundle is stamped completed, so a reload classifies Done rather than
/// reviving the expired session.
pub struct SubmissionGateway {
    backend: Arc<dyn TestBackend>,
    cache: Arc<dyn SessionCacheStore>,
    clock: Clock,
    author_mail: String,
    submitted: AtomicBool,
}

impl SubmissionGateway {
    #[must_use]
    pub fn new(
        backend: Arc<dyn TestBackend>,
        cache: Arc<dyn SessionCacheStore>,
        clock: Clock,
        author_mail: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            cache,
            clock,
            author_mail: author_mail.into(),
            submitted: AtomicBool::new(false),
        }
    }

    /// True once a submission has been committed (posted, or frozen locally
    /// after a failed expiry submit).
    #[must_use]
    pub fn has_submitted(&self) -> bool {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Submits a timed test's answers to the server.
    ///
    /// On success the durable cache is cleared and the session completes
    /// with the acknowledged score.
    ///
    /// # Errors
    ///
    /// Fails when the session is already done, a submission was already
    /// performed, the test is open ended, an answer cannot be encoded, the
    /// server rejects the post, or the durable records cannot be updated.
    pub async fn submit(
        &self,
        session: &mut TestSession,
        store: &AnswerStore,
        trigger: SubmitTrigger,
    ) -> Result<SubmitAck, SessionError> {
        if session.is_done() {
            return Err(SessionError::Completed);
        }
        if !session.info().is_test {
            return Err(SessionError::OpenTest);
        }
        if self.submitted.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadySubmitted);
        }

        let payload = match self.build_payload(session, store) {
            Ok(payload) => payload,
            Err(err) => {
                // nothing left the machine; encoding is retryable
                self.submitted.store(false, Ordering::SeqCst);
                return Err(err);
            }
        };

        match self.backend.submit_test(&payload).await {
            Ok(ack) => {
                session.complete(store.snapshot().clone(), ack.score, self.clock.now())?;
                self.cache.clear(&session.info().test_id).await?;
                Ok(ack)
            }
            Err(err) => match trigger {
                SubmitTrigger::Explicit => {
                    self.submitted.store(false, Ordering::SeqCst);
                    Err(err.into())
                }
                SubmitTrigger::DeadlineExpiry => {
                    // expiry never retries: freeze locally with no score so
                    // the student cannot keep editing past the deadline
                    let started_at = session.started_at();
                    let completed_at = self.clock.now();
                    session.complete(store.snapshot().clone(), None, completed_at)?;
                    // the frozen state must survive a reload: stamp the
                    // cached bundle as completed so the next bootstrap
                    // classifies Done instead of resurrecting an expired
                    // session and posting a second time
                    let frozen = SessionBundle {
                        test_info: session.info().clone(),
                        questions: session.questions().to_vec(),
                        submission: Some(ServerSubmission {
                            started_at,
                            completed_at: Some(completed_at),
                            score: None,
                            question_submission: payload.question_submission,
                        }),
                    };
                    self.cache
                        .save_bundle(&session.info().test_id, &frozen)
                        .await?;
                    Err(err.into())
                }
            },
        }
    }

    /// Closes an open-ended test locally. No server call is made.
    ///
    /// # Errors
    ///
    /// Fails when the session is already done, the test is timed, or the
    /// cache cannot be cleared.
    pub async fn finish_open(
        &self,
        session: &mut TestSession,
        store: &AnswerStore,
    ) -> Result<(), SessionError> {
        if session.is_done() {
            return Err(SessionError::Completed);
        }
        if session.info().is_test {
            return Err(SessionError::TimedTest);
        }
        session.complete(store.snapshot().clone(), None, self.clock.now())?;
        self.cache.clear(&session.info().test_id).await?;
        Ok(())
    }

    /// Encodes the answered questions into the wire payload. Type tags come
    /// from the question list, never re-inferred from the values.
    fn build_payload(
        &self,
        session: &TestSession,
        store: &AnswerStore,
    ) -> Result<TestSubmission, SessionError> {
        let mut question_submission = BTreeMap::new();
        for (question_id, answer) in store.snapshot() {
            let kind = session
                .kind_of(question_id)
                .ok_or_else(|| SessionError::UnknownQuestion(question_id.clone()))?;
            question_submission.insert(question_id.clone(), codec::encode(kind, answer)?);
        }
        Ok(TestSubmission {
            author_mail: self.author_mail.clone(),
            class_id: session.info().class_id.clone(),
            test_id: session.info().test_id.clone(),
            question_submission,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::bootstrap::SessionBootstrapper;
    use crate::session::test_support::{MockBackend, bundle_with, timed_info};
    use quiz_core::model::{AnswerValue, ClassId, OptionId, QuestionId, TestId};
    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryCache;

    struct Fixture {
        cache: Arc<InMemoryCache>,
        backend: Arc<MockBackend>,
        gateway: SubmissionGateway,
        session: TestSession,
        store: AnswerStore,
    }

    async fn fixture(is_test: bool) -> Fixture {
        let cache = Arc::new(InMemoryCache::default());
        let mut info = timed_info();
        info.is_test = is_test;
        let bundle = bundle_with(info.clone(), None);
        let backend = Arc::new(MockBackend::new(bundle.clone()));
        let gateway = SubmissionGateway::new(
            Arc::clone(&backend) as Arc<dyn TestBackend>,
            Arc::clone(&cache) as Arc<dyn SessionCacheStore>,
            fixed_clock(),
            "student@example.com",
        );
        let session = TestSession::in_progress(
            info,
            bundle.questions.clone(),
            BTreeMap::new(),
            fixed_clock().now(),
        );
        let mut store = AnswerStore::new(
            TestId::new("t-1"),
            &bundle.questions,
            Arc::clone(&cache) as Arc<dyn SessionCacheStore>,
        );
        store
            .set(QuestionId::new("q1"), AnswerValue::single(OptionId::new("a")))
            .await
            .unwrap();
        Fixture {
            cache,
            backend,
            gateway,
            session,
            store,
        }
    }

    #[tokio::test]
    async fn successful_submit_completes_and_clears_cache() {
        let mut fx = fixture(true).await;

        let ack = fx
            .gateway
            .submit(&mut fx.session, &fx.store, SubmitTrigger::Explicit)
            .await
            .unwrap();

        assert_eq!(ack.score, Some(3.5));
        assert!(fx.session.is_done());
        assert_eq!(fx.session.score(), Some(3.5));
        assert!(fx.gateway.has_submitted());
        assert!(fx.cache.load(&TestId::new("t-1")).await.unwrap().is_empty());

        let posted = fx.backend.submissions();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].question_submission.len(), 1);
        assert_eq!(posted[0].author_mail, "student@example.com");
    }

    #[tokio::test]
    async fn second_submit_is_rejected() {
        let mut fx = fixture(true).await;

        fx.gateway
            .submit(&mut fx.session, &fx.store, SubmitTrigger::Explicit)
            .await
            .unwrap();
        let second = fx
            .gateway
            .submit(&mut fx.session, &fx.store, SubmitTrigger::Explicit)
            .await;

        assert!(matches!(second, Err(SessionError::Completed)));
        assert_eq!(fx.backend.submissions().len(), 1);
    }

    #[tokio::test]
    async fn failed_explicit_submit_allows_retry() {
        let mut fx = fixture(true).await;
        fx.backend.fail_next_submit();

        let first = fx
            .gateway
            .submit(&mut fx.session, &fx.store, SubmitTrigger::Explicit)
            .await;
        assert!(matches!(first, Err(SessionError::Backend(_))));
        assert!(!fx.session.is_done());
        assert!(!fx.gateway.has_submitted());

        // retry goes through
        fx.gateway
            .submit(&mut fx.session, &fx.store, SubmitTrigger::Explicit)
            .await
            .unwrap();
        assert!(fx.session.is_done());
        assert_eq!(fx.backend.submissions().len(), 1);
    }

    #[tokio::test]
    async fn failed_expiry_submit_freezes_locally() {
        let mut fx = fixture(true).await;
        fx.backend.fail_next_submit();

        let result = fx
            .gateway
            .submit(&mut fx.session, &fx.store, SubmitTrigger::DeadlineExpiry)
            .await;

        assert!(matches!(result, Err(SessionError::Backend(_))));
        // frozen: done with no score, guard still held
        assert!(fx.session.is_done());
        assert_eq!(fx.session.score(), None);
        assert!(fx.gateway.has_submitted());

        // the freeze is durable: the cached bundle carries a completion stamp
        let cached = fx.cache.load(&TestId::new("t-1")).await.unwrap();
        let submission = cached.bundle.unwrap().submission.unwrap();
        assert!(submission.completed_at.is_some());
        assert_eq!(submission.score, None);
        assert_eq!(submission.question_submission.len(), 1);

        let retry = fx
            .gateway
            .submit(&mut fx.session, &fx.store, SubmitTrigger::Explicit)
            .await;
        assert!(matches!(retry, Err(SessionError::Completed)));
        assert!(fx.backend.submissions().is_empty());
    }

    #[tokio::test]
    async fn failed_expiry_submit_stays_done_across_reload() {
        let mut fx = fixture(true).await;
        fx.backend.fail_next_submit();

        let result = fx
            .gateway
            .submit(&mut fx.session, &fx.store, SubmitTrigger::DeadlineExpiry)
            .await;
        assert!(matches!(result, Err(SessionError::Backend(_))));

        // reload: a fresh engine over the same durable cache must classify
        // Done without fetching or posting again
        let boot = SessionBootstrapper::new(
            Arc::clone(&fx.cache) as Arc<dyn SessionCacheStore>,
            Arc::clone(&fx.backend) as Arc<dyn TestBackend>,
            fixed_clock(),
        );
        let resolved = boot
            .resolve(&ClassId::new("c-1"), "student@example.com", &TestId::new("t-1"))
            .await
            .unwrap();

        assert!(resolved.session.is_done());
        assert!(resolved.deadline.is_none());
        assert_eq!(fx.backend.start_calls(), 0);
        assert!(fx.backend.submissions().is_empty());
        // the Done classification consumed the durable records
        assert!(fx.cache.load(&TestId::new("t-1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_test_cannot_be_submitted() {
        let mut fx = fixture(false).await;

        let result = fx
            .gateway
            .submit(&mut fx.session, &fx.store, SubmitTrigger::Explicit)
            .await;
        assert!(matches!(result, Err(SessionError::OpenTest)));
        assert!(fx.backend.submissions().is_empty());
    }

    #[tokio::test]
    async fn finish_open_closes_locally_without_a_post() {
        let mut fx = fixture(false).await;

        fx.gateway
            .finish_open(&mut fx.session, &fx.store)
            .await
            .unwrap();

        assert!(fx.session.is_done());
        assert_eq!(fx.session.score(), None);
        assert!(fx.backend.submissions().is_empty());
        assert!(fx.cache.load(&TestId::new("t-1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn finish_open_rejects_timed_tests() {
        let mut fx = fixture(true).await;

        let result = fx.gateway.finish_open(&mut fx.session, &fx.store).await;
        assert!(matches!(result, Err(SessionError::TimedTest)));
        assert!(!fx.session.is_done());
    }
}
