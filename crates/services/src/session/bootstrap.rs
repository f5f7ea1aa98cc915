//! Session resolution: cache restore, server fetch, and state classification.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use quiz_core::Clock;
use quiz_core::codec;
use quiz_core::deadline::compute_deadline;
use quiz_core::model::{ClassId, Question, QuestionId, TestId, TestSession};
use quiz_core::wire::{QuestionSubmission, SessionBundle};
use storage::repository::{AnswerMap, SessionCacheStore};

use crate::error::SessionError;
use crate::remote::{StartTestRequest, TestBackend};

/// A classified session plus, for timed in-progress sessions, the effective
/// cutoff that drives the countdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSession {
    pub session: TestSession,
    pub deadline: Option<DateTime<Utc>>,
}

/// Opens or resumes a test session.
///
/// The cached bundle is authoritative while present: a reload mid-session
/// performs zero network fetches. Only when the cache holds no bundle does
/// the bootstrapper call the server, and it persists what it fetched before
/// classifying.
pub struct SessionBootstrapper {
    cache: Arc<dyn SessionCacheStore>,
    backend: Arc<dyn TestBackend>,
    clock: Clock,
}

impl SessionBootstrapper {
    #[must_use]
    pub fn new(
        cache: Arc<dyn SessionCacheStore>,
        backend: Arc<dyn TestBackend>,
        clock: Clock,
    ) -> Self {
        Self {
            cache,
            backend,
            clock,
        }
    }

    /// Resolves the session for one (class, student, test) triple.
    ///
    /// # Errors
    ///
    /// Fails when the cache is unreadable, the server fetch fails, or a
    /// cache write fails while recording the fresh session.
    pub async fn resolve(
        &self,
        class_id: &ClassId,
        author_mail: &str,
        test_id: &TestId,
    ) -> Result<ResolvedSession, SessionError> {
        let cached = self.cache.load(test_id).await?;
        let bundle = match cached.bundle.clone() {
            Some(bundle) => bundle,
            None => {
                let request = StartTestRequest {
                    author_mail: author_mail.to_owned(),
                    class_id: class_id.clone(),
                    test_id: test_id.clone(),
                };
                let bundle = self.backend.start_test(&request).await?;
                self.cache.save_bundle(test_id, &bundle).await?;
                bundle
            }
        };
        self.classify(test_id, bundle, cached.answers, cached.started_at)
            .await
    }

    async fn classify(
        &self,
        test_id: &TestId,
        bundle: SessionBundle,
        cached_answers: Option<AnswerMap>,
        cached_start: Option<DateTime<Utc>>,
    ) -> Result<ResolvedSession, SessionError> {
        let SessionBundle {
            test_info,
            questions,
            submission,
        } = bundle;

        // the server already holds a completed submission: frozen review
        // state, no countdown, and the durable records are spent
        if let Some(server) = &submission
            && server.completed_at.is_some()
        {
            let answers = decode_wire_answers(&questions, &server.question_submission);
            let session = TestSession::done(
                test_info,
                questions,
                answers,
                server.completed_at,
                server.score,
            );
            self.cache.clear(test_id).await?;
            return Ok(ResolvedSession {
                session,
                deadline: None,
            });
        }

        // a recorded start pins the deadline across reloads; absent any
        // record this is a fresh session starting now
        let recorded_start = submission
            .as_ref()
            .and_then(|server| server.started_at)
            .or(cached_start);
        let started_at = recorded_start.unwrap_or_else(|| self.clock.now());

        let mut answers = submission
            .as_ref()
            .map(|server| decode_wire_answers(&questions, &server.question_submission))
            .unwrap_or_default();
        if let Some(local) = cached_answers {
            // local keystrokes are newer than any server snapshot
            for (question_id, answer) in local {
                answers.insert(question_id, answer);
            }
        }

        let deadline = test_info.is_test.then(|| {
            compute_deadline(started_at, test_info.duration_minutes, test_info.hard_end)
        });

        if cached_start.is_none() {
            self.cache.save_started_at(test_id, started_at).await?;
            if let Some(deadline) = deadline {
                self.cache.save_deadline(test_id, deadline).await?;
            }
        }

        let session = TestSession::in_progress(test_info, questions, answers, started_at);
        Ok(ResolvedSession { session, deadline })
    }
}

/// Best-effort restore of a server answer snapshot. Entries that no longer
/// match a question, or that fail to decode, are dropped rather than failing
/// the whole resume.
fn decode_wire_answers(
    questions: &[Question],
    wire: &BTreeMap<QuestionId, QuestionSubmission>,
) -> AnswerMap {
    let mut answers = AnswerMap::new();
    for (question_id, submission) in wire {
        let Some(kind) = questions
            .iter()
            .find(|question| &question.id == question_id)
            .map(Question::kind)
        else {
            continue;
        };
        if let Ok(answer) = codec::decode(kind, submission) {
            answers.insert(question_id.clone(), answer);
        }
    }
    answers
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::{MockBackend, bundle_with, single_choice, timed_info};
    use chrono::Duration;
    use quiz_core::model::{AnswerValue, OptionId};
    use quiz_core::time::{fixed_clock, fixed_now};
    use quiz_core::wire::ServerSubmission;
    use storage::repository::InMemoryCache;

    fn bootstrapper(
        cache: &Arc<InMemoryCache>,
        backend: &Arc<MockBackend>,
        clock: Clock,
    ) -> SessionBootstrapper {
        SessionBootstrapper::new(
            Arc::clone(cache) as Arc<dyn SessionCacheStore>,
            Arc::clone(backend) as Arc<dyn TestBackend>,
            clock,
        )
    }

    #[tokio::test]
    async fn fresh_session_fetches_once_and_records_start() {
        let cache = Arc::new(InMemoryCache::default());
        let backend = Arc::new(MockBackend::new(bundle_with(timed_info(), None)));
        let clock = fixed_clock();
        let boot = bootstrapper(&cache, &backend, clock);

        let resolved = boot
            .resolve(&ClassId::new("c-1"), "student@example.com", &TestId::new("t-1"))
            .await
            .unwrap();

        assert_eq!(backend.start_calls(), 1);
        assert!(!resolved.session.is_done());
        assert_eq!(resolved.session.started_at(), Some(clock.now()));
        assert!(resolved.deadline.is_some());

        let cached = cache.load(&TestId::new("t-1")).await.unwrap();
        assert!(cached.bundle.is_some());
        assert_eq!(cached.started_at, Some(clock.now()));
        assert_eq!(cached.deadline, resolved.deadline);
    }

    #[tokio::test]
    async fn cached_bundle_resolves_with_zero_fetches() {
        let cache = Arc::new(InMemoryCache::default());
        let backend = Arc::new(MockBackend::new(bundle_with(timed_info(), None)));
        let clock = fixed_clock();
        let boot = bootstrapper(&cache, &backend, clock);
        let class = ClassId::new("c-1");
        let test = TestId::new("t-1");

        boot.resolve(&class, "student@example.com", &test).await.unwrap();
        // reload: same cache, same engine
        let resolved = boot.resolve(&class, "student@example.com", &test).await.unwrap();

        assert_eq!(backend.start_calls(), 1);
        assert_eq!(resolved.session.started_at(), Some(clock.now()));
    }

    #[tokio::test]
    async fn server_completed_submission_resolves_done_and_clears_cache() {
        let cache = Arc::new(InMemoryCache::default());
        let completed = ServerSubmission {
            started_at: Some(fixed_now() - Duration::hours(1)),
            completed_at: Some(fixed_now() - Duration::minutes(30)),
            score: Some(4.0),
            question_submission: BTreeMap::new(),
        };
        let backend = Arc::new(MockBackend::new(bundle_with(
            timed_info(),
            Some(completed),
        )));
        let boot = bootstrapper(&cache, &backend, fixed_clock());
        let test = TestId::new("t-1");

        let resolved = boot
            .resolve(&ClassId::new("c-1"), "student@example.com", &test)
            .await
            .unwrap();

        assert!(resolved.session.is_done());
        assert_eq!(resolved.session.score(), Some(4.0));
        assert!(resolved.deadline.is_none());
        assert!(cache.load(&test).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn local_answers_override_the_server_snapshot() {
        let cache = Arc::new(InMemoryCache::default());
        let q1 = QuestionId::new("q1");
        let mut wire = BTreeMap::new();
        wire.insert(
            q1.clone(),
            codec::encode(
                quiz_core::model::QuestionKind::SingleChoice,
                &AnswerValue::single(OptionId::new("a")),
            )
            .unwrap(),
        );
        let server_start = fixed_now() - Duration::minutes(10);
        let in_progress = ServerSubmission {
            started_at: Some(server_start),
            completed_at: None,
            score: None,
            question_submission: wire,
        };
        let backend = Arc::new(MockBackend::new(bundle_with(
            timed_info(),
            Some(in_progress),
        )));
        let test = TestId::new("t-1");

        // the durable cache holds a newer local keystroke for q1
        let mut local = AnswerMap::new();
        local.insert(q1.clone(), AnswerValue::single(OptionId::new("b")));
        cache.save_answers(&test, &local).await.unwrap();

        let boot = bootstrapper(&cache, &backend, fixed_clock());
        let resolved = boot
            .resolve(&ClassId::new("c-1"), "student@example.com", &test)
            .await
            .unwrap();

        assert_eq!(
            resolved.session.answer(&q1),
            Some(&AnswerValue::single(OptionId::new("b")))
        );
        // the server-recorded start still pins the deadline
        assert_eq!(resolved.session.started_at(), Some(server_start));
    }

    #[tokio::test]
    async fn untimed_session_resolves_without_deadline() {
        let cache = Arc::new(InMemoryCache::default());
        let mut info = timed_info();
        info.is_test = false;
        let backend = Arc::new(MockBackend::new(bundle_with(info, None)));
        let boot = bootstrapper(&cache, &backend, fixed_clock());

        let resolved = boot
            .resolve(&ClassId::new("c-1"), "student@example.com", &TestId::new("t-1"))
            .await
            .unwrap();

        assert!(resolved.deadline.is_none());
        assert!(!resolved.session.is_done());
        // the start is still recorded so a reload resumes consistently
        let cached = cache.load(&TestId::new("t-1")).await.unwrap();
        assert!(cached.started_at.is_some());
        assert!(cached.deadline.is_none());
    }

    #[test]
    fn wire_answers_skip_undecodable_entries() {
        let questions = vec![single_choice("q1")];
        let mut wire = BTreeMap::new();
        wire.insert(
            QuestionId::new("q1"),
            QuestionSubmission::SingleChoice(vec![]),
        );
        wire.insert(
            QuestionId::new("ghost"),
            QuestionSubmission::SingleChoice(vec![OptionId::new("a")]),
        );
        assert!(decode_wire_answers(&questions, &wire).is_empty());
    }
}
