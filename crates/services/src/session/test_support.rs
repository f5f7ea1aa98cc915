//! Shared doubles for session unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Duration;

use quiz_core::model::{
    ChoiceOption, ClassId, OptionId, Question, QuestionId, QuestionPayload, TestId, TestInfo,
};
use quiz_core::time::fixed_now;
use quiz_core::wire::{ServerSubmission, SessionBundle, SubmitAck, TestSubmission};

use crate::error::BackendError;
use crate::remote::{StartTestRequest, TestBackend};

/// Scripted backend double that counts calls and records submissions.
pub struct MockBackend {
    bundle: SessionBundle,
    ack: SubmitAck,
    start_calls: AtomicUsize,
    fail_submit: AtomicBool,
    submissions: Mutex<Vec<TestSubmission>>,
}

impl MockBackend {
    pub fn new(bundle: SessionBundle) -> Self {
        Self {
            bundle,
            ack: SubmitAck { score: Some(3.5) },
            start_calls: AtomicUsize::new(0),
            fail_submit: AtomicBool::new(false),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_submit(&self) {
        self.fail_submit.store(true, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<TestSubmission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl TestBackend for MockBackend {
    async fn start_test(
        &self,
        _request: &StartTestRequest,
    ) -> Result<SessionBundle, BackendError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bundle.clone())
    }

    async fn submit_test(
        &self,
        submission: &TestSubmission,
    ) -> Result<SubmitAck, BackendError> {
        if self.fail_submit.swap(false, Ordering::SeqCst) {
            return Err(BackendError::HttpStatus(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        self.submissions.lock().unwrap().push(submission.clone());
        Ok(self.ack)
    }
}

/// A 60 minute timed test whose hard end sits two hours past the fixed clock.
pub fn timed_info() -> TestInfo {
    TestInfo {
        test_id: TestId::new("t-1"),
        class_id: ClassId::new("c-1"),
        title: "Unit test".to_owned(),
        duration_minutes: 60,
        hard_end: fixed_now() + Duration::hours(2),
        is_test: true,
    }
}

pub fn single_choice(id: &str) -> Question {
    Question {
        id: QuestionId::new(id),
        points: 1.0,
        prompt: String::new(),
        payload: QuestionPayload::SingleChoice {
            options: vec![
                ChoiceOption {
                    id: OptionId::new("a"),
                    text: "A".to_owned(),
                    is_correct: true,
                },
                ChoiceOption {
                    id: OptionId::new("b"),
                    text: "B".to_owned(),
                    is_correct: false,
                },
            ],
        },
    }
}

pub fn bundle_with(
    test_info: TestInfo,
    submission: Option<ServerSubmission>,
) -> SessionBundle {
    SessionBundle {
        test_info,
        questions: vec![single_choice("q1"), single_choice("q2")],
        submission,
    }
}
