//! HTTP access to the test server.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use quiz_core::model::{ClassId, TestId};
use quiz_core::wire::{SessionBundle, SubmitAck, TestSubmission};

use crate::error::BackendError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Identifies the (class, student, test) triple a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartTestRequest {
    pub author_mail: String,
    pub class_id: ClassId,
    pub test_id: TestId,
}

/// Server operations the session engine relies on.
///
/// Object safe so engines can run against an HTTP server in the app and a
/// scripted double in tests.
#[async_trait]
pub trait TestBackend: Send + Sync {
    /// Fetches test metadata, the question list, and any submission the
    /// server already holds for this student.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the server rejects it.
    async fn start_test(&self, request: &StartTestRequest)
    -> Result<SessionBundle, BackendError>;

    /// Posts the final answer set and returns the server acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the server rejects it.
    async fn submit_test(&self, submission: &TestSubmission)
    -> Result<SubmitAck, BackendError>;
}

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
}

impl BackendConfig {
    /// Reads the server base url from `QUIZ_API_URL`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("QUIZ_API_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self { base_url })
    }
}

/// [`TestBackend`] implementation backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    /// Builds a client with a bounded request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying client cannot be constructed.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl TestBackend for HttpBackend {
    async fn start_test(
        &self,
        request: &StartTestRequest,
    ) -> Result<SessionBundle, BackendError> {
        let url = self.endpoint(&format!("tests/{}/start", request.test_id.as_str()));
        let response = self.client.post(url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::HttpStatus(response.status()));
        }
        Ok(response.json::<SessionBundle>().await?)
    }

    async fn submit_test(
        &self,
        submission: &TestSubmission,
    ) -> Result<SubmitAck, BackendError> {
        let url = self.endpoint(&format!(
            "tests/{}/submissions",
            submission.test_id.as_str()
        ));
        let response = self.client.post(url).json(submission).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::HttpStatus(response.status()));
        }
        Ok(response.json::<SubmitAck>().await?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
