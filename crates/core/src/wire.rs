//! Wire shapes exchanged with the test backend.
//!
//! These structs are serde-faithful to the REST contract: the start-test
//! response (`SessionBundle`) and the submission payload (`TestSubmission`).
//! The durable cache persists `SessionBundle` verbatim so a reload can
//! rebuild the session without another fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{
    BlankId, ClassId, ItemId, OptionId, Question, QuestionId, QuestionKind, TestId, TestInfo,
};

/// One blank's submitted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlankSubmission {
    pub id: BlankId,
    pub correct_submission: String,
}

/// Back-reference from a match option to the item the student assigned it to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOptionRef {
    pub id: OptionId,
    #[serde(default)]
    pub match_id: Option<ItemId>,
}

/// Match answer on the wire: the assignment map plus per-option
/// back-references recomputed from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSubmission {
    #[serde(default)]
    pub assignments: BTreeMap<ItemId, Vec<OptionId>>,
    #[serde(default)]
    pub options: Vec<MatchOptionRef>,
}

/// Per-question wire submission: `{ "type": ..., "submission": ... }`.
///
/// Adjacently tagged so each type tag selects exactly one payload shape;
/// single choice is a one-element option list by contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "submission", rename_all = "snake_case")]
pub enum QuestionSubmission {
    SingleChoice(Vec<OptionId>),
    MultipleChoice(Vec<OptionId>),
    Order(Vec<ItemId>),
    FillInTheBlank(Vec<BlankSubmission>),
    Match(MatchSubmission),
}

impl QuestionSubmission {
    /// Returns the type tag of this submission.
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionSubmission::SingleChoice(_) => QuestionKind::SingleChoice,
            QuestionSubmission::MultipleChoice(_) => QuestionKind::MultipleChoice,
            QuestionSubmission::Order(_) => QuestionKind::Order,
            QuestionSubmission::FillInTheBlank(_) => QuestionKind::FillInTheBlank,
            QuestionSubmission::Match(_) => QuestionKind::Match,
        }
    }
}

/// The finalized payload posted exactly once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSubmission {
    pub author_mail: String,
    pub class_id: ClassId,
    pub test_id: TestId,
    pub question_submission: BTreeMap<QuestionId, QuestionSubmission>,
}

/// The server's record of an existing session for this (test, student) pair.
///
/// `started_at` without `completed_at` means in progress; `completed_at`
/// (and usually `score`) means the session is closed on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSubmission {
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub question_submission: BTreeMap<QuestionId, QuestionSubmission>,
}

/// Start-test response body, and the durable cache's bundle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBundle {
    pub test_info: TestInfo,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub submission: Option<ServerSubmission>,
}

/// Acknowledgement of a final submit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitAck {
    #[serde(default)]
    pub score: Option<f64>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
