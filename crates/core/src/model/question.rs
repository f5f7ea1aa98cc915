use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::{BlankId, ItemId, OptionId, QuestionId};

/// The five supported question variants, as bare type tags.
///
/// Serializes to the wire tag (`single_choice`, `multiple_choice`, `order`,
/// `fill_in_the_blank`, `match`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    Order,
    FillInTheBlank,
    Match,
}

impl QuestionKind {
    /// Returns the snake_case wire tag for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::SingleChoice => "single_choice",
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::Order => "order",
            QuestionKind::FillInTheBlank => "fill_in_the_blank",
            QuestionKind::Match => "match",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable option for choice questions.
///
/// `is_correct` is the server's canonical-answer marker, only meaningful when
/// the session is in review mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: OptionId,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// An orderable item; `correct_position` is zero-based in the canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: ItemId,
    pub text: String,
    #[serde(default)]
    pub correct_position: u32,
}

/// A fill-in slot; `correct_text` is the canonical answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blank {
    pub id: BlankId,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub correct_text: String,
}

/// A drop target for match questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchItem {
    pub id: ItemId,
    pub text: String,
}

/// A draggable option for match questions.
///
/// `match_id` is the canonical target item, or `None` when the option is a
/// distractor that belongs to no item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOption {
    pub id: OptionId,
    pub text: String,
    #[serde(default)]
    pub match_id: Option<ItemId>,
}

/// Type-specific question payload.
///
/// Exactly one type tag selects exactly one payload shape; the serde tag makes
/// a question structurally unambiguous on the wire and adding a new kind a
/// compile error everywhere the union is matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionPayload {
    SingleChoice { options: Vec<ChoiceOption> },
    MultipleChoice { options: Vec<ChoiceOption> },
    Order { items: Vec<OrderItem> },
    FillInTheBlank { blanks: Vec<Blank> },
    Match { items: Vec<MatchItem>, options: Vec<MatchOption> },
}

impl QuestionPayload {
    /// Returns the type tag of this payload.
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionPayload::SingleChoice { .. } => QuestionKind::SingleChoice,
            QuestionPayload::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            QuestionPayload::Order { .. } => QuestionKind::Order,
            QuestionPayload::FillInTheBlank { .. } => QuestionKind::FillInTheBlank,
            QuestionPayload::Match { .. } => QuestionKind::Match,
        }
    }
}

/// Immutable, server-supplied question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub prompt: String,
    #[serde(flatten)]
    pub payload: QuestionPayload,
}

impl Question {
    /// Returns the type tag of this question.
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.payload.kind()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
