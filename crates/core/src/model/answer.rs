use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::ids::{BlankId, ItemId, OptionId};
use crate::model::question::QuestionKind;

/// Normalized student answer, one variant per question kind.
///
/// This is the storage/display-ready shape: distinct from the raw widget
/// state the UI produces and from the wire submission format. The variant tag
/// always agrees with the answered question's kind; `crate::codec` enforces
/// the pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerValue {
    SingleChoice {
        selected: OptionId,
    },
    MultipleChoice {
        selected: BTreeSet<OptionId>,
    },
    /// The student's proposed order, as a permutation of the item ids.
    Order {
        sequence: Vec<ItemId>,
    },
    FillInTheBlank {
        blanks: BTreeMap<BlankId, String>,
    },
    /// Item -> assigned options. An option appears under at most one item;
    /// items with no options are absent from the map, never mapped to an
    /// empty sentinel.
    Match {
        assignments: BTreeMap<ItemId, Vec<OptionId>>,
    },
}

impl AnswerValue {
    /// Returns the type tag of this answer.
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            AnswerValue::SingleChoice { .. } => QuestionKind::SingleChoice,
            AnswerValue::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            AnswerValue::Order { .. } => QuestionKind::Order,
            AnswerValue::FillInTheBlank { .. } => QuestionKind::FillInTheBlank,
            AnswerValue::Match { .. } => QuestionKind::Match,
        }
    }

    /// Returns true when the answer carries no submittable content.
    ///
    /// Empty answers do not count towards progress and are rejected by the
    /// wire encoder; stores drop them instead of persisting placeholders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::SingleChoice { .. } => false,
            AnswerValue::MultipleChoice { selected } => selected.is_empty(),
            AnswerValue::Order { sequence } => sequence.is_empty(),
            AnswerValue::FillInTheBlank { blanks } => {
                blanks.values().all(|text| text.trim().is_empty())
            }
            AnswerValue::Match { assignments } => {
                assignments.values().all(Vec::is_empty)
            }
        }
    }

    #[must_use]
    pub fn single(selected: OptionId) -> Self {
        AnswerValue::SingleChoice { selected }
    }

    #[must_use]
    pub fn multiple(selected: impl IntoIterator<Item = OptionId>) -> Self {
        AnswerValue::MultipleChoice {
            selected: selected.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn order(sequence: impl IntoIterator<Item = ItemId>) -> Self {
        AnswerValue::Order {
            sequence: sequence.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn blanks(entries: impl IntoIterator<Item = (BlankId, String)>) -> Self {
        AnswerValue::FillInTheBlank {
            blanks: entries.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn matches(assignments: impl IntoIterator<Item = (ItemId, Vec<OptionId>)>) -> Self {
        AnswerValue::Match {
            assignments: assignments.into_iter().collect(),
        }
    }
}

/// Moves `option` under `item`, removing it from every other item first.
///
/// Keeps the exclusivity invariant: an option belongs to at most one item at
/// a time.
pub(crate) fn assign_option(
    assignments: &mut BTreeMap<ItemId, Vec<OptionId>>,
    item: &ItemId,
    option: OptionId,
) {
    remove_option(assignments, &option);
    assignments.entry(item.clone()).or_default().push(option);
}

/// Removes `option` from whichever item holds it, dropping items left empty.
pub(crate) fn remove_option(
    assignments: &mut BTreeMap<ItemId, Vec<OptionId>>,
    option: &OptionId,
) {
    for options in assignments.values_mut() {
        options.retain(|candidate| candidate != option);
    }
    assignments.retain(|_, options| !options.is_empty());
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
