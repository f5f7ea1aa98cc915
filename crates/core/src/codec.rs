//! Conversions between the three answer shapes.
//!
//! Each question kind has an encode/decode pair between the normalized
//! [`AnswerValue`] and the wire [`QuestionSubmission`], plus an edit
//! application step that folds raw widget events into the normalized shape.
//! Every function is a total match over the unions, so adding a question kind
//! without handling it everywhere is a compile error.

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::{
    AnswerValue, BlankId, ItemId, OptionId, Question, QuestionKind, QuestionPayload,
    assign_option, remove_option,
};
use crate::wire::{BlankSubmission, MatchOptionRef, MatchSubmission, QuestionSubmission};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    #[error("answer type {found} does not match question type {expected}")]
    KindMismatch {
        expected: QuestionKind,
        found: QuestionKind,
    },

    #[error("{kind} answer is empty and cannot be submitted")]
    Empty { kind: QuestionKind },

    #[error("single choice submission carries {len} selections")]
    MalformedSingleChoice { len: usize },

    #[error("question embeds no canonical {kind} answer")]
    MissingCanonicalAnswer { kind: QuestionKind },
}

/// Type-tag consistency check between a question and a candidate answer.
#[must_use]
pub fn matches(kind: QuestionKind, answer: &AnswerValue) -> bool {
    answer.kind() == kind
}

/// Encodes a normalized answer into its wire submission shape.
///
/// # Errors
///
/// Returns `CodecError::KindMismatch` when the answer's tag disagrees with
/// the question kind, and `CodecError::Empty` for answers with no
/// submittable content.
pub fn encode(kind: QuestionKind, answer: &AnswerValue) -> Result<QuestionSubmission, CodecError> {
    if !matches(kind, answer) {
        return Err(CodecError::KindMismatch {
            expected: kind,
            found: answer.kind(),
        });
    }
    if answer.is_empty() {
        return Err(CodecError::Empty { kind });
    }

    let submission = match answer {
        AnswerValue::SingleChoice { selected } => {
            QuestionSubmission::SingleChoice(vec![selected.clone()])
        }
        AnswerValue::MultipleChoice { selected } => {
            QuestionSubmission::MultipleChoice(selected.iter().cloned().collect())
        }
        AnswerValue::Order { sequence } => QuestionSubmission::Order(sequence.clone()),
        AnswerValue::FillInTheBlank { blanks } => QuestionSubmission::FillInTheBlank(
            blanks
                .iter()
                .map(|(id, text)| BlankSubmission {
                    id: id.clone(),
                    correct_submission: text.clone(),
                })
                .collect(),
        ),
        AnswerValue::Match { assignments } => {
            QuestionSubmission::Match(to_match_submission(assignments))
        }
    };
    Ok(submission)
}

/// The wire match shape carries the assignment map twice: as the map itself
/// and as per-option back-references, recomputed here from the map.
fn to_match_submission(assignments: &BTreeMap<ItemId, Vec<OptionId>>) -> MatchSubmission {
    let mut options: Vec<MatchOptionRef> = assignments
        .iter()
        .flat_map(|(item, assigned)| {
            assigned.iter().map(|option| MatchOptionRef {
                id: option.clone(),
                match_id: Some(item.clone()),
            })
        })
        .collect();
    options.sort_by(|a, b| a.id.cmp(&b.id));

    MatchSubmission {
        assignments: assignments.clone(),
        options,
    }
}

/// Decodes a wire submission back into the normalized answer shape.
///
/// The assignment map is authoritative for match answers; the per-option
/// back-references are redundant and ignored.
///
/// # Errors
///
/// Returns `CodecError::KindMismatch` when the submission's tag disagrees
/// with the question kind, `CodecError::MalformedSingleChoice` when a single
/// choice list is not a singleton, and `CodecError::Empty` for contentless
/// submissions.
pub fn decode(
    kind: QuestionKind,
    submission: &QuestionSubmission,
) -> Result<AnswerValue, CodecError> {
    if submission.kind() != kind {
        return Err(CodecError::KindMismatch {
            expected: kind,
            found: submission.kind(),
        });
    }

    let answer = match submission {
        QuestionSubmission::SingleChoice(selected) => match selected.as_slice() {
            [only] => AnswerValue::single(only.clone()),
            [] => return Err(CodecError::Empty { kind }),
            many => {
                return Err(CodecError::MalformedSingleChoice { len: many.len() });
            }
        },
        QuestionSubmission::MultipleChoice(selected) => {
            AnswerValue::multiple(selected.iter().cloned())
        }
        QuestionSubmission::Order(sequence) => AnswerValue::order(sequence.iter().cloned()),
        QuestionSubmission::FillInTheBlank(blanks) => AnswerValue::blanks(
            blanks
                .iter()
                .map(|blank| (blank.id.clone(), blank.correct_submission.clone())),
        ),
        QuestionSubmission::Match(submission) => AnswerValue::matches(
            submission
                .assignments
                .iter()
                .filter(|(_, options)| !options.is_empty())
                .map(|(item, options)| (item.clone(), options.clone())),
        ),
    };

    if answer.is_empty() {
        return Err(CodecError::Empty { kind });
    }
    Ok(answer)
}

/// Review mode: decodes the question's embedded correct-answer fields into
/// the normalized shape, so the same rendering path can display either the
/// student's answer or the canonical one.
///
/// # Errors
///
/// Returns `CodecError::MissingCanonicalAnswer` when the question carries no
/// canonical answer (e.g. a choice question with nothing marked correct).
pub fn decode_correct(question: &Question) -> Result<AnswerValue, CodecError> {
    let kind = question.kind();
    let answer = match &question.payload {
        QuestionPayload::SingleChoice { options } => {
            let selected = options
                .iter()
                .find(|option| option.is_correct)
                .ok_or(CodecError::MissingCanonicalAnswer { kind })?;
            AnswerValue::single(selected.id.clone())
        }
        QuestionPayload::MultipleChoice { options } => {
            let selected: BTreeSet<OptionId> = options
                .iter()
                .filter(|option| option.is_correct)
                .map(|option| option.id.clone())
                .collect();
            AnswerValue::MultipleChoice { selected }
        }
        QuestionPayload::Order { items } => {
            let mut ordered: Vec<_> = items.iter().collect();
            ordered.sort_by_key(|item| item.correct_position);
            AnswerValue::order(ordered.into_iter().map(|item| item.id.clone()))
        }
        QuestionPayload::FillInTheBlank { blanks } => AnswerValue::blanks(
            blanks
                .iter()
                .map(|blank| (blank.id.clone(), blank.correct_text.clone())),
        ),
        QuestionPayload::Match { options, .. } => {
            let mut assignments: BTreeMap<ItemId, Vec<OptionId>> = BTreeMap::new();
            for option in options {
                if let Some(item) = &option.match_id {
                    assignments
                        .entry(item.clone())
                        .or_default()
                        .push(option.id.clone());
                }
            }
            AnswerValue::Match { assignments }
        }
    };

    if answer.is_empty() {
        return Err(CodecError::MissingCanonicalAnswer { kind });
    }
    Ok(answer)
}

//
// ─── EDITS ─────────────────────────────────────────────────────────────────────
//

/// A raw UI edit event, one variant per widget interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerEdit {
    /// Radio selection; re-selecting the current option is an idempotent
    /// replace.
    SelectOption(OptionId),
    /// Checkbox toggle: adds when absent, removes when present.
    ToggleOption(OptionId),
    /// Per-blank text input; empty text clears the blank.
    SetBlank(BlankId, String),
    /// Drag-reorder result: the full new permutation of item ids.
    Reorder(Vec<ItemId>),
    /// Drag of an option onto a match item.
    AssignMatch { item: ItemId, option: OptionId },
    /// Drag of an option out of all match items.
    UnassignMatch(OptionId),
}

impl AnswerEdit {
    /// The question kind this edit applies to.
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            AnswerEdit::SelectOption(_) => QuestionKind::SingleChoice,
            AnswerEdit::ToggleOption(_) => QuestionKind::MultipleChoice,
            AnswerEdit::SetBlank(..) => QuestionKind::FillInTheBlank,
            AnswerEdit::Reorder(_) => QuestionKind::Order,
            AnswerEdit::AssignMatch { .. } | AnswerEdit::UnassignMatch(_) => QuestionKind::Match,
        }
    }
}

/// Folds a UI edit into the current normalized answer for a question.
///
/// Returns `None` when the edit leaves the answer with no content (last
/// checkbox unticked, last blank cleared, last match option dragged out), so
/// callers drop the entry instead of storing an empty placeholder.
///
/// # Errors
///
/// Returns `CodecError::KindMismatch` when the edit or the existing answer
/// does not belong to the question's kind.
pub fn apply_edit(
    kind: QuestionKind,
    current: Option<AnswerValue>,
    edit: AnswerEdit,
) -> Result<Option<AnswerValue>, CodecError> {
    if edit.kind() != kind {
        return Err(CodecError::KindMismatch {
            expected: kind,
            found: edit.kind(),
        });
    }
    if let Some(existing) = &current
        && !matches(kind, existing)
    {
        return Err(CodecError::KindMismatch {
            expected: kind,
            found: existing.kind(),
        });
    }

    let next = match edit {
        AnswerEdit::SelectOption(option) => Some(AnswerValue::single(option)),
        AnswerEdit::ToggleOption(option) => {
            let mut selected = match current {
                Some(AnswerValue::MultipleChoice { selected }) => selected,
                _ => BTreeSet::new(),
            };
            if !selected.remove(&option) {
                selected.insert(option);
            }
            if selected.is_empty() {
                None
            } else {
                Some(AnswerValue::MultipleChoice { selected })
            }
        }
        AnswerEdit::SetBlank(blank, text) => {
            let mut blanks = match current {
                Some(AnswerValue::FillInTheBlank { blanks }) => blanks,
                _ => BTreeMap::new(),
            };
            if text.trim().is_empty() {
                blanks.remove(&blank);
            } else {
                blanks.insert(blank, text);
            }
            if blanks.is_empty() {
                None
            } else {
                Some(AnswerValue::FillInTheBlank { blanks })
            }
        }
        AnswerEdit::Reorder(sequence) => {
            if sequence.is_empty() {
                None
            } else {
                Some(AnswerValue::Order { sequence })
            }
        }
        AnswerEdit::AssignMatch { item, option } => {
            let mut assignments = match current {
                Some(AnswerValue::Match { assignments }) => assignments,
                _ => BTreeMap::new(),
            };
            assign_option(&mut assignments, &item, option);
            Some(AnswerValue::Match { assignments })
        }
        AnswerEdit::UnassignMatch(option) => {
            let mut assignments = match current {
                Some(AnswerValue::Match { assignments }) => assignments,
                _ => BTreeMap::new(),
            };
            remove_option(&mut assignments, &option);
            if assignments.is_empty() {
                None
            } else {
                Some(AnswerValue::Match { assignments })
            }
        }
    };
    Ok(next)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
