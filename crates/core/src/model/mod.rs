mod answer;
mod ids;
mod question;
mod session;

pub use answer::AnswerValue;
pub use ids::{BlankId, ClassId, ItemId, OptionId, QuestionId, TestId};
pub use question::{
    Blank, ChoiceOption, MatchItem, MatchOption, OrderItem, Question, QuestionKind,
    QuestionPayload,
};
pub use session::{SessionState, SessionStateError, TestInfo, TestSession};

pub(crate) use answer::{assign_option, remove_option};
