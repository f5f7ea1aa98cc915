//! The test-taking session engine.
//!
//! [`SessionBootstrapper`] opens or resumes a session, [`AnswerStore`] holds
//! answers with write-through persistence, [`DeadlineClock`] drives the
//! countdown for timed tests, and [`SubmissionGateway`] performs the
//! exactly-once final submit.

mod answer_store;
mod bootstrap;
mod clock;
mod gateway;
mod navigator;
mod progress;

#[cfg(test)]
pub(crate) mod test_support;

pub use answer_store::{AnswerStore, SaveStatus};
pub use bootstrap::{ResolvedSession, SessionBootstrapper};
pub use clock::{DeadlineClock, TICK_PERIOD};
pub use gateway::{SubmissionGateway, SubmitTrigger};
pub use navigator::QuestionNavigator;
pub use progress::SessionProgress;
