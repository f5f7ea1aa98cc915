#![forbid(unsafe_code)]

pub mod error;
pub mod remote;
pub mod session;

pub use quiz_core::Clock;

pub use error::{BackendError, SessionError};
pub use remote::{BackendConfig, HttpBackend, StartTestRequest, TestBackend};

pub use session::{
    AnswerStore, DeadlineClock, QuestionNavigator, ResolvedSession, SaveStatus,
    SessionBootstrapper, SessionProgress, SubmissionGateway, SubmitTrigger, TICK_PERIOD,
};
