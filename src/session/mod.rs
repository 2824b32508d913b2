//! Timed aptitude-test sessions.
//!
//! [`TestSession`] is the synchronous state machine for one attempt
//! (`NotStarted -> Running -> Submitted`). [`ActiveSession`] wraps it with the
//! one-second countdown task and result persistence, and [`SessionRegistry`]
//! keeps the live attempt of every student.

pub mod engine;
pub mod question_set;
pub mod runner;
pub mod scoring;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::store::{RepositoryError, StoreError};

pub use engine::{Submission, TestSession, TickOutcome};
pub use question_set::assemble_question_set;
pub use runner::{ActiveSession, SessionRegistry, SessionView};
pub use scoring::{compute_score, correct_answers_from_score, count_correct};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    Running,
    Submitted,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::NotStarted => "not started",
            SessionStatus::Running => "running",
            SessionStatus::Submitted => "submitted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// An operation was invoked outside the status it is valid in.
    /// The session is left untouched.
    #[error("cannot {operation} while the test is {status}")]
    InvalidTransition {
        operation: &'static str,
        status: SessionStatus,
    },

    #[error("no questions are available for the aptitude test")]
    EmptyQuestionSet,

    #[error("question index {index} is out of range (test has {len} questions)")]
    QuestionOutOfRange { index: usize, len: usize },

    #[error("option index {0} is out of range")]
    OptionOutOfRange(usize),

    /// The previous attempt was submitted but its result is not saved yet.
    #[error("the previous test result has not been saved yet; retry saving it first")]
    UnsavedResult,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The result was computed but could not be saved; it can be re-sent.
    #[error(transparent)]
    Store(#[from] StoreError),
}
