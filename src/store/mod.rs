//! Collaborators consumed by the test session engine.
//!
//! The engine only reads the question bank and writes results through these
//! traits; `postgres` backs them with sqlx, `memory` keeps everything in process.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    question::Question,
    test_result::{ProfileUpdate, TestResult},
};

pub use memory::{InMemoryQuestionBank, InMemoryResultStore};
pub use postgres::{PgQuestionRepository, PgResultStore};

/// The question bank could not be read.
#[derive(Debug, Error)]
#[error("question bank unavailable: {0}")]
pub struct RepositoryError(pub String);

/// A result or profile write (or read) failed.
#[derive(Debug, Error)]
#[error("result store failure: {0}")]
pub struct StoreError(pub String);

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError(err.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError(err.to_string())
    }
}

/// Read-only access to the full question bank.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Returns every valid question. No filtering is pushed down.
    async fn fetch_all(&self) -> Result<Vec<Question>, RepositoryError>;
}

/// Persistence of submitted results and the student profile aggregate.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Stores the result under the student id, replacing any previous one.
    async fn put_result(&self, student_id: i64, result: &TestResult) -> Result<(), StoreError>;

    /// Merges the update into the student's profile, creating it if missing.
    async fn merge_profile(&self, student_id: i64, update: ProfileUpdate) -> Result<(), StoreError>;

    /// Latest stored result for the student, if any.
    async fn fetch_result(&self, student_id: i64) -> Result<Option<TestResult>, StoreError>;
}
