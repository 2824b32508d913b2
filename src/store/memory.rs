// src/store/memory.rs

use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{QuestionRepository, RepositoryError, ResultStore, StoreError};
use crate::models::{
    question::Question,
    test_result::{ProfileUpdate, TestResult},
};

/// Fixed question bank held in memory.
#[derive(Default)]
pub struct InMemoryQuestionBank {
    questions: Mutex<Vec<Question>>,
    unavailable: AtomicBool,
}

impl InMemoryQuestionBank {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions: Mutex::new(questions),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn replace(&self, questions: Vec<Question>) {
        if let Ok(mut guard) = self.questions.lock() {
            *guard = questions;
        }
    }

    /// Makes subsequent fetches fail, as if the backing store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionBank {
    async fn fetch_all(&self) -> Result<Vec<Question>, RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError("question bank offline".to_string()));
        }
        self.questions
            .lock()
            .map(|q| q.clone())
            .map_err(|e| RepositoryError(e.to_string()))
    }
}

/// Result store that keeps the latest result and aptitude score per student.
///
/// Counts write attempts, failed ones included.
#[derive(Default)]
pub struct InMemoryResultStore {
    results: DashMap<i64, TestResult>,
    profiles: DashMap<i64, ProfileUpdate>,
    result_writes: AtomicUsize,
    profile_writes: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every write fails with a `StoreError`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn result_writes(&self) -> usize {
        self.result_writes.load(Ordering::SeqCst)
    }

    pub fn profile_writes(&self) -> usize {
        self.profile_writes.load(Ordering::SeqCst)
    }

    pub fn profile(&self, student_id: i64) -> Option<ProfileUpdate> {
        self.profiles.get(&student_id).map(|p| *p)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError("result store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn put_result(&self, student_id: i64, result: &TestResult) -> Result<(), StoreError> {
        self.result_writes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.results.insert(student_id, result.clone());
        Ok(())
    }

    async fn merge_profile(&self, student_id: i64, update: ProfileUpdate) -> Result<(), StoreError> {
        self.profile_writes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.profiles.insert(student_id, update);
        Ok(())
    }

    async fn fetch_result(&self, student_id: i64) -> Result<Option<TestResult>, StoreError> {
        Ok(self.results.get(&student_id).map(|r| r.clone()))
    }
}
