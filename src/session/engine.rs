// src/session/engine.rs

use std::collections::BTreeMap;

use chrono::Utc;

use super::{
    SessionError, SessionStatus,
    scoring::{compute_score, correct_answers_from_score},
};
use crate::models::{
    question::{OPTION_COUNT, Question},
    test_result::TestResult,
};

/// What a single countdown tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The session was not running; nothing changed.
    Ignored,
    Counting { remaining_seconds: u32 },
    /// Time ran out and the session submitted itself.
    Expired(TestResult),
}

/// Outcome of a submit call.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub result: TestResult,
    /// False when the session had already been submitted and this call was a no-op.
    pub first: bool,
}

/// One student's attempt at the aptitude test.
///
/// Pure state machine; the countdown is driven from outside by calling [`tick`](Self::tick)
/// once per second.
#[derive(Debug, Clone)]
pub struct TestSession {
    student_id: i64,
    questions: Vec<Question>,
    current_index: usize,
    answers: BTreeMap<usize, u8>,
    remaining_seconds: u32,
    status: SessionStatus,
    result: Option<TestResult>,
}

impl TestSession {
    pub fn new(student_id: i64, questions: Vec<Question>, time_limit_secs: u32) -> Self {
        Self {
            student_id,
            questions,
            current_index: 0,
            answers: BTreeMap::new(),
            remaining_seconds: time_limit_secs,
            status: SessionStatus::NotStarted,
            result: None,
        }
    }

    pub fn student_id(&self) -> i64 {
        self.student_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn answers(&self) -> &BTreeMap<usize, u8> {
        &self.answers
    }

    pub fn answer(&self, question_index: usize) -> Option<u8> {
        self.answers.get(&question_index).copied()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    /// Answered/unanswered flag per question index.
    pub fn answered_flags(&self) -> Vec<bool> {
        (0..self.questions.len())
            .map(|i| self.answers.contains_key(&i))
            .collect()
    }

    /// The computed result, once submitted.
    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    /// Starts the countdown. Requires a non-empty question set.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::NotStarted {
            return Err(self.reject("start"));
        }
        if self.questions.is_empty() {
            return Err(SessionError::EmptyQuestionSet);
        }

        self.status = SessionStatus::Running;
        tracing::info!(
            student_id = self.student_id,
            questions = self.questions.len(),
            remaining_seconds = self.remaining_seconds,
            "Aptitude test started"
        );
        Ok(())
    }

    /// Records (or replaces) the selected option for a question.
    pub fn record_answer(
        &mut self,
        question_index: usize,
        option_index: usize,
    ) -> Result<(), SessionError> {
        if self.status != SessionStatus::Running {
            return Err(self.reject("record an answer"));
        }
        self.check_index(question_index)?;
        if option_index >= OPTION_COUNT {
            return Err(SessionError::OptionOutOfRange(option_index));
        }

        self.answers.insert(question_index, option_index as u8);
        Ok(())
    }

    /// Jumps to any question. Answers and timer are unaffected.
    pub fn navigate(&mut self, target_index: usize) -> Result<(), SessionError> {
        if self.status == SessionStatus::Submitted {
            return Err(self.reject("navigate"));
        }
        self.check_index(target_index)?;

        self.current_index = target_index;
        Ok(())
    }

    /// Advances the countdown by one second, submitting when it reaches zero.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != SessionStatus::Running {
            return TickOutcome::Ignored;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return TickOutcome::Counting {
                remaining_seconds: self.remaining_seconds,
            };
        }

        tracing::info!(student_id = self.student_id, "Time expired, auto-submitting");
        TickOutcome::Expired(self.finalize())
    }

    pub fn compute_score(&self) -> f64 {
        compute_score(&self.questions, &self.answers)
    }

    /// Ends the attempt and computes the result.
    ///
    /// Calling it again after submission returns the same result with `first == false`.
    pub fn submit(&mut self) -> Result<Submission, SessionError> {
        match self.status {
            SessionStatus::NotStarted => Err(self.reject("submit")),
            SessionStatus::Running => Ok(Submission {
                result: self.finalize(),
                first: true,
            }),
            SessionStatus::Submitted => {
                tracing::debug!(student_id = self.student_id, "Duplicate submit ignored");
                let result = self
                    .result
                    .clone()
                    .ok_or_else(|| self.reject("resubmit"))?;
                Ok(Submission {
                    result,
                    first: false,
                })
            }
        }
    }

    fn finalize(&mut self) -> TestResult {
        let score = self.compute_score();
        let total = self.questions.len();
        let result = TestResult {
            student_id: self.student_id,
            score,
            total_questions: total as u32,
            correct_answers: correct_answers_from_score(score, total),
            answers: self.answers.clone(),
            completed_at: Utc::now(),
        };

        self.status = SessionStatus::Submitted;
        self.result = Some(result.clone());
        tracing::info!(
            student_id = self.student_id,
            score,
            correct_answers = result.correct_answers,
            "Aptitude test submitted"
        );
        result
    }

    fn check_index(&self, index: usize) -> Result<(), SessionError> {
        if index >= self.questions.len() {
            return Err(SessionError::QuestionOutOfRange {
                index,
                len: self.questions.len(),
            });
        }
        Ok(())
    }

    fn reject(&self, operation: &'static str) -> SessionError {
        tracing::warn!(
            student_id = self.student_id,
            status = %self.status,
            "Rejected '{}' on aptitude test session",
            operation
        );
        SessionError::InvalidTransition {
            operation,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::DEFAULT_TEST_DURATION_SECS,
        models::question::Category,
        session::{assemble_question_set, count_correct, test_support::bank},
    };

    fn running(questions: Vec<Question>, time_limit: u32) -> TestSession {
        let mut session = TestSession::new(42, questions, time_limit);
        session.start().unwrap();
        session
    }

    #[test]
    fn start_requires_questions() {
        let mut session = TestSession::new(1, Vec::new(), DEFAULT_TEST_DURATION_SECS);
        assert!(matches!(session.start(), Err(SessionError::EmptyQuestionSet)));
        assert_eq!(session.status(), SessionStatus::NotStarted);
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut session = running(bank(Category::Verbal, 1, 3), 60);
        let err = session.start().unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                status: SessionStatus::Running,
                ..
            }
        ));
    }

    #[test]
    fn start_uses_configured_budget() {
        let session = running(bank(Category::Verbal, 1, 3), DEFAULT_TEST_DURATION_SECS);
        assert_eq!(session.remaining_seconds(), 1800);
        assert_eq!(session.status(), SessionStatus::Running);
    }

    #[test]
    fn answers_require_running_session() {
        let mut session = TestSession::new(1, bank(Category::Verbal, 1, 3), 60);
        assert!(matches!(
            session.record_answer(0, 1),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn answers_can_be_changed_before_submission() {
        let mut session = running(bank(Category::Verbal, 1, 3), 60);
        session.record_answer(1, 3).unwrap();
        session.record_answer(1, 0).unwrap();
        assert_eq!(session.answer(1), Some(0));
        assert_eq!(session.answered_flags(), vec![false, true, false]);
    }

    #[test]
    fn answer_indices_are_bound_checked() {
        let mut session = running(bank(Category::Verbal, 1, 3), 60);
        assert!(matches!(
            session.record_answer(3, 0),
            Err(SessionError::QuestionOutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            session.record_answer(0, 4),
            Err(SessionError::OptionOutOfRange(4))
        ));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn navigation_is_random_access() {
        let mut session = running(bank(Category::Verbal, 1, 15), 60);
        session.navigate(9).unwrap();
        session.record_answer(9, 2).unwrap();
        session.navigate(0).unwrap();

        assert_eq!(session.answer(9), Some(2));
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.remaining_seconds(), 60);
    }

    #[test]
    fn navigation_outside_the_set_is_rejected() {
        let mut session = running(bank(Category::Verbal, 1, 5), 60);
        session.navigate(4).unwrap();
        assert!(session.navigate(5).is_err());
        assert_eq!(session.current_index(), 4);
    }

    #[test]
    fn timeout_fires_after_exactly_the_remaining_ticks() {
        let mut session = running(bank(Category::Verbal, 1, 3), 2);

        assert_eq!(
            session.tick(),
            TickOutcome::Counting {
                remaining_seconds: 1
            }
        );
        assert_eq!(session.status(), SessionStatus::Running);

        let TickOutcome::Expired(result) = session.tick() else {
            panic!("second tick should expire the session");
        };
        assert_eq!(session.status(), SessionStatus::Submitted);
        assert_eq!(session.remaining_seconds(), 0);
        assert_eq!(result.total_questions, 3);

        assert_eq!(session.tick(), TickOutcome::Ignored);
        assert_eq!(session.remaining_seconds(), 0);
        assert_eq!(session.result(), Some(&result));
    }

    #[test]
    fn ticks_before_start_are_ignored() {
        let mut session = TestSession::new(1, bank(Category::Verbal, 1, 3), 10);
        assert_eq!(session.tick(), TickOutcome::Ignored);
        assert_eq!(session.remaining_seconds(), 10);
    }

    #[test]
    fn submit_is_idempotent() {
        let mut session = running(bank(Category::Verbal, 1, 4), 60);
        session.record_answer(0, 0).unwrap();

        let first = session.submit().unwrap();
        let second = session.submit().unwrap();

        assert!(first.first);
        assert!(!second.first);
        assert_eq!(first.result, second.result);
        assert_eq!(first.result.score, 25.0);
    }

    #[test]
    fn submit_after_timeout_returns_timeout_result() {
        let mut session = running(bank(Category::Verbal, 1, 2), 1);
        let TickOutcome::Expired(expired) = session.tick() else {
            panic!("expected expiry");
        };
        let manual = session.submit().unwrap();
        assert!(!manual.first);
        assert_eq!(manual.result, expired);
    }

    #[test]
    fn submit_before_start_is_rejected() {
        let mut session = TestSession::new(1, bank(Category::Verbal, 1, 2), 60);
        assert!(matches!(
            session.submit(),
            Err(SessionError::InvalidTransition {
                status: SessionStatus::NotStarted,
                ..
            })
        ));
    }

    #[test]
    fn nothing_changes_after_submission() {
        let mut session = running(bank(Category::Verbal, 1, 3), 60);
        session.record_answer(0, 0).unwrap();
        session.submit().unwrap();

        assert!(session.record_answer(1, 0).is_err());
        assert!(session.navigate(2).is_err());
        assert_eq!(session.answers().len(), 1);
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn partial_bank_scenario() {
        let mut all = bank(Category::Verbal, 1, 12);
        all.extend(bank(Category::Quantitative, 100, 5));
        let questions = assemble_question_set(all);
        assert_eq!(questions.len(), 15);

        let mut session = running(questions, DEFAULT_TEST_DURATION_SECS);
        for i in 0..5 {
            let correct = session.questions()[i].correct_answer_index as usize;
            session.record_answer(i, correct).unwrap();
        }

        let score = session.compute_score();
        assert!((score - 100.0 / 3.0).abs() < 1e-9);

        let submission = session.submit().unwrap();
        assert_eq!(submission.result.correct_answers, 5);
        assert_eq!(submission.result.total_questions, 15);
        assert_eq!(
            submission.result.correct_answers as usize,
            count_correct(session.questions(), session.answers())
        );
    }
}
