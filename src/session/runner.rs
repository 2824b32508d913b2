// src/session/runner.rs

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use dashmap::DashMap;
use serde::Serialize;
use tokio::{
    sync::{Mutex, oneshot},
    time::{Instant, interval_at},
};

use super::{SessionError, SessionStatus, TestSession, TickOutcome, assemble_question_set};
use crate::{
    models::{
        question::PublicQuestion,
        test_result::{ProfileUpdate, TestResult},
    },
    store::{QuestionRepository, ResultStore},
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Snapshot of a session for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub status: SessionStatus,
    pub current_index: usize,
    pub total_questions: usize,
    pub remaining_seconds: u32,
    /// Question at `current_index`, without its answer key.
    pub current_question: Option<PublicQuestion>,
    /// Option selected for the current question, if any.
    pub selected_option: Option<u8>,
    pub answered: Vec<bool>,
    /// Whether the submitted result reached the result store.
    pub persisted: bool,
    pub result: Option<TestResult>,
}

struct SessionState {
    session: TestSession,
    /// Dropping or firing the sender stops the countdown task.
    cancel_timer: Option<oneshot::Sender<()>>,
    persisted: bool,
}

impl SessionState {
    fn stop_timer(&mut self) {
        if let Some(cancel) = self.cancel_timer.take() {
            let _ = cancel.send(());
        }
    }

    fn view(&self) -> SessionView {
        let session = &self.session;
        SessionView {
            status: session.status(),
            current_index: session.current_index(),
            total_questions: session.len(),
            remaining_seconds: session.remaining_seconds(),
            current_question: session.current_question().map(PublicQuestion::from),
            selected_option: session.answer(session.current_index()),
            answered: session.answered_flags(),
            persisted: self.persisted,
            result: session.result().cloned(),
        }
    }
}

/// A [`TestSession`] with its countdown task and result persistence.
///
/// Manual submission and timeout both go through the same locked transition,
/// so a result is written at most once per attempt.
pub struct ActiveSession {
    state: Arc<Mutex<SessionState>>,
    store: Arc<dyn ResultStore>,
    tick_period: Duration,
    eviction: Option<Eviction>,
}

type SessionMap = DashMap<i64, Arc<ActiveSession>>;

/// Back-reference to the registry entry, dropped once the result is saved.
#[derive(Clone)]
struct Eviction {
    sessions: Weak<SessionMap>,
    student_id: i64,
}

impl Eviction {
    /// Removes the entry only if it still holds this session.
    fn evict(&self, state: &Arc<Mutex<SessionState>>) {
        let Some(sessions) = self.sessions.upgrade() else {
            return;
        };
        let removed = sessions
            .remove_if(&self.student_id, |_, s| Arc::ptr_eq(&s.state, state))
            .is_some();
        if removed {
            tracing::debug!(student_id = self.student_id, "Saved session discarded");
        }
    }
}

impl ActiveSession {
    pub fn new(session: TestSession, store: Arc<dyn ResultStore>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                session,
                cancel_timer: None,
                persisted: false,
            })),
            store,
            tick_period: TICK_PERIOD,
            eviction: None,
        }
    }

    /// Fetches the bank and prepares a new attempt for the student.
    ///
    /// Fails with `EmptyQuestionSet` when the bank holds no aptitude questions.
    pub async fn open(
        student_id: i64,
        questions: &dyn QuestionRepository,
        store: Arc<dyn ResultStore>,
        time_limit_secs: u32,
    ) -> Result<Self, SessionError> {
        let bank = questions.fetch_all().await?;
        let question_set = assemble_question_set(bank);
        if question_set.is_empty() {
            tracing::warn!(student_id, "No aptitude questions available");
            return Err(SessionError::EmptyQuestionSet);
        }

        tracing::info!(student_id, count = question_set.len(), "Questions loaded");
        let session = TestSession::new(student_id, question_set, time_limit_secs);
        Ok(Self::new(session, store))
    }

    /// Overrides the countdown period (one second by default).
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    pub async fn view(&self) -> SessionView {
        self.state.lock().await.view()
    }

    /// Starts the session and spawns its countdown task.
    pub async fn start(&self) -> Result<SessionView, SessionError> {
        let mut state = self.state.lock().await;
        state.session.start()?;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        state.cancel_timer = Some(cancel_tx);
        tokio::spawn(run_countdown(
            Arc::downgrade(&self.state),
            Arc::clone(&self.store),
            self.eviction.clone(),
            self.tick_period,
            cancel_rx,
        ));

        Ok(state.view())
    }

    pub async fn record_answer(
        &self,
        question_index: usize,
        option_index: usize,
    ) -> Result<SessionView, SessionError> {
        let mut state = self.state.lock().await;
        state.session.record_answer(question_index, option_index)?;
        Ok(state.view())
    }

    pub async fn navigate(&self, target_index: usize) -> Result<SessionView, SessionError> {
        let mut state = self.state.lock().await;
        state.session.navigate(target_index)?;
        Ok(state.view())
    }

    /// Submits the attempt and persists the result.
    ///
    /// A second call returns the stored result without writing again. If the
    /// write fails the session still counts as submitted; see [`retry_persist`](Self::retry_persist).
    pub async fn submit(&self) -> Result<TestResult, SessionError> {
        let mut state = self.state.lock().await;
        let submission = state.session.submit()?;
        state.stop_timer();

        if !submission.first {
            return Ok(submission.result);
        }
        let result = persist(&mut state, self.store.as_ref(), submission.result).await?;
        self.evict();
        Ok(result)
    }

    /// Re-sends the already computed result after a failed write.
    pub async fn retry_persist(&self) -> Result<TestResult, SessionError> {
        let mut state = self.state.lock().await;
        let Some(result) = state.session.result().cloned() else {
            return Err(SessionError::InvalidTransition {
                operation: "retry saving the result",
                status: state.session.status(),
            });
        };
        if state.persisted {
            return Ok(result);
        }
        let result = persist(&mut state, self.store.as_ref(), result).await?;
        self.evict();
        Ok(result)
    }

    /// Whether a submitted result is still waiting to be saved.
    pub async fn has_unsaved_result(&self) -> bool {
        let state = self.state.lock().await;
        state.session.status() == SessionStatus::Submitted && !state.persisted
    }

    fn evict(&self) {
        if let Some(eviction) = &self.eviction {
            eviction.evict(&self.state);
        }
    }

    /// Stops the countdown without submitting. Used when the attempt is discarded.
    pub async fn abandon(&self) {
        let mut state = self.state.lock().await;
        if state.session.status() == SessionStatus::Running {
            tracing::info!(
                student_id = state.session.student_id(),
                "Abandoning running aptitude test"
            );
        }
        state.stop_timer();
    }
}

/// Writes the result and the profile score. Both writes are always attempted.
async fn persist(
    state: &mut SessionState,
    store: &dyn ResultStore,
    result: TestResult,
) -> Result<TestResult, SessionError> {
    let student_id = result.student_id;
    let put = store.put_result(student_id, &result).await;
    let merge = store
        .merge_profile(
            student_id,
            ProfileUpdate {
                aptitude_score: result.score,
            },
        )
        .await;

    match put.and(merge) {
        Ok(()) => {
            state.persisted = true;
            tracing::info!(student_id, score = result.score, "Test result saved");
            Ok(result)
        }
        Err(e) => {
            state.persisted = false;
            tracing::error!(student_id, "Failed to save test result: {}", e);
            Err(SessionError::Store(e))
        }
    }
}

/// Ticks the session once per period until it leaves `Running`, is cancelled,
/// or is dropped.
async fn run_countdown(
    state: Weak<Mutex<SessionState>>,
    store: Arc<dyn ResultStore>,
    eviction: Option<Eviction>,
    period: Duration,
    mut cancel: oneshot::Receiver<()>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = &mut cancel => break,
            _ = ticker.tick() => {
                let Some(state) = state.upgrade() else { break };
                let mut guard = state.lock().await;
                match guard.session.tick() {
                    TickOutcome::Counting { .. } => {}
                    TickOutcome::Ignored => break,
                    TickOutcome::Expired(result) => {
                        guard.cancel_timer.take();
                        // Failure is logged and left for a retry from the client.
                        let saved = persist(&mut guard, store.as_ref(), result).await.is_ok();
                        drop(guard);
                        if let (true, Some(eviction)) = (saved, &eviction) {
                            eviction.evict(&state);
                        }
                        break;
                    }
                }
            }
        }
    }
}

/// Live attempts keyed by student id. At most one per student.
///
/// An attempt leaves the registry once its result is saved; a submitted but
/// unsaved attempt stays so the save can be retried.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<SessionMap>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a new attempt, abandoning the student's previous one.
    ///
    /// Refused with `UnsavedResult` while the previous attempt holds a result
    /// that has not been saved yet.
    pub async fn insert(
        &self,
        student_id: i64,
        mut session: ActiveSession,
    ) -> Result<Arc<ActiveSession>, SessionError> {
        if let Some(previous) = self.get(student_id) {
            if previous.has_unsaved_result().await {
                tracing::warn!(student_id, "New attempt refused: previous result not saved");
                return Err(SessionError::UnsavedResult);
            }
        }

        session.eviction = Some(Eviction {
            sessions: Arc::downgrade(&self.sessions),
            student_id,
        });
        let session = Arc::new(session);
        let previous = self.sessions.insert(student_id, Arc::clone(&session));
        if let Some(previous) = previous {
            previous.abandon().await;
        }
        Ok(session)
    }

    pub fn get(&self, student_id: i64) -> Option<Arc<ActiveSession>> {
        self.sessions.get(&student_id).map(|s| Arc::clone(&s))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
