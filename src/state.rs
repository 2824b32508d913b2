use std::sync::Arc;

use crate::{
    config::Config,
    directory::CollegeDirectory,
    generator::QuestionGenerator,
    session::SessionRegistry,
    store::{QuestionRepository, ResultStore},
};
use axum::extract::FromRef;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    /// Live test sessions, one per student.
    pub sessions: SessionRegistry,
    pub questions: Arc<dyn QuestionRepository>,
    pub results: Arc<dyn ResultStore>,
    /// `None` when no Groq API key is configured.
    pub generator: Option<Arc<QuestionGenerator>>,
    pub directory: Arc<CollegeDirectory>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
