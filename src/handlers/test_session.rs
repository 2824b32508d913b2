// src/handlers/test_session.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::test_result::TestResultResponse,
    session::{ActiveSession, SessionRegistry},
    state::AppState,
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_index: usize,
    pub option_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub index: usize,
}

fn current_session(
    sessions: &SessionRegistry,
    student_id: i64,
) -> Result<Arc<ActiveSession>, AppError> {
    sessions
        .get(student_id)
        .ok_or_else(|| AppError::NotFound("No aptitude test in progress".to_string()))
}

/// Opens a new attempt with a freshly assembled question set.
///
/// Any previous attempt of the student is discarded without being submitted.
pub async fn open_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let session = ActiveSession::open(
        student_id,
        state.questions.as_ref(),
        Arc::clone(&state.results),
        state.config.test_duration_secs,
    )
    .await?;

    let session = state.sessions.insert(student_id, session).await?;
    Ok((StatusCode::CREATED, Json(session.view().await)))
}

pub async fn get_session(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let session = current_session(&sessions, claims.user_id()?)?;
    Ok(Json(session.view().await))
}

/// Starts the countdown.
pub async fn start_session(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let session = current_session(&sessions, claims.user_id()?)?;
    Ok(Json(session.start().await?))
}

pub async fn record_answer(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = current_session(&sessions, claims.user_id()?)?;
    let view = session
        .record_answer(payload.question_index, payload.option_index)
        .await?;
    Ok(Json(view))
}

pub async fn navigate(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NavigateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = current_session(&sessions, claims.user_id()?)?;
    Ok(Json(session.navigate(payload.index).await?))
}

/// Submits the attempt. Repeating the call returns the same result.
///
/// A saved attempt has already left the registry, so a repeat is answered
/// from the result store.
pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let result = match state.sessions.get(student_id) {
        Some(session) => session.submit().await?,
        None => state
            .results
            .fetch_result(student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No aptitude test in progress".to_string()))?,
    };
    Ok(Json(TestResultResponse::from(result)))
}

/// Retries saving a submitted result whose first write failed.
pub async fn retry_persist(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let session = current_session(&sessions, claims.user_id()?)?;
    let result = session.retry_persist().await?;
    Ok(Json(TestResultResponse::from(result)))
}

/// Latest stored result of the caller.
pub async fn get_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .results
        .fetch_result(claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::NotFound("No test result yet".to_string()))?;

    Ok(Json(TestResultResponse::from(result)))
}
