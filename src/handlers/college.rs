// src/handlers/college.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use super::student::fetch_profile;
use crate::{
    error::AppError,
    models::{
        college::{College, CollegeListParams, CollegeResponse},
        student::StudentProfile,
        user::ROLE_STUDENT,
    },
    utils::jwt::Claims,
};

pub(crate) const COLLEGE_COLUMNS: &str = "id, name, location, college_type, fees, ranking, min_cgpa, \
     placement_rate, description, facilities, scholarships, website";

/// Profile used for eligibility; admins browse without one.
async fn caller_profile(pool: &PgPool, claims: &Claims) -> Result<Option<StudentProfile>, AppError> {
    if claims.role != ROLE_STUDENT {
        return Ok(None);
    }
    fetch_profile(pool, claims.user_id()?).await.map(Some)
}

/// Lists colleges matching the filters and the student's eligibility.
pub async fn list_colleges(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<CollegeListParams>,
) -> Result<impl IntoResponse, AppError> {
    let colleges = sqlx::query_as::<_, College>(&format!(
        "SELECT {COLLEGE_COLUMNS} FROM colleges ORDER BY ranking"
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list colleges: {:?}", e);
        AppError::from(e)
    })?;

    let profile = caller_profile(&pool, &claims).await?;
    let cgpa = profile.as_ref().and_then(|p| p.cgpa);

    let response: Vec<CollegeResponse> = params
        .apply(colleges, profile.as_ref())
        .into_iter()
        .map(|college| CollegeResponse {
            eligible: college.is_eligible(cgpa),
            college,
        })
        .collect();

    Ok(Json(response))
}

pub async fn get_college(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let college = sqlx::query_as::<_, College>(&format!(
        "SELECT {COLLEGE_COLUMNS} FROM colleges WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("College not found".to_string()))?;

    let cgpa = caller_profile(&pool, &claims).await?.and_then(|p| p.cgpa);

    Ok(Json(CollegeResponse {
        eligible: college.is_eligible(cgpa),
        college,
    }))
}
