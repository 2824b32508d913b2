// src/handlers/student.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::student::{StudentProfile, UpdatePreferencesRequest, UpdateStudentRequest},
    utils::{html::clean_optional, jwt::Claims},
};

const PROFILE_COLUMNS: &str = "user_id, cgpa, exam_scores, phone_number, date_of_birth, address, \
     career_preference, location_preference, aptitude_score, updated_at";

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub profile: StudentProfile,
}

/// Loads the student's profile, or an empty one if none was saved yet.
pub(crate) async fn fetch_profile(pool: &PgPool, user_id: i64) -> Result<StudentProfile, AppError> {
    let profile = sqlx::query_as::<_, StudentProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM students WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load student profile: {:?}", e);
        AppError::from(e)
    })?;

    Ok(profile.unwrap_or_else(|| StudentProfile::empty(user_id)))
}

async fn ensure_profile_row(pool: &PgPool, user_id: i64) -> Result<(), AppError> {
    sqlx::query("INSERT INTO students (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Current user with their student profile.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let (username, role): (String, String) =
        sqlx::query_as("SELECT username, role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))?;

    let profile = fetch_profile(&pool, user_id).await?;

    Ok(Json(MeResponse {
        id: user_id,
        username,
        role,
        profile,
    }))
}

/// Updates personal and academic details. Absent fields are left unchanged.
pub async fn update_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;
    ensure_profile_row(&pool, user_id).await?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("UPDATE students SET updated_at = NOW()");

    if let Some(cgpa) = payload.cgpa {
        builder.push(", cgpa = ").push_bind(cgpa);
    }
    if let Some(exam_scores) = payload.exam_scores {
        builder.push(", exam_scores = ").push_bind(SqlJson(exam_scores));
    }
    if let Some(phone) = payload.phone_number {
        builder.push(", phone_number = ").push_bind(phone.trim().to_string());
    }
    if let Some(dob) = payload.date_of_birth {
        builder.push(", date_of_birth = ").push_bind(dob.trim().to_string());
    }
    if let Some(address) = payload.address {
        builder
            .push(", address = ")
            .push_bind(clean_optional(Some(&address)));
    }

    builder.push(" WHERE user_id = ").push_bind(user_id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update student profile: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(fetch_profile(&pool, user_id).await?))
}

/// Updates the career and location preferences.
pub async fn update_preferences(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdatePreferencesRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;
    ensure_profile_row(&pool, user_id).await?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("UPDATE students SET updated_at = NOW()");

    if let Some(career) = payload.career {
        builder.push(", career_preference = ").push_bind(career.as_str());
    }
    if let Some(location) = payload.location {
        builder
            .push(", location_preference = ")
            .push_bind(clean_optional(Some(&location)));
    }

    builder.push(" WHERE user_id = ").push_bind(user_id);
    builder.build().execute(&pool).await?;

    tracing::info!(user_id, "Preferences updated");
    Ok(Json(fetch_profile(&pool, user_id).await?))
}
