// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    generator::{GenerateQuestionsRequest, GeneratorError},
    models::{
        college::{CreateCollegeRequest, UpdateCollegeRequest},
        question::{
            CreateQuestionRequest, QuestionListParams, QuestionRecord, UpdateQuestionRequest,
        },
    },
    state::AppState,
    utils::{
        html::{clean_html, clean_optional},
        jwt::Claims,
    },
};

const SOURCE_MANUAL: &str = "manual";
const SOURCE_AI: &str = "ai_generated";
const SOURCE_IMPORT: &str = "api_import";
const MAX_BATCH_SIZE: usize = 50;

/// Question text is stored as plain text; escaping is left to the renderer.
fn plain_text(text: &str) -> String {
    text.trim().to_string()
}

fn plain_options(options: &[String]) -> Vec<String> {
    options.iter().map(|o| plain_text(o)).collect()
}

async fn insert_question<'e, E>(
    executor: E,
    question: &CreateQuestionRequest,
    source: &str,
    created_by: i64,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO questions
        (content, options, correct_answer, category, difficulty, source, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(plain_text(&question.question))
    .bind(SqlJson(plain_options(&question.options)))
    .bind(question.correct_answer)
    .bind(question.category.as_str())
    .bind(question.difficulty.as_str())
    .bind(source)
    .bind(created_by)
    .fetch_one(executor)
    .await
}

/// Lists the question bank, optionally filtered by category.
/// Admin only. Includes the answer key.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT id, content, options, correct_answer, category, difficulty, source, created_at \
         FROM questions",
    );
    if let Some(category) = params.category {
        builder.push(" WHERE category = ").push_bind(category.as_str());
    }
    builder.push(" ORDER BY id DESC");

    let questions = builder
        .build_query_as::<QuestionRecord>()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(questions))
}

/// Creates a new aptitude question.
/// Admin only.
pub async fn create_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let id = insert_question(&pool, &payload, SOURCE_MANUAL, claims.user_id()?)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

/// Updates a question by ID.
/// Admin only.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.question.is_none()
        && payload.options.is_none()
        && payload.correct_answer.is_none()
        && payload.category.is_none()
        && payload.difficulty.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(question) = payload.question {
        separated.push("content = ");
        separated.push_bind_unseparated(plain_text(&question));
    }

    if let Some(options) = payload.options {
        separated.push("options = ");
        separated.push_bind_unseparated(SqlJson(plain_options(&options)));
    }

    if let Some(correct_answer) = payload.correct_answer {
        separated.push("correct_answer = ");
        separated.push_bind_unseparated(correct_answer);
    }

    if let Some(category) = payload.category {
        separated.push("category = ");
        separated.push_bind_unseparated(category.as_str());
    }

    if let Some(difficulty) = payload.difficulty {
        separated.push("difficulty = ");
        separated.push_bind_unseparated(difficulty.as_str());
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a question by ID.
/// Admin only.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Generates questions with the LLM for review. Nothing is saved.
/// Admin only.
pub async fn generate_questions(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuestionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let generator = state.generator.as_ref().ok_or(GeneratorError::Disabled)?;
    let questions = generator.generate(&payload).await?;

    Ok(Json(json!({
        "count": questions.len(),
        "questions": questions,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SaveBatchRequest {
    pub questions: Vec<CreateQuestionRequest>,
}

/// Saves a reviewed batch of generated questions in one transaction.
/// Admin only.
pub async fn save_question_batch(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SaveBatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.questions.is_empty() || payload.questions.len() > MAX_BATCH_SIZE {
        return Err(AppError::BadRequest(format!(
            "A batch must hold between 1 and {MAX_BATCH_SIZE} questions"
        )));
    }
    for (i, question) in payload.questions.iter().enumerate() {
        question
            .validate()
            .map_err(|e| AppError::BadRequest(format!("question {i}: {e}")))?;
    }

    let created_by = claims.user_id()?;
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(payload.questions.len());
    for question in &payload.questions {
        let id = insert_question(&mut *tx, question, SOURCE_AI, created_by)
            .await
            .map_err(|e| {
                tracing::error!("Failed to save generated question: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;
        ids.push(id);
    }
    tx.commit().await?;

    tracing::info!(count = ids.len(), "Generated questions saved");
    Ok((
        StatusCode::CREATED,
        Json(json!({"saved": ids.len(), "ids": ids})),
    ))
}

async fn insert_college<'e, E>(
    executor: E,
    college: &CreateCollegeRequest,
    source: &str,
    created_by: i64,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO colleges
        (name, location, college_type, fees, ranking, min_cgpa, placement_rate,
         description, facilities, scholarships, website, source, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING id
        "#,
    )
    .bind(clean_html(college.name.trim()))
    .bind(clean_html(college.location.trim()))
    .bind(clean_html(college.college_type.trim()))
    .bind(college.fees)
    .bind(college.ranking)
    .bind(college.min_cgpa)
    .bind(college.placement_rate)
    .bind(clean_html(&college.description))
    .bind(clean_html(&college.facilities))
    .bind(clean_html(&college.scholarships))
    .bind(college.website.as_deref().map(str::trim))
    .bind(source)
    .bind(created_by)
    .fetch_one(executor)
    .await
}

/// Creates a new college.
/// Admin only.
pub async fn create_college(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCollegeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let id = insert_college(&pool, &payload, SOURCE_MANUAL, claims.user_id()?)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create college: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

#[derive(Debug, Deserialize)]
pub struct DirectorySearchParams {
    pub name: String,
    pub country: Option<String>,
}

/// Searches the public university directory and returns import-ready colleges.
/// Nothing is saved. Admin only.
pub async fn search_colleges(
    State(state): State<AppState>,
    Query(params): Query<DirectorySearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let found = state
        .directory
        .search(&params.name, params.country.as_deref())
        .await?;
    let colleges: Vec<CreateCollegeRequest> = found
        .into_iter()
        .map(|college| college.into_create_request())
        .collect();

    Ok(Json(json!({
        "count": colleges.len(),
        "colleges": colleges,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ImportCollegesRequest {
    pub colleges: Vec<CreateCollegeRequest>,
}

/// Imports reviewed directory colleges in one transaction.
/// Admin only.
pub async fn import_colleges(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ImportCollegesRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.colleges.is_empty() || payload.colleges.len() > MAX_BATCH_SIZE {
        return Err(AppError::BadRequest(format!(
            "An import must hold between 1 and {MAX_BATCH_SIZE} colleges"
        )));
    }
    for (i, college) in payload.colleges.iter().enumerate() {
        college
            .validate()
            .map_err(|e| AppError::BadRequest(format!("college {i}: {e}")))?;
    }

    let created_by = claims.user_id()?;
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(payload.colleges.len());
    for college in &payload.colleges {
        let id = insert_college(&mut *tx, college, SOURCE_IMPORT, created_by)
            .await
            .map_err(|e| {
                tracing::error!("Failed to import college: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;
        ids.push(id);
    }
    tx.commit().await?;

    tracing::info!(count = ids.len(), "Directory colleges imported");
    Ok((
        StatusCode::CREATED,
        Json(json!({"imported": ids.len(), "ids": ids})),
    ))
}

/// Updates a college by ID. Absent fields are left unchanged.
/// Admin only.
pub async fn update_college(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCollegeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("UPDATE colleges SET updated_at = NOW()");

    let text_fields = [
        ("name", payload.name),
        ("location", payload.location),
        ("college_type", payload.college_type),
        ("description", payload.description),
        ("facilities", payload.facilities),
        ("scholarships", payload.scholarships),
    ];
    for (column, value) in text_fields {
        if let Some(value) = value {
            builder
                .push(format!(", {column} = "))
                .push_bind(clean_html(value.trim()));
        }
    }

    let number_fields = [
        ("fees", payload.fees),
        ("min_cgpa", payload.min_cgpa),
        ("placement_rate", payload.placement_rate),
    ];
    for (column, value) in number_fields {
        if let Some(value) = value {
            builder.push(format!(", {column} = ")).push_bind(value);
        }
    }

    if let Some(ranking) = payload.ranking {
        builder.push(", ranking = ").push_bind(ranking);
    }
    if let Some(website) = payload.website {
        builder
            .push(", website = ")
            .push_bind(clean_optional(Some(&website)));
    }

    builder.push(" WHERE id = ").push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update college: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("College not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a college by ID.
/// Admin only.
pub async fn delete_college(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM colleges WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete college: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("College not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_text_keeps_comparison_operators() {
        assert_eq!(
            plain_text("  Which is true: 3 < 5 && 7 > 2?  "),
            "Which is true: 3 < 5 && 7 > 2?"
        );
        let options = vec!["x < y".to_string(), " A & B ".to_string()];
        assert_eq!(plain_options(&options), vec!["x < y", "A & B"]);
    }
}
