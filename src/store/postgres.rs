// src/store/postgres.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, types::Json};

use super::{QuestionRepository, RepositoryError, ResultStore, StoreError};
use crate::models::{
    question::{Question, QuestionRecord},
    test_result::{ProfileUpdate, TestResult},
};

/// Question bank backed by the `questions` table.
#[derive(Clone)]
pub struct PgQuestionRepository {
    pool: PgPool,
}

impl PgQuestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionRepository for PgQuestionRepository {
    async fn fetch_all(&self) -> Result<Vec<Question>, RepositoryError> {
        let records = sqlx::query_as::<_, QuestionRecord>(
            r#"
            SELECT id, content, options, correct_answer, category, difficulty, source, created_at
            FROM questions
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch question bank: {:?}", e);
            RepositoryError::from(e)
        })?;

        let questions = records
            .into_iter()
            .filter_map(|record| match Question::try_from(record) {
                Ok(q) => Some(q),
                Err(e) => {
                    tracing::warn!("Skipping malformed question: {}", e);
                    None
                }
            })
            .collect();

        Ok(questions)
    }
}

/// Row shape of the 'test_results' table.
#[derive(FromRow)]
struct TestResultRow {
    student_id: i64,
    score: f64,
    total_questions: i32,
    correct_answers: i32,
    answers: Json<BTreeMap<usize, u8>>,
    completed_at: chrono::DateTime<chrono::Utc>,
}

impl From<TestResultRow> for TestResult {
    fn from(row: TestResultRow) -> Self {
        Self {
            student_id: row.student_id,
            score: row.score,
            total_questions: row.total_questions.max(0) as u32,
            correct_answers: row.correct_answers.max(0) as u32,
            answers: row.answers.0,
            completed_at: row.completed_at,
        }
    }
}

/// Results and profile aggregates backed by `test_results` and `students`.
#[derive(Clone)]
pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn put_result(&self, student_id: i64, result: &TestResult) -> Result<(), StoreError> {
        // Last write wins: one row per student.
        sqlx::query(
            r#"
            INSERT INTO test_results
                (student_id, score, total_questions, correct_answers, answers, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (student_id) DO UPDATE SET
                score = EXCLUDED.score,
                total_questions = EXCLUDED.total_questions,
                correct_answers = EXCLUDED.correct_answers,
                answers = EXCLUDED.answers,
                completed_at = EXCLUDED.completed_at
            "#,
        )
        .bind(student_id)
        .bind(result.score)
        .bind(result.total_questions as i32)
        .bind(result.correct_answers as i32)
        .bind(Json(&result.answers))
        .bind(result.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert test result: {:?}", e);
            StoreError::from(e)
        })?;

        Ok(())
    }

    async fn merge_profile(&self, student_id: i64, update: ProfileUpdate) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO students (user_id, aptitude_score)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                aptitude_score = EXCLUDED.aptitude_score,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(student_id)
        .bind(update.aptitude_score)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to merge student profile: {:?}", e);
            StoreError::from(e)
        })?;

        Ok(())
    }

    async fn fetch_result(&self, student_id: i64) -> Result<Option<TestResult>, StoreError> {
        let row = sqlx::query_as::<_, TestResultRow>(
            r#"
            SELECT student_id, score, total_questions, correct_answers, answers, completed_at
            FROM test_results
            WHERE student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(TestResult::from))
    }
}
