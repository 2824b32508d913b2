// src/models/student.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Career paths a student can choose as a preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CareerPath {
    Engineering,
    Management,
    Medical,
    Law,
    Science,
    Arts,
}

impl CareerPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            CareerPath::Engineering => "engineering",
            CareerPath::Management => "management",
            CareerPath::Medical => "medical",
            CareerPath::Law => "law",
            CareerPath::Science => "science",
            CareerPath::Arts => "arts",
        }
    }
}

/// Scores from national entrance exams, all optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamScores {
    pub jee: Option<f64>,
    pub neet: Option<f64>,
    pub cat: Option<f64>,
    pub gmat: Option<f64>,
    pub other: Option<String>,
}

/// Represents the 'students' table: the student's profile aggregate.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentProfile {
    pub user_id: i64,
    pub cgpa: Option<f64>,
    pub exam_scores: Option<Json<ExamScores>>,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub career_preference: Option<String>,
    pub location_preference: Option<String>,
    /// Latest aptitude test score; 0 until a test is submitted.
    pub aptitude_score: f64,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl StudentProfile {
    /// Profile for a student who has not saved any details yet.
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            cgpa: None,
            exam_scores: None,
            phone_number: None,
            date_of_birth: None,
            address: None,
            career_preference: None,
            location_preference: None,
            aptitude_score: 0.0,
            updated_at: None,
        }
    }
}

/// DTO for updating personal and academic details.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[validate(range(min = 0.0, max = 10.0, message = "CGPA must be between 0 and 10."))]
    pub cgpa: Option<f64>,
    pub exam_scores: Option<ExamScores>,
    #[validate(length(min = 7, max = 20))]
    pub phone_number: Option<String>,
    #[validate(length(max = 20))]
    pub date_of_birth: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

/// DTO for the career and location choices.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePreferencesRequest {
    pub career: Option<CareerPath>,
    #[validate(length(min = 1, max = 100))]
    pub location: Option<String>,
}
