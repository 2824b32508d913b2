// src/models/question.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use thiserror::Error;
use validator::Validate;

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

/// Question category. The first three are the aptitude sections used by the test;
/// the rest are career-specific banks maintained by admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Verbal,
    Quantitative,
    General,
    Engineering,
    Management,
    Medical,
    Law,
    Science,
    Arts,
}

impl Category {
    /// Aptitude sections in the order they appear in an assembled test.
    pub const APTITUDE_SECTIONS: [Category; 3] =
        [Category::Verbal, Category::Quantitative, Category::General];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Verbal => "verbal",
            Category::Quantitative => "quantitative",
            Category::General => "general",
            Category::Engineering => "engineering",
            Category::Management => "management",
            Category::Medical => "medical",
            Category::Law => "law",
            Category::Science => "science",
            Category::Arts => "arts",
        }
    }

    /// Human label used when prompting the question generator.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Verbal => "Verbal",
            Category::Quantitative => "Quantitative",
            Category::General => "General Knowledge",
            Category::Engineering => "Engineering",
            Category::Management => "Management",
            Category::Medical => "Medical",
            Category::Law => "Law",
            Category::Science => "Science",
            Category::Arts => "Arts",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbal" => Ok(Category::Verbal),
            "quantitative" => Ok(Category::Quantitative),
            "general" | "general knowledge" => Ok(Category::General),
            "engineering" => Ok(Category::Engineering),
            "management" => Ok(Category::Management),
            "medical" => Ok(Category::Medical),
            "law" => Ok(Category::Law),
            "science" => Ok(Category::Science),
            "arts" => Ok(Category::Arts),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(other.to_string()),
        }
    }
}

/// Validated question used by the test engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub options: [String; OPTION_COUNT],
    pub correct_answer_index: u8,
    pub category: Category,
    pub difficulty: Difficulty,
}

/// Represents the 'questions' table in the database.
///
/// Rows are loosely typed; they become a [`Question`] only through `TryFrom`,
/// which rejects malformed entries.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuestionRecord {
    pub id: i64,
    pub content: String,
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,
    pub correct_answer: i32,
    pub category: String,
    pub difficulty: String,
    /// 'manual' or 'ai_generated'.
    pub source: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Reasons a stored question cannot enter a test.
#[derive(Debug, Error, PartialEq)]
pub enum QuestionError {
    #[error("question {id}: expected 4 options, found {found}")]
    WrongOptionCount { id: i64, found: usize },

    #[error("question {id}: option {index} is empty")]
    EmptyOption { id: i64, index: usize },

    #[error("question {id}: correct answer index {index} is out of range")]
    AnswerOutOfRange { id: i64, index: i32 },

    #[error("question {id}: unknown category '{value}'")]
    UnknownCategory { id: i64, value: String },

    #[error("question {id}: unknown difficulty '{value}'")]
    UnknownDifficulty { id: i64, value: String },
}

impl TryFrom<QuestionRecord> for Question {
    type Error = QuestionError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        let id = record.id;

        let category = record
            .category
            .parse::<Category>()
            .map_err(|value| QuestionError::UnknownCategory { id, value })?;
        let difficulty = record
            .difficulty
            .parse::<Difficulty>()
            .map_err(|value| QuestionError::UnknownDifficulty { id, value })?;

        if !(0..OPTION_COUNT as i32).contains(&record.correct_answer) {
            return Err(QuestionError::AnswerOutOfRange {
                id,
                index: record.correct_answer,
            });
        }

        let found = record.options.len();
        let options: [String; OPTION_COUNT] = record
            .options
            .0
            .try_into()
            .map_err(|_| QuestionError::WrongOptionCount { id, found })?;
        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { id, index });
        }

        Ok(Question {
            id,
            text: record.content,
            options,
            correct_answer_index: record.correct_answer as u8,
            category,
            difficulty,
        })
    }
}

/// DTO for sending a question to a test taker (excludes the answer key).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
    pub category: Category,
    pub difficulty: Difficulty,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            options: q.options.to_vec(),
            category: q.category,
            difficulty: q.difficulty,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(range(min = 0, max = 3))]
    pub correct_answer: i32,
    pub category: Category,
    pub difficulty: Difficulty,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    #[validate(range(min = 0, max = 3))]
    pub correct_answer: Option<i32>,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
}

/// Query parameters for the admin question list.
#[derive(Debug, Deserialize)]
pub struct QuestionListParams {
    pub category: Option<Category>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != OPTION_COUNT {
        return Err(validator::ValidationError::new("exactly_four_options_required"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(options: Vec<&str>, correct: i32, category: &str) -> QuestionRecord {
        QuestionRecord {
            id: 7,
            content: "Pick one".to_string(),
            options: Json(options.into_iter().map(String::from).collect()),
            correct_answer: correct,
            category: category.to_string(),
            difficulty: "medium".to_string(),
            source: "manual".to_string(),
            created_at: None,
        }
    }

    #[test]
    fn well_formed_record_converts() {
        let q = Question::try_from(record(vec!["a", "b", "c", "d"], 2, "Verbal")).unwrap();
        assert_eq!(q.category, Category::Verbal);
        assert_eq!(q.correct_answer_index, 2);
        assert_eq!(q.options[3], "d");
    }

    #[test]
    fn missing_option_is_rejected() {
        let err = Question::try_from(record(vec!["a", "b", "c"], 0, "verbal")).unwrap_err();
        assert_eq!(err, QuestionError::WrongOptionCount { id: 7, found: 3 });
    }

    #[test]
    fn blank_option_is_rejected() {
        let err = Question::try_from(record(vec!["a", " ", "c", "d"], 0, "verbal")).unwrap_err();
        assert_eq!(err, QuestionError::EmptyOption { id: 7, index: 1 });
    }

    #[test]
    fn out_of_range_answer_is_rejected() {
        let err = Question::try_from(record(vec!["a", "b", "c", "d"], 4, "verbal")).unwrap_err();
        assert_eq!(err, QuestionError::AnswerOutOfRange { id: 7, index: 4 });

        let err = Question::try_from(record(vec!["a", "b", "c", "d"], -1, "verbal")).unwrap_err();
        assert_eq!(err, QuestionError::AnswerOutOfRange { id: 7, index: -1 });
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = Question::try_from(record(vec!["a", "b", "c", "d"], 0, "astrology")).unwrap_err();
        assert!(matches!(err, QuestionError::UnknownCategory { .. }));
    }

    #[test]
    fn public_question_hides_answer() {
        let q = Question::try_from(record(vec!["a", "b", "c", "d"], 1, "general")).unwrap();
        let json = serde_json::to_value(PublicQuestion::from(&q)).unwrap();
        assert!(json.get("correct_answer_index").is_none());
        assert_eq!(json["category"], "general");
    }

    #[test]
    fn create_request_requires_four_options() {
        let req = CreateQuestionRequest {
            question: "2 + 2?".to_string(),
            options: vec!["3".into(), "4".into()],
            correct_answer: 1,
            category: Category::Quantitative,
            difficulty: Difficulty::Easy,
        };
        assert!(req.validate().is_err());
    }
}
