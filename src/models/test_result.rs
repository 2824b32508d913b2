// src/models/test_result.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PASSING_SCORE_PERCENTAGE;

/// Persisted outcome of one submitted attempt.
/// Stored under the student id, so a retake overwrites the previous result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub student_id: i64,
    /// Percentage in [0, 100].
    pub score: f64,
    pub total_questions: u32,
    pub correct_answers: u32,
    /// Question index -> selected option index.
    pub answers: BTreeMap<usize, u8>,
    pub completed_at: DateTime<Utc>,
}

/// Partial update merged into the student profile after a submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub aptitude_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl PerformanceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            PerformanceLevel::Excellent
        } else if score >= 60.0 {
            PerformanceLevel::Good
        } else if score >= 40.0 {
            PerformanceLevel::Average
        } else {
            PerformanceLevel::NeedsImprovement
        }
    }
}

/// DTO returned by the "my result" endpoint.
#[derive(Debug, Serialize)]
pub struct TestResultResponse {
    #[serde(flatten)]
    pub result: TestResult,
    pub wrong_answers: u32,
    pub performance: PerformanceLevel,
    pub eligible_for_colleges: bool,
}

impl From<TestResult> for TestResultResponse {
    fn from(result: TestResult) -> Self {
        Self {
            wrong_answers: result.total_questions.saturating_sub(result.correct_answers),
            performance: PerformanceLevel::from_score(result.score),
            eligible_for_colleges: result.score >= PASSING_SCORE_PERCENTAGE,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performance_thresholds() {
        assert_eq!(PerformanceLevel::from_score(100.0), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::from_score(80.0), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::from_score(79.9), PerformanceLevel::Good);
        assert_eq!(PerformanceLevel::from_score(60.0), PerformanceLevel::Good);
        assert_eq!(PerformanceLevel::from_score(40.0), PerformanceLevel::Average);
        assert_eq!(PerformanceLevel::from_score(39.99), PerformanceLevel::NeedsImprovement);
        assert_eq!(PerformanceLevel::from_score(0.0), PerformanceLevel::NeedsImprovement);
    }

    #[test]
    fn response_derives_summary_fields() {
        let result = TestResult {
            student_id: 1,
            score: 50.0,
            total_questions: 10,
            correct_answers: 5,
            answers: BTreeMap::new(),
            completed_at: Utc::now(),
        };
        let response = TestResultResponse::from(result);
        assert_eq!(response.wrong_answers, 5);
        assert_eq!(response.performance, PerformanceLevel::Average);
        assert!(!response.eligible_for_colleges);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["student_id"], 1);
        assert_eq!(json["performance"], "average");
    }
}
