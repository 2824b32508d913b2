// src/models/college.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use url::Url;
use validator::Validate;

use super::student::StudentProfile;

/// Location preference that means "anywhere in the country" and is not used as a filter.
const NATIONWIDE_LOCATION: &str = "india";

/// Represents the 'colleges' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct College {
    pub id: i64,
    pub name: String,
    pub location: String,

    /// e.g. "Government", "Private", "Deemed".
    pub college_type: String,

    /// Annual fees in INR.
    pub fees: f64,

    /// Lower is better.
    pub ranking: i32,

    /// Minimum CGPA (0-10 scale) required to apply.
    pub min_cgpa: f64,

    /// Percentage of students placed.
    pub placement_rate: f64,

    pub description: String,
    pub facilities: String,
    pub scholarships: String,
    pub website: Option<String>,
}

impl College {
    pub fn is_eligible(&self, cgpa: Option<f64>) -> bool {
        cgpa.is_some_and(|c| c >= self.min_cgpa)
    }
}

/// College as shown to a student, with the eligibility verdict.
#[derive(Debug, Serialize)]
pub struct CollegeResponse {
    #[serde(flatten)]
    pub college: College,
    pub eligible: bool,
}

/// Query parameters for listing colleges.
#[derive(Debug, Default, Deserialize)]
pub struct CollegeListParams {
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub college_type: Option<String>,
    pub min_fees: Option<f64>,
    pub max_fees: Option<f64>,
    /// Keep colleges ranked at or better than this.
    pub max_ranking: Option<i32>,
}

impl CollegeListParams {
    /// Applies the filters and the student's eligibility, then sorts by ranking.
    ///
    /// * CGPA: only colleges whose minimum the student meets, when a CGPA is on file.
    /// * Location: the explicit filter, else the student's preference unless it is nationwide.
    pub fn apply(&self, colleges: Vec<College>, student: Option<&StudentProfile>) -> Vec<College> {
        let cgpa = student.and_then(|s| s.cgpa);
        let location = self
            .location
            .as_deref()
            .filter(|l| !l.eq_ignore_ascii_case("all"))
            .or_else(|| {
                student
                    .and_then(|s| s.location_preference.as_deref())
                    .filter(|l| !l.eq_ignore_ascii_case(NATIONWIDE_LOCATION))
            })
            .map(str::to_lowercase);
        let college_type = self
            .college_type
            .as_deref()
            .filter(|t| !t.eq_ignore_ascii_case("all"))
            .map(str::to_lowercase);

        let mut filtered: Vec<College> = colleges
            .into_iter()
            .filter(|c| cgpa.is_none() || c.is_eligible(cgpa))
            .filter(|c| {
                location
                    .as_ref()
                    .is_none_or(|l| c.location.to_lowercase().contains(l))
            })
            .filter(|c| {
                college_type
                    .as_ref()
                    .is_none_or(|t| c.college_type.to_lowercase().contains(t))
            })
            .filter(|c| self.min_fees.is_none_or(|min| c.fees >= min))
            .filter(|c| self.max_fees.is_none_or(|max| c.fees <= max))
            .filter(|c| self.max_ranking.is_none_or(|max| c.ranking <= max))
            .collect();

        filtered.sort_by_key(|c| c.ranking);
        filtered
    }
}

/// DTO for creating a new college.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCollegeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    #[validate(length(min = 1, max = 50))]
    pub college_type: String,
    #[validate(range(min = 0.0))]
    pub fees: f64,
    #[validate(range(min = 0))]
    pub ranking: i32,
    #[validate(range(min = 0.0, max = 10.0))]
    pub min_cgpa: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub placement_rate: f64,
    #[validate(length(max = 20000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub facilities: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub scholarships: String,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub website: Option<String>,
}

/// DTO for updating a college. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCollegeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub college_type: Option<String>,
    #[validate(range(min = 0.0))]
    pub fees: Option<f64>,
    #[validate(range(min = 0))]
    pub ranking: Option<i32>,
    #[validate(range(min = 0.0, max = 10.0))]
    pub min_cgpa: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub placement_rate: Option<f64>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    #[validate(length(max = 2000))]
    pub facilities: Option<String>,
    #[validate(length(max = 2000))]
    pub scholarships: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub website: Option<String>,
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
