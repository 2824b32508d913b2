//! Client for the public university directory (hipolabs `universities` API),
//! used by admins to pre-fill colleges before importing them.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::{config::Config, models::college::CreateCollegeRequest};

/// Search results are capped at this many entries.
pub const MAX_SEARCH_RESULTS: usize = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Placeholders for figures the directory does not provide; admins edit them after import.
const DEFAULT_COLLEGE_TYPE: &str = "Private";
const DEFAULT_MIN_CGPA: f64 = 6.0;
const DEFAULT_PLACEMENT_RATE: f64 = 70.0;
const DEFAULT_FACILITIES: &str = "Library, Labs, Sports Complex";
const DEFAULT_SCHOLARSHIPS: &str = "Merit-based scholarships available";

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("invalid directory search: {0}")]
    InvalidRequest(String),

    #[error("college directory unreachable: {0}")]
    Network(String),

    #[error("college directory error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("could not parse college directory response: {0}")]
    Parse(String),
}

/// One university as returned by the directory.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryCollege {
    pub name: String,
    pub country: String,
    #[serde(rename = "state-province", default)]
    pub state_province: Option<String>,
    #[serde(default)]
    pub web_pages: Vec<String>,
}

impl DirectoryCollege {
    /// Maps the entry onto a create request with placeholder figures.
    pub fn into_create_request(self) -> CreateCollegeRequest {
        let location = match self.state_province.as_deref().map(str::trim) {
            Some(state) if !state.is_empty() => format!("{}, {}", state, self.country),
            _ => self.country.clone(),
        };
        let website = self
            .web_pages
            .into_iter()
            .find(|page| Url::parse(page).is_ok());

        CreateCollegeRequest {
            description: format!("{} is located in {}", self.name, self.country),
            fees: estimated_fees(&self.country),
            name: self.name,
            location,
            college_type: DEFAULT_COLLEGE_TYPE.to_string(),
            ranking: 0,
            min_cgpa: DEFAULT_MIN_CGPA,
            placement_rate: DEFAULT_PLACEMENT_RATE,
            facilities: DEFAULT_FACILITIES.to_string(),
            scholarships: DEFAULT_SCHOLARSHIPS.to_string(),
            website,
        }
    }
}

/// Typical annual fees in INR for the country, until an admin sets the real figure.
fn estimated_fees(country: &str) -> f64 {
    match country {
        "India" => 300_000.0,
        "United States" => 4_500_000.0,
        "United Kingdom" => 3_000_000.0,
        "Canada" => 2_250_000.0,
        "Australia" => 2_650_000.0,
        "Germany" => 125_000.0,
        _ => 200_000.0,
    }
}

/// HTTP client for `{base}/search`.
pub struct CollegeDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl CollegeDirectory {
    pub fn new(base_url: &str) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| DirectoryError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, DirectoryError> {
        Self::new(&config.college_directory_url)
    }

    /// Searches by name, optionally within one country. At most
    /// [`MAX_SEARCH_RESULTS`] entries are returned.
    pub async fn search(
        &self,
        name: &str,
        country: Option<&str>,
    ) -> Result<Vec<DirectoryCollege>, DirectoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DirectoryError::InvalidRequest(
                "a search term is required".to_string(),
            ));
        }

        let mut query = vec![("name", name)];
        if let Some(country) = country.map(str::trim).filter(|c| !c.is_empty()) {
            query.push(("country", country));
        }

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&query)
            .send()
            .await
            .map_err(|e| DirectoryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut colleges: Vec<DirectoryCollege> = response
            .json()
            .await
            .map_err(|e| DirectoryError::Parse(e.to_string()))?;
        colleges.truncate(MAX_SEARCH_RESULTS);

        tracing::info!(term = name, count = colleges.len(), "College directory searched");
        Ok(colleges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry(name: &str, country: &str, state: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "name": name,
            "country": country,
            "alpha_two_code": "IN",
            "state-province": state,
            "domains": ["example.edu"],
            "web_pages": ["https://example.edu/"]
        })
    }

    #[test]
    fn maps_entry_with_placeholder_figures() {
        let college: DirectoryCollege = serde_json::from_value(entry(
            "Indian Institute of Science",
            "India",
            Some("Karnataka"),
        ))
        .unwrap();

        let request = college.into_create_request();
        assert_eq!(request.location, "Karnataka, India");
        assert_eq!(request.ranking, 0);
        assert_eq!(request.min_cgpa, 6.0);
        assert_eq!(request.placement_rate, 70.0);
        assert_eq!(request.fees, 300_000.0);
        assert_eq!(request.website.as_deref(), Some("https://example.edu/"));
        assert_eq!(
            request.description,
            "Indian Institute of Science is located in India"
        );
        assert!(request.validate().is_ok());
    }

    #[test]
    fn missing_state_and_bad_pages_fall_back() {
        let college = DirectoryCollege {
            name: "Lakeside University".to_string(),
            country: "Canada".to_string(),
            state_province: None,
            web_pages: vec!["not a url".to_string()],
        };

        let request = college.into_create_request();
        assert_eq!(request.location, "Canada");
        assert_eq!(request.website, None);
        assert_eq!(request.fees, 2_250_000.0);
    }

    #[tokio::test]
    async fn search_queries_by_name_and_country() {
        let server = MockServer::start().await;
        let body = serde_json::json!([
            entry("Delhi Technological University", "India", None),
            entry("University of Delhi", "India", Some("Delhi")),
        ]);

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("name", "Delhi"))
            .and(query_param("country", "India"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let directory = CollegeDirectory::new(&server.uri()).unwrap();
        let found = directory.search(" Delhi ", Some("India")).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].state_province.as_deref(), Some("Delhi"));
    }

    #[tokio::test]
    async fn search_caps_the_result_count() {
        let server = MockServer::start().await;
        let body: Vec<_> = (0..80)
            .map(|i| entry(&format!("College {i}"), "India", None))
            .collect();

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let directory = CollegeDirectory::new(&server.uri()).unwrap();
        let found = directory.search("College", None).await.unwrap();
        assert_eq!(found.len(), MAX_SEARCH_RESULTS);
        assert_eq!(found[0].name, "College 0");
    }

    #[tokio::test]
    async fn search_reports_upstream_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let directory = CollegeDirectory::new(&server.uri()).unwrap();
        assert!(matches!(
            directory.search("Delhi", None).await,
            Err(DirectoryError::Api { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn search_requires_a_term() {
        let directory = CollegeDirectory::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(
            directory.search("   ", None).await,
            Err(DirectoryError::InvalidRequest(_))
        ));
    }
}
