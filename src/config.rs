// src/config.rs

use std::env;

use dotenvy::dotenv;

/// Questions taken from each aptitude category when assembling a test.
pub const QUESTIONS_PER_CATEGORY: usize = 10;

/// Upper bound on the size of an assembled question set.
pub const MAX_TEST_QUESTIONS: usize = 30;

/// Default countdown budget for one attempt (30 minutes).
pub const DEFAULT_TEST_DURATION_SECS: u32 = 1800;

/// Minimum score (percent) that makes a student eligible for college applications.
pub const PASSING_SCORE_PERCENTAGE: f64 = 60.0;

/// Default base URL of the Groq OpenAI-compatible endpoint.
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai";

/// Default base URL of the public university directory.
pub const DEFAULT_COLLEGE_DIRECTORY_URL: &str = "http://universities.hipolabs.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// Question generation is disabled when no key is configured.
    pub groq_api_key: Option<String>,
    pub groq_base_url: String,
    pub college_directory_url: String,
    pub test_duration_secs: u32,
}

impl Config {
    /// Reads the configuration from the process environment (and `.env` if present).
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = parsed("JWT_EXPIRATION", 86_400)?;
        let test_duration_secs = parsed("TEST_DURATION_SECS", DEFAULT_TEST_DURATION_SECS)?;
        if test_duration_secs == 0 {
            return Err("TEST_DURATION_SECS must be greater than zero".to_string());
        }

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let groq_base_url =
            env::var("GROQ_BASE_URL").unwrap_or_else(|_| DEFAULT_GROQ_BASE_URL.to_string());
        let college_directory_url = env::var("COLLEGE_DIRECTORY_URL")
            .unwrap_or_else(|_| DEFAULT_COLLEGE_DIRECTORY_URL.to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            admin_username: optional("ADMIN_USERNAME"),
            admin_password: optional("ADMIN_PASSWORD"),
            groq_api_key: optional("GROQ_API_KEY"),
            groq_base_url,
            college_directory_url,
            test_duration_secs,
        })
    }
}

fn required(key: &str) -> Result<String, String> {
    env::var(key).map_err(|_| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
