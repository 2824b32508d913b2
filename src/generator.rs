//! Aptitude question generation through an OpenAI-compatible chat API (Groq).

use std::{sync::LazyLock, time::Duration};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::{
    config::Config,
    models::question::{Category, CreateQuestionRequest, Difficulty},
};

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 4000;

const SYSTEM_PROMPT: &str = "You are an expert aptitude test question generator. Generate high-quality multiple choice questions in valid JSON format.";

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)```").expect("fence pattern is valid")
});

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("question generation is disabled: no API key configured")]
    Disabled,

    #[error("invalid generation request: {0}")]
    InvalidRequest(String),

    #[error("generation API unreachable: {0}")]
    Network(String),

    #[error("generation API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("could not parse generated questions: {0}")]
    Parse(String),
}

/// Admin request for a batch of generated questions.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateQuestionsRequest {
    pub category: Category,
    #[validate(range(min = 1, max = 20))]
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_difficulty")]
    pub difficulty: Difficulty,
}

fn default_count() -> u32 {
    10
}

fn default_difficulty() -> Difficulty {
    Difficulty::Medium
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// One question as the model is asked to emit it.
#[derive(Deserialize)]
struct RawQuestion {
    question: String,
    options: RawOptions,
    #[serde(rename = "correctAnswer")]
    correct_answer: String,
}

#[derive(Deserialize)]
struct RawOptions {
    a: String,
    b: String,
    c: String,
    d: String,
}

/// Client for the chat-completions endpoint.
pub struct QuestionGenerator {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl QuestionGenerator {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GeneratorError::Network(e.to_string()))?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            client,
        })
    }

    /// Builds a generator when an API key is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, GeneratorError> {
        match &config.groq_api_key {
            Some(key) => Self::new(key, &config.groq_base_url).map(Some),
            None => {
                tracing::warn!("GROQ_API_KEY not set; AI question generation is disabled");
                Ok(None)
            }
        }
    }

    /// Asks the model for questions and returns the ones that pass validation.
    pub async fn generate(
        &self,
        request: &GenerateQuestionsRequest,
    ) -> Result<Vec<CreateQuestionRequest>, GeneratorError> {
        request
            .validate()
            .map_err(|e| GeneratorError::InvalidRequest(e.to_string()))?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(request),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GeneratorError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| GeneratorError::Api {
            status: status.as_u16(),
            message: format!("unexpected response body: {e}"),
        })?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        let questions = parse_generated(&content, request.category, request.difficulty)?;
        tracing::info!(
            category = %request.category,
            difficulty = %request.difficulty,
            count = questions.len(),
            "AI questions generated"
        );
        Ok(questions)
    }
}

fn user_prompt(request: &GenerateQuestionsRequest) -> String {
    let label = request.category.display_name();
    let focus = match request.category {
        Category::Verbal => "Focus on synonyms, antonyms, sentence completion, grammar, vocabulary",
        Category::Quantitative => "Focus on arithmetic, algebra, geometry, data interpretation",
        Category::General => {
            "Focus on history, geography, science, current affairs, technology"
        }
        _ => "Focus on aptitude relevant to this field of study",
    };

    format!(
        r#"Generate {count} {difficulty} level multiple choice questions for {label} aptitude test.

Format your response EXACTLY as a JSON array:
[
  {{
    "question": "Question text here?",
    "options": {{
      "a": "Option A text",
      "b": "Option B text",
      "c": "Option C text",
      "d": "Option D text"
    }},
    "correctAnswer": "a",
    "category": "{label}"
  }}
]

Requirements:
- {focus}
- Make questions suitable for college admission tests
- Ensure only ONE correct answer per question
- Mix up which option (a,b,c,d) is correct
- Make all options plausible
- Return ONLY valid JSON array, no markdown, no extra text"#,
        count = request.count,
        difficulty = request.difficulty,
    )
}

/// Parses model output into question requests.
///
/// Accepts a bare JSON array or one wrapped in a markdown fence. Items with an
/// unknown answer letter or failing validation are dropped; an output with no
/// usable item is an error.
pub fn parse_generated(
    content: &str,
    category: Category,
    difficulty: Difficulty,
) -> Result<Vec<CreateQuestionRequest>, GeneratorError> {
    let json = FENCED_BLOCK
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(content)
        .trim();

    let raw: Vec<RawQuestion> =
        serde_json::from_str(json).map_err(|e| GeneratorError::Parse(e.to_string()))?;

    let questions: Vec<CreateQuestionRequest> = raw
        .into_iter()
        .filter_map(|q| {
            let Some(correct_answer) = answer_index(&q.correct_answer) else {
                tracing::warn!("Dropping generated question with answer '{}'", q.correct_answer);
                return None;
            };
            let request = CreateQuestionRequest {
                question: q.question.trim().to_string(),
                options: vec![q.options.a, q.options.b, q.options.c, q.options.d],
                correct_answer,
                category,
                difficulty,
            };
            match request.validate() {
                Ok(()) => Some(request),
                Err(e) => {
                    tracing::warn!("Dropping invalid generated question: {}", e);
                    None
                }
            }
        })
        .collect();

    if questions.is_empty() {
        return Err(GeneratorError::Parse("no valid questions in response".to_string()));
    }
    Ok(questions)
}

fn answer_index(letter: &str) -> Option<i32> {
    match letter.trim().to_ascii_lowercase().as_str() {
        "a" => Some(0),
        "b" => Some(1),
        "c" => Some(2),
        "d" => Some(3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TWO_QUESTIONS: &str = r#"[
      {"question": "Synonym of rapid?", "options": {"a": "Slow", "b": "Quick", "c": "Late", "d": "Dull"}, "correctAnswer": "b", "category": "Verbal"},
      {"question": "Antonym of ancient?", "options": {"a": "Old", "b": "Aged", "c": "Modern", "d": "Past"}, "correctAnswer": "C", "category": "Verbal"}
    ]"#;

    fn request() -> GenerateQuestionsRequest {
        GenerateQuestionsRequest {
            category: Category::Verbal,
            count: 2,
            difficulty: Difficulty::Easy,
        }
    }

    #[test]
    fn parses_bare_array() {
        let parsed = parse_generated(TWO_QUESTIONS, Category::Verbal, Difficulty::Easy).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].correct_answer, 1);
        assert_eq!(parsed[1].correct_answer, 2);
        assert_eq!(parsed[1].options[2], "Modern");
        assert_eq!(parsed[0].difficulty, Difficulty::Easy);
    }

    #[test]
    fn parses_fenced_array() {
        let content = format!("Here you go:\n```json\n{TWO_QUESTIONS}\n```\nGood luck!");
        let parsed = parse_generated(&content, Category::Verbal, Difficulty::Easy).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn drops_items_with_unknown_answer() {
        let content = r#"[
          {"question": "Q1?", "options": {"a": "1", "b": "2", "c": "3", "d": "4"}, "correctAnswer": "e"},
          {"question": "Q2?", "options": {"a": "1", "b": "2", "c": "3", "d": "4"}, "correctAnswer": "a"}
        ]"#;
        let parsed = parse_generated(content, Category::Quantitative, Difficulty::Hard).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].question, "Q2?");
    }

    #[test]
    fn rejects_output_without_usable_questions() {
        let content = r#"[{"question": "Q?", "options": {"a": "", "b": "2", "c": "3", "d": "4"}, "correctAnswer": "a"}]"#;
        assert!(matches!(
            parse_generated(content, Category::General, Difficulty::Medium),
            Err(GeneratorError::Parse(_))
        ));
        assert!(matches!(
            parse_generated("not json", Category::General, Difficulty::Medium),
            Err(GeneratorError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn generate_calls_chat_completions() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": TWO_QUESTIONS}, "index": 0}]
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let generator = QuestionGenerator::new("test-key", &server.uri()).unwrap();
        let questions = generator.generate(&request()).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].category, Category::Verbal);
    }

    #[tokio::test]
    async fn generate_reports_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let generator = QuestionGenerator::new("bad-key", &server.uri()).unwrap();
        let err = generator.generate(&request()).await.unwrap_err();
        assert!(matches!(err, GeneratorError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn generate_validates_count() {
        let generator = QuestionGenerator::new("key", "http://127.0.0.1:9").unwrap();
        let mut req = request();
        req.count = 0;
        assert!(matches!(
            generator.generate(&req).await,
            Err(GeneratorError::InvalidRequest(_))
        ));
    }
}
