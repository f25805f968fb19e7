//! AI-assisted ticket categorization.
//!
//! The classifier itself is an external chat-completions service; this module
//! only owns the request/response contract, the timeout, and normalization of
//! the answer. Tests and offline runs plug in their own [`Categorizer`].

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::MAX_CATEGORY_LEN;

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const KNOWN_CATEGORIES: [&str; 8] = [
    "Technical Issue",
    "Account Problem",
    "Feature Request",
    "Bug Report",
    "General Inquiry",
    "Billing Issue",
    "Performance Issue",
    "Security Concern",
];

#[derive(Debug, Clone, Error)]
pub enum CategorizeError {
    #[error("categorization service is not configured (no API key)")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("service returned an empty category")]
    Empty,
}

pub trait Categorizer: Send + Sync {
    fn categorize(&self, title: &str, description: &str) -> Result<String, CategorizeError>;
}

impl<F> Categorizer for F
where
    F: Fn(&str, &str) -> Result<String, CategorizeError> + Send + Sync,
{
    fn categorize(&self, title: &str, description: &str) -> Result<String, CategorizeError> {
        self(title, description)
    }
}

#[derive(Debug, Clone)]
pub struct CategorizerConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

pub struct HttpCategorizer {
    config: CategorizerConfig,
    client: reqwest::blocking::Client,
}

impl HttpCategorizer {
    pub fn new(config: CategorizerConfig) -> Result<Self, CategorizeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CategorizeError::Http(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

pub fn build_prompt(title: &str, description: &str) -> String {
    let mut prompt = String::from(
        "Analyze this support ticket and categorize it into one of these categories:\n",
    );
    for category in KNOWN_CATEGORIES {
        prompt.push_str("- ");
        prompt.push_str(category);
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        "\nTicket Title: {}\nTicket Description: {}\n\nRespond with only the category name.",
        title, description
    ));
    prompt
}

/// Clean up a raw model answer. Known categories are matched
/// case-insensitively and returned in canonical spelling.
pub fn normalize_category(raw: &str) -> Result<String, CategorizeError> {
    let answer = raw.trim().trim_matches(|c| c == '"' || c == '.').trim();
    if answer.is_empty() {
        return Err(CategorizeError::Empty);
    }
    if let Some(known) = KNOWN_CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(answer))
    {
        return Ok(known.to_string());
    }
    if answer.chars().count() > MAX_CATEGORY_LEN {
        return Err(CategorizeError::InvalidResponse(format!(
            "category longer than {} characters",
            MAX_CATEGORY_LEN
        )));
    }
    Ok(answer.to_string())
}

impl Categorizer for HttpCategorizer {
    fn categorize(&self, title: &str, description: &str) -> Result<String, CategorizeError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(CategorizeError::NotConfigured)?;

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "user", "content": build_prompt(title, description)},
            ],
            "max_tokens": 50,
            "temperature": 0.1,
        });

        tracing::debug!(endpoint = %self.config.endpoint, "requesting ticket category");

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    CategorizeError::Timeout(self.config.timeout_secs)
                } else {
                    CategorizeError::Http(format!("request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(CategorizeError::Http(format!(
                "HTTP {} from categorization service",
                response.status()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| CategorizeError::InvalidResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(CategorizeError::Empty)?;

        normalize_category(&content)
    }
}
