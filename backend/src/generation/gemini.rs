use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::provider::{normalize_descriptor, GenerationProvider};
use super::truncate_for_log;
use crate::error::ProviderError;
use crate::models::{ModelDescriptor, Prompt};

const LIST_PAGE_SIZE: u32 = 1000;
/// Upper bound on listing requests per call
const MAX_LIST_PAGES: usize = 10;

// ===== API RESPONSE STRUCTURES =====

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelListPage {
    #[serde(default)]
    models: Vec<Value>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

/// Gemini `generativelanguage` REST client
pub struct GeminiProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ProviderError> {
        let url = format!("{}/models", self.api_base);
        let mut descriptors = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens: Vec<String> = Vec::new();

        for _ in 0..MAX_LIST_PAGES {
            let mut query = vec![
                ("key", self.api_key.clone()),
                ("pageSize", LIST_PAGE_SIZE.to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let response = self.client.get(&url).query(&query).send().await?;
            let page: ModelListPage = check_status(response).await?.json().await?;
            descriptors.extend(page.models.iter().filter_map(normalize_descriptor));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) if seen_tokens.contains(&token) => {
                    warn!(token = %token, "Model listing repeated a page token, stopping");
                    break;
                }
                Some(token) => {
                    seen_tokens.push(token.clone());
                    page_token = Some(token);
                }
                None => break,
            }
        }
        if page_token.is_some() {
            warn!(pages = MAX_LIST_PAGES, "Model listing truncated at page limit");
        }

        debug!(count = descriptors.len(), "Fetched model list");
        Ok(descriptors)
    }

    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.api_base, model);
        let request_body = build_request_body(prompt);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body)
            .send()
            .await?;

        let gemini_response: GeminiResponse = check_status(response).await?.json().await?;
        let text = extract_text(&gemini_response)?;
        debug!(model, result = %truncate_for_log(&text, 60), "Gemini response");
        Ok(text)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        warn!("Gemini rate limit hit");
        return Err(ProviderError::RateLimited(truncate_for_log(&error_text, 120)));
    }

    Err(ProviderError::Status {
        status: status.as_u16(),
        body: truncate_for_log(&error_text, 120),
    })
}

fn build_request_body(prompt: &Prompt) -> Value {
    let mut parts = Vec::with_capacity(2);
    if let Some(attachment) = &prompt.attachment {
        parts.push(json!({
            "inline_data": {
                "mime_type": attachment.mime_type,
                "data": base64::engine::general_purpose::STANDARD.encode(&attachment.data),
            }
        }));
    }
    parts.push(json!({ "text": prompt.text }));

    json!({
        "contents": [{ "parts": parts }],
        "generationConfig": {
            "temperature": 0.4,
            "maxOutputTokens": 8192,
            "responseMimeType": "application/json"
        }
    })
}

/// Join every text part of the first candidate.
///
/// Blank text from a candidate is returned as-is; only a missing candidate or
/// missing content is an empty response.
fn extract_text(response: &GeminiResponse) -> Result<String, ProviderError> {
    let parts = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| &content.parts)
        .ok_or(ProviderError::EmptyResponse)?;

    Ok(parts.iter().filter_map(|p| p.text.as_deref()).collect())
}
