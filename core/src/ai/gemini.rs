use super::retry::{parse_retry_after, retry_hint_from_error_body};
use super::{LanguagePair, TranslationError, Translator};
use async_trait::async_trait;
use log::debug;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, SystemTime};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Translation client backed by the Gemini `generateContent` endpoint.
///
/// One request per string, single candidate, JSON-typed string output so the
/// candidate text decodes directly into the translation. After each
/// successful call the client sleeps a fixed pacing delay to stay under the
/// free-tier rate limits.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model_id: String,
    pacing: Duration,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build gemini http client");

        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model_id: model_id.into(),
            pacing: Duration::from_secs(1),
        }
    }

    /// Points the client at a different API root. Used by tests to target a
    /// local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model_id)
    }

    fn request_body(&self, text: &str, pair: &LanguagePair) -> Value {
        let instruction = format!(
            "You are a helpful assistant that translates {} to {}. \
             Only return the {} translation, nothing else.",
            pair.source, pair.target, pair.target
        );

        serde_json::json!({
            "systemInstruction": {
                "parts": [{ "text": instruction }]
            },
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": text }]
                }
            ],
            "generationConfig": {
                "temperature": 1.5,
                "topP": 0.95,
                "topK": 40,
                "maxOutputTokens": 1000,
                "candidateCount": 1,
                "responseMimeType": "application/json",
                "responseSchema": { "type": "STRING" }
            }
        })
    }

    fn map_failure(
        &self,
        status: StatusCode,
        retry_after: Option<Duration>,
        body: &str,
    ) -> TranslationError {
        let message = summarize_error_body(body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                TranslationError::InvalidApiKey { message }
            }
            StatusCode::NOT_FOUND => TranslationError::ModelForbiddenOrNotFound {
                model_id: self.model_id.clone(),
                message,
            },
            StatusCode::TOO_MANY_REQUESTS => TranslationError::RateLimited {
                message,
                retry_hint: retry_after.or_else(|| retry_hint_from_error_body(body)),
            },
            _ => TranslationError::NetworkOrHttp {
                message: format!("HTTP {status}: {message}"),
            },
        }
    }
}

#[async_trait]
impl Translator for GeminiClient {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn translate(
        &self,
        text: &str,
        pair: &LanguagePair,
    ) -> Result<String, TranslationError> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(text, pair))
            .send()
            .await
            .map_err(|error| TranslationError::NetworkOrHttp {
                message: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| parse_retry_after(raw, SystemTime::now()));
            let body = response.text().await.unwrap_or_default();
            return Err(self.map_failure(status, retry_after, &body));
        }

        let payload = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|error| TranslationError::NetworkOrHttp {
                message: format!("malformed response body: {error}"),
            })?;

        let raw = payload.first_text().ok_or(TranslationError::EmptyResponse)?;
        let translated = decode_translation(&raw);
        if translated.is_empty() {
            return Err(TranslationError::EmptyResponse);
        }

        debug!("gemini: {text} -> {translated}");

        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }

        Ok(translated)
    }
}

/// The model is asked for a JSON string, so the candidate text is normally a
/// quoted value like `"Xin chào"`. Models occasionally ignore the schema and
/// return plain text; that is accepted as-is.
fn decode_translation(raw: &str) -> String {
    let trimmed = raw.trim();
    serde_json::from_str::<String>(trimmed)
        .map(|decoded| decoded.trim().to_string())
        .unwrap_or_else(|_| trimmed.to_string())
}

/// Pulls `error.message` out of a JSON error body, falling back to a
/// truncated copy of the raw text.
fn summarize_error_body(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
        {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.len() > 200 {
        let mut end = 200;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &trimmed[..end])
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<String> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.text.clone())
            .filter(|text| !text.trim().is_empty())
    }
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
