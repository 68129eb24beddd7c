use super::TextGenerator;
use async_trait::async_trait;
use ohno::{IntoAppError, app_err};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "    gemini";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// [`TextGenerator`] backed by the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> crate::Result<Self> {
        let mut key = HeaderValue::from_str(api_key)?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        let _ = headers.insert("x-goog-api-key", key);

        Ok(Self {
            client: reqwest::Client::builder().user_agent("fanstat").default_headers(headers).build()?,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> crate::Result<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        log::debug!(target: LOG_TARGET, "Prompting {}", self.model);

        let request = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .into_app_err("sending Gemini request")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(app_err!("Gemini request failed with HTTP status {status}"));
        }

        let body: GenerateResponse = resp.json().await.into_app_err("parsing Gemini response")?;
        let text: String = body
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .map(|part| part.text)
            .collect();

        if text.trim().is_empty() {
            return Err(app_err!("Gemini returned no text"));
        }

        Ok(text)
    }
}
