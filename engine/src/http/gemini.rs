//! Gemini text generation client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::EngineError;
use crate::http::client::{sensitive_header, HttpClient};
use crate::services::TextGenerator;

/// Text generation through the Generative Language `generateContent` endpoint
pub struct GeminiClient {
    http: HttpClient,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
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
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &SecretString,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", sensitive_header(api_key.expose_secret())?);

        Ok(Self {
            http: HttpClient::new(base_url, timeout, headers)?,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, EngineError> {
        let action = format!("{}:generateContent", self.model);
        let url = self.http.endpoint(["models", action.as_str()]);
        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        };

        debug!("Requesting generation from {} ({} prompt chars)", self.model, prompt.len());
        let response: GenerateResponse = self
            .http
            .post(url, &body)
            .await
            .map_err(|e| EngineError::GenerationError(e.to_string()))?;

        response
            .into_text()
            .ok_or_else(|| EngineError::GenerationError("response contained no text".to_string()))
    }
}
