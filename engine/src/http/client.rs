//! HTTP client implementation

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::EngineError;

/// Thin JSON client bound to one service base URL
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

impl HttpClient {
    /// Create a new HTTP client.
    ///
    /// `headers` are sent with every request; mark secrets sensitive before
    /// passing them in.
    pub fn new(base_url: &str, timeout: Duration, headers: HeaderMap) -> Result<Self, EngineError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| EngineError::ConfigError(format!("invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(EngineError::ConfigError(format!(
                "base URL cannot carry a path: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from path segments, percent-encoding each one.
    ///
    /// Segments containing `/` are split so repository paths can be passed
    /// as-is.
    pub fn endpoint<'a, I>(&self, segments: I) -> Url
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                path.extend(segment.split('/').filter(|s| !s.is_empty()));
            }
        }
        url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, EngineError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::into_json(response, "GET").await
    }

    /// Make a GET request, mapping 404 to `None`
    pub async fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, EngineError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::into_json(response, "GET").await.map(Some)
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, EngineError> {
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        Self::into_json(response, "POST").await
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, EngineError> {
        debug!("PUT {}", url);
        let response = self.client.put(url).json(body).send().await?;
        Self::into_json(response, "PUT").await
    }

    async fn into_json<T: DeserializeOwned>(response: Response, method: &str) -> Result<T, EngineError> {
        let status = response.status();
        if !status.is_success() {
            let url = response.url().clone();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP {} {} failed: {} - {}", method, url, status, body);
            if status == StatusCode::NOT_FOUND {
                return Err(EngineError::NotFound(url.to_string()));
            }
            return Err(EngineError::Internal(format!("{} {}: {}", method, status, body)));
        }

        let body = response.json().await?;
        Ok(body)
    }
}

/// Build a header value, marking it sensitive so it never shows up in debug output
pub fn sensitive_header(value: &str) -> Result<HeaderValue, EngineError> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|e| EngineError::ConfigError(format!("invalid header value: {}", e)))?;
    header.set_sensitive(true);
    Ok(header)
}

/// Insert a static header by name
pub fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), EngineError> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| EngineError::ConfigError(format!("invalid header {}: {}", name, e)))?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}
