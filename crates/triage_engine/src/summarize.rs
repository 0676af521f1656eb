use std::sync::RwLock;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use triage_core::CandidateItem;

use crate::TriageError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummarizeError {
    #[error("no summarizer credentials configured")]
    MissingCredential,
    #[error("summarizer request failed: {0}")]
    Request(String),
}

impl From<SummarizeError> for TriageError {
    fn from(err: SummarizeError) -> Self {
        match err {
            SummarizeError::MissingCredential => TriageError::MissingCredential,
            SummarizeError::Request(message) => TriageError::Summarize(message),
        }
    }
}

#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, item: &CandidateItem) -> Result<String, SummarizeError>;
}

#[derive(Serialize)]
struct SummaryRequest<'a> {
    title: &'a str,
    url: &'a str,
}

#[derive(Deserialize)]
struct SummaryResponse {
    summary: String,
}

#[derive(Debug, Clone, Default)]
struct Credentials {
    endpoint: Option<String>,
    api_key: Option<String>,
}

/// Posts `{title, url}` to a summarization endpoint and expects `{summary}` back.
///
/// Credentials can be replaced while the engine is running.
pub struct HttpSummarizer {
    credentials: RwLock<Credentials>,
    timeout: Duration,
}

impl HttpSummarizer {
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> Self {
        Self {
            credentials: RwLock::new(Credentials { endpoint, api_key }),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn configure(&self, endpoint: Option<String>, api_key: Option<String>) {
        let mut credentials = self.credentials.write().unwrap_or_else(|p| p.into_inner());
        *credentials = Credentials { endpoint, api_key };
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    fn credentials(&self) -> Result<(String, String), SummarizeError> {
        let credentials = self.credentials.read().unwrap_or_else(|p| p.into_inner());
        let usable = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned)
        };
        match (usable(&credentials.endpoint), usable(&credentials.api_key)) {
            (Some(endpoint), Some(api_key)) => Ok((endpoint, api_key)),
            _ => Err(SummarizeError::MissingCredential),
        }
    }
}

#[async_trait::async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, item: &CandidateItem) -> Result<String, SummarizeError> {
        let (endpoint, api_key) = self.credentials()?;
        let body = serde_json::to_vec(&SummaryRequest {
            title: &item.title,
            url: &item.url,
        })
        .map_err(|err| SummarizeError::Request(err.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| SummarizeError::Request(err.to_string()))?;
        let response = client
            .post(&endpoint)
            .bearer_auth(&api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| SummarizeError::Request(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SummarizeError::MissingCredential);
        }
        if !status.is_success() {
            return Err(SummarizeError::Request(format!("http status {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| SummarizeError::Request(err.to_string()))?;
        let parsed: SummaryResponse = serde_json::from_slice(&bytes)
            .map_err(|err| SummarizeError::Request(err.to_string()))?;
        let summary = parsed.summary.trim().to_string();
        if summary.is_empty() {
            return Err(SummarizeError::Request("empty summary".into()));
        }
        Ok(summary)
    }
}
