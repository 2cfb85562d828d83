use anyhow::Context;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_UPLOAD_URL: &str = "https://0a6ejoevl3.execute-api.us-east-1.amazonaws.com/prod/ping";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// 200 with a JSON body carrying a `joke` field.
    Joke(String),
    /// 200 without a joke.
    Accepted,
    /// Any other status.
    Rejected(u16),
}

/// Forwards a saved record to the collection endpoint.
pub trait Uploader {
    async fn upload(&self, path: &Path) -> anyhow::Result<UploadOutcome>;
}

/// Interpret the endpoint's reply.
pub fn interpret_response(status: u16, body: &str) -> UploadOutcome {
    if status != StatusCode::OK.as_u16() {
        return UploadOutcome::Rejected(status);
    }

    let joke = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("joke").cloned());

    match joke {
        Some(serde_json::Value::String(text)) => UploadOutcome::Joke(text),
        Some(other) => UploadOutcome::Joke(other.to_string()),
        None => UploadOutcome::Accepted,
    }
}

pub struct HttpUploader {
    client: reqwest::Client,
    url: String,
}

impl HttpUploader {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .context("Cannot build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Uploader for HttpUploader {
    async fn upload(&self, path: &Path) -> anyhow::Result<UploadOutcome> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;

        log::debug!("Uploading {} bytes to {}", content.len(), self.url);
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain")
            .body(content)
            .send()
            .await
            .with_context(|| format!("POST to {} failed", self.url))?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Could not read upload response body ({}): {}", status, e);
                String::new()
            }
        };
        log::debug!("Upload answered {}: {} bytes", status, body.len());

        Ok(interpret_response(status, &body))
    }
}
