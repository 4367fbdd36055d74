//! Recognition service client — one multipart POST, one JSON answer.

use crate::{Config, Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Converts a captcha image into its text answer.
///
/// [`HttpRecognizer`] is the production implementation; tests swap in a
/// canned one.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, png: &[u8]) -> Result<String>;
}

/// Wire shape of the recognition service's answer.
#[derive(Debug, Deserialize)]
struct SolveResponse {
    text: Option<String>,
    error: Option<String>,
}

/// HTTP client for the recognition service.
///
/// Protocol: `POST` with a single multipart file field named `file`
/// (PNG bytes, arbitrary filename), answered with `{"text": "<answer>"}`
/// on success or `{"error": "<message>"}` on failure. Any non-2xx status
/// is a transport failure.
pub struct HttpRecognizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRecognizer {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(&self, png: &[u8]) -> Result<String> {
        let part = Part::bytes(png.to_vec())
            .file_name("captcha.png")
            .mime_str("image/png")?;
        let form = Form::new().part("file", part);

        debug!(endpoint = %self.endpoint, bytes = png.len(), "submitting captcha image");
        let response = self.client.post(&self.endpoint).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "recognition service returned {}",
                status
            )));
        }

        let body = response.text().await?;
        parse_body(&body)
    }
}

/// Decode the service's JSON answer into the solved text.
fn parse_body(body: &str) -> Result<String> {
    let response: SolveResponse =
        serde_json::from_str(body).map_err(|e| Error::Protocol(e.to_string()))?;
    if let Some(error) = response.error {
        return Err(Error::Service(error));
    }
    response
        .text
        .ok_or_else(|| Error::Protocol("response has neither text nor error".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_solved_text() {
        assert_eq!(parse_body(r#"{"text": "AB12"}"#).unwrap(), "AB12");
    }

    #[test]
    fn test_parse_service_error() {
        let err = parse_body(r#"{"error": "busy"}"#).unwrap_err();
        assert!(matches!(err, Error::Service(ref msg) if msg == "busy"));
    }

    #[test]
    fn test_error_field_wins_over_text() {
        // A response carrying both is still a failure.
        let err = parse_body(r#"{"text": "AB12", "error": "model not loaded"}"#).unwrap_err();
        assert!(matches!(err, Error::Service(_)));
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(parse_body("<html>"), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_parse_empty_object() {
        assert!(matches!(parse_body("{}"), Err(Error::Protocol(_))));
    }
}
