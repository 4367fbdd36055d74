//! # captcha-autofill
//!
//! Automatic image-captcha filling for browser automation. Watches a captcha
//! `<img>` element, captures its pixels at natural size, sends them to a
//! recognition service, and writes the answer into the associated input
//! field. Re-solves whenever the image's `src` attribute changes.
//!
//! The recognition service is an opaque HTTP collaborator: one multipart
//! `POST` with a PNG file field, answering `{"text": "..."}` or
//! `{"error": "..."}`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use captcha_autofill::{Config, HttpRecognizer, LivePage, Observer, Solver};
//!
//! # #[tokio::main]
//! # async fn main() -> captcha_autofill::Result<()> {
//! let browser = eoka::Browser::launch().await?;
//! let page = browser.new_page("https://example.com/login").await?;
//!
//! let config = Config::default();
//! let adapter = Arc::new(LivePage::new(page, &config));
//! let recognizer = Arc::new(HttpRecognizer::new(&config)?);
//! let solver = Arc::new(Solver::new(adapter.clone(), recognizer, config.clone()));
//!
//! // Runs until the page goes away; solves once now and once per refresh.
//! Observer::new(adapter, solver, config).run().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod live;
mod observer;
mod page;
mod service;
mod solver;

pub use config::Config;
pub use live::LivePage;
pub use observer::Observer;
pub use page::{ImageState, PageAdapter, SourceChange};
pub use service::{HttpRecognizer, Recognizer};
pub use solver::{Outcome, Solver};

/// Result type for captcha-autofill operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while locating, capturing, or solving a captcha.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An element this system depends on is missing from the page. Fatal for
    /// the captcha image (nothing to watch), non-fatal for the input field.
    #[error("target element not found: #{0}")]
    TargetNotFound(String),

    #[error("captcha image failed to load: {0}")]
    ImageLoad(String),

    /// Pixel extraction or PNG encoding produced no data. The common cause
    /// is a cross-origin image the page is not allowed to read back.
    #[error("capture failed: {0}")]
    Capture(String),

    #[error("network error: {0}")]
    Network(String),

    /// The recognition service answered with an explicit `error` field.
    #[error("recognition service error: {0}")]
    Service(String),

    /// The response body was not the expected `{"text"}` / `{"error"}` shape.
    #[error("unexpected recognition service response: {0}")]
    Protocol(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout("recognition service response".into())
        } else {
            Error::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TargetNotFound("captcha_image".into());
        assert_eq!(err.to_string(), "target element not found: #captcha_image");

        let err = Error::Service("busy".into());
        assert_eq!(err.to_string(), "recognition service error: busy");

        let err = Error::Timeout("image load".into());
        assert_eq!(err.to_string(), "timed out waiting for image load");
    }
}
