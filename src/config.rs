//! Runtime configuration — service endpoint, element ids, timing.

use crate::Result;
use serde::Deserialize;
use std::path::Path;

/// Configuration for one captcha widget.
///
/// Every field has a default matching the common single-captcha login form,
/// so `Config::default()` works out of the box against a local recognition
/// server. Override via YAML or the CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Recognition service endpoint (multipart POST, one PNG file field).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// DOM id of the captcha `<img>` element.
    #[serde(default = "default_image_id")]
    pub image_id: String,

    /// DOM id of the input element that receives the solved text.
    #[serde(default = "default_input_id")]
    pub input_id: String,

    /// Delay before the first solve, letting the page's own scripts finish
    /// setting up the image.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on waiting for the image to finish loading.
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,

    /// Upper bound on the recognition service round trip.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How often the live adapter polls the page for `src` mutations.
    #[serde(default = "default_watch_poll_ms")]
    pub watch_poll_ms: u64,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:5000/solve_captcha".into()
}

fn default_image_id() -> String {
    "captcha_image".into()
}

fn default_input_id() -> String {
    "captcha".into()
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_load_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_watch_poll_ms() -> u64 {
    250
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            image_id: default_image_id(),
            input_id: default_input_id(),
            initial_delay_ms: default_initial_delay_ms(),
            load_timeout_ms: default_load_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            watch_poll_ms: default_watch_poll_ms(),
        }
    }
}

impl Config {
    /// Load config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse config from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.endpoint, "http://127.0.0.1:5000/solve_captcha");
        assert_eq!(config.image_id, "captcha_image");
        assert_eq!(config.input_id, "captcha");
        assert_eq!(config.initial_delay_ms, 500);
        assert_eq!(config.load_timeout_ms, 10_000);
        assert_eq!(config.request_timeout_ms, 30_000);
        assert_eq!(config.watch_poll_ms, 250);
    }

    #[test]
    fn test_parse_empty_document_matches_defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config.endpoint, Config::default().endpoint);
        assert_eq!(config.image_id, Config::default().image_id);
    }

    #[test]
    fn test_parse_overrides() {
        let yaml = r#"
endpoint: "http://solver.internal:8080/recognize"
image_id: "cap-img"
input_id: "cap-answer"
initial_delay_ms: 1000
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.endpoint, "http://solver.internal:8080/recognize");
        assert_eq!(config.image_id, "cap-img");
        assert_eq!(config.input_id, "cap-answer");
        assert_eq!(config.initial_delay_ms, 1000);
        // Untouched fields keep their defaults
        assert_eq!(config.load_timeout_ms, 10_000);
    }

    #[test]
    fn test_parse_invalid_yaml() {
        assert!(Config::parse("endpoint: [not a string").is_err());
    }
}
