use crate::error::{ImageError, Result};
use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_IMAGES_PATH: &str = "/v1/images/generations";

/// Where and how to reach the image generation endpoint.
#[derive(Clone)]
pub struct EndpointConfig {
    pub base_url: String,
    pub path: String,
    pub api_key: String,
    pub timeout: Option<Duration>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            path: DEFAULT_IMAGES_PATH.to_string(),
            api_key: String::new(),
            timeout: None,
        }
    }
}

impl EndpointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_IMAGES_PATH` and
    /// `OPENAI_TIMEOUT_SECS`, falling back to the defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url);
        let path = env::var("OPENAI_IMAGES_PATH").unwrap_or(defaults.path);
        let api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        let timeout = env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs);

        EndpointConfig {
            base_url,
            path,
            api_key,
            timeout,
        }
    }

    /// Like [`EndpointConfig::from_env`] but refuses to run without an API key.
    pub fn from_env_strict() -> Result<Self> {
        let config = Self::from_env();
        if config.api_key.trim().is_empty() {
            return Err(ImageError::Config("OPENAI_API_KEY is not set".into()));
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() {
            "<unset>".to_string()
        } else {
            format!("{}...", self.api_key.chars().take(3).collect::<String>())
        };

        f.debug_struct("EndpointConfig")
            .field("base_url", &self.base_url)
            .field("path", &self.path)
            .field("api_key", &key)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_images_endpoint() {
        let config = EndpointConfig::new();
        assert_eq!(config.base_url, "https://api.openai.com");
        assert_eq!(config.path, "/v1/images/generations");
        assert!(config.api_key.is_empty());
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = EndpointConfig::new()
            .with_base_url("http://localhost:8080")
            .with_path("/images")
            .with_api_key("sk-test")
            .with_timeout(Duration::from_secs(30));

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.path, "/images");
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = EndpointConfig::new().with_api_key("sk-very-secret");
        let printed = format!("{:?}", config);
        assert!(printed.contains("sk-..."));
        assert!(!printed.contains("very-secret"));
    }
}
