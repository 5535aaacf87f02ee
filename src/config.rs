use std::env;
use std::time::Duration;

use crate::error::LessonError;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `LEZIONI_API_URL` and the optional `LEZIONI_API_TIMEOUT_SECS`.
    pub fn new_from_env() -> Result<Self, LessonError> {
        let base_url = env::var("LEZIONI_API_URL")
            .map_err(|_| LessonError::Config("LEZIONI_API_URL is not set".to_string()))?;

        let timeout = match env::var("LEZIONI_API_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                LessonError::Config(format!("LEZIONI_API_TIMEOUT_SECS is not a number: {raw}"))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self::new(base_url).with_timeout(Duration::from_secs(timeout)))
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let config = ApiConfig::new("http://localhost:4000/api/");
        assert_eq!(config.url("/lezioni/3"), "http://localhost:4000/api/lezioni/3");
        assert_eq!(config.url("lezioni"), "http://localhost:4000/api/lezioni");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
