use std::path::PathBuf;

use amumal_core::SCROLL_THRESHOLD;

const DEFAULT_PAGE_SIZE: u32 = 10;
/// Upper bound on posts per request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Client configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub page_size: u32,
    pub session_path: PathBuf,
    pub scroll_threshold: f64,
}

impl Config {
    /// Load configuration from environment variables.
    /// AMUMAL_API_BASE_URL defaults to "http://localhost:8000"
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = std::env::var("AMUMAL_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::BaseUrlScheme(api_base_url));
        }

        let page_size = match std::env::var("AMUMAL_PAGE_SIZE") {
            Ok(v) => parse_page_size(&v)?,
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        let session_path = std::env::var("AMUMAL_SESSION_PATH")
            .unwrap_or_else(|_| "./amumal-session.json".to_string())
            .into();

        let scroll_threshold = match std::env::var("AMUMAL_SCROLL_THRESHOLD") {
            Ok(v) => v
                .parse::<f64>()
                .ok()
                .filter(|t| t.is_finite() && *t >= 0.0)
                .ok_or(ConfigError::ScrollThreshold(v))?,
            Err(_) => SCROLL_THRESHOLD,
        };

        Ok(Config {
            api_base_url,
            page_size,
            session_path,
            scroll_threshold,
        })
    }

    /// Defaults pointed at the given backend.
    pub fn for_base_url(api_base_url: impl Into<String>) -> Self {
        Config {
            api_base_url: api_base_url.into(),
            page_size: DEFAULT_PAGE_SIZE,
            session_path: PathBuf::from("./amumal-session.json"),
            scroll_threshold: SCROLL_THRESHOLD,
        }
    }
}

fn parse_page_size(raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| (1..=MAX_PAGE_SIZE).contains(n))
        .ok_or_else(|| ConfigError::PageSize(raw.to_string()))
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// The backend URL is not http(s).
    BaseUrlScheme(String),
    /// Posts per request must be in `1..=MAX_PAGE_SIZE`.
    PageSize(String),
    ScrollThreshold(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::BaseUrlScheme(url) => write!(
                f,
                "AMUMAL_API_BASE_URL must start with http:// or https://, got {:?}",
                url
            ),
            ConfigError::PageSize(raw) => write!(
                f,
                "AMUMAL_PAGE_SIZE must be between 1 and {}, got {:?}",
                MAX_PAGE_SIZE, raw
            ),
            ConfigError::ScrollThreshold(raw) => write!(
                f,
                "AMUMAL_SCROLL_THRESHOLD must be a non-negative number, got {:?}",
                raw
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
