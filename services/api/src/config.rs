use reqwest::Url;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing::Level;

/// File name of the widget HTML inside the public directory.
pub const WIDGET_FILE: &str = "inkmatch-widget.html";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Credential for the prediction service. Generation is disabled without it.
    pub replicate_api_token: Option<String>,
    /// Base of the handoff links returned by the preview tool.
    pub inkmatch_url: Url,
    pub public_dir: PathBuf,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let host_str = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let host = host_str
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidValue("HOST".to_string(), e.to_string()))?;

        let port_str = std::env::var("PORT").unwrap_or_else(|_| "8787".to_string());
        let port = port_str
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), e.to_string()))?;

        let replicate_api_token = std::env::var("REPLICATE_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        let inkmatch_url_str =
            std::env::var("INKMATCH_URL").unwrap_or_else(|_| "https://inkmatch.io".to_string());
        let inkmatch_url = Url::parse(&inkmatch_url_str)
            .map_err(|e| ConfigError::InvalidValue("INKMATCH_URL".to_string(), e.to_string()))?;

        let public_dir = std::env::var("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./public"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address: SocketAddr::new(host, port),
            replicate_api_token,
            inkmatch_url,
            public_dir,
            log_level,
        })
    }

    pub fn widget_path(&self) -> PathBuf {
        self.public_dir.join(WIDGET_FILE)
    }
}
