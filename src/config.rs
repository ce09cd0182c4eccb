use std::env;
use std::time::Duration;
use url::Url;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

pub const API_URL_VAR: &str = "NUTRITION_API_URL";
pub const API_TIMEOUT_VAR: &str = "NUTRITION_API_TIMEOUT_SECS";

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("Invalid configuration for {name}: {reason}")]
  Invalid { name: String, reason: String },
}

/// ---------------------------------------------------------------------------
/// Client Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
  /// Stored without a trailing slash
  pub base_url: String,
  /// Applied by the transport only; the session client never times out on its own
  pub timeout: Option<Duration>,
}

impl ClientConfig {
  pub fn new(base_url: &str) -> Result<Self, ConfigError> {
    Ok(Self {
      base_url: normalize_base_url(base_url)?,
      timeout: None,
    })
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  /// Reads `.env` if present, then the process environment
  pub fn from_env() -> Result<Self, ConfigError> {
    dotenvy::dotenv().ok();

    let base_url = env::var(API_URL_VAR)
      .map_err(|_| ConfigError::MissingConfig(API_URL_VAR.into()))?;

    let timeout = match env::var(API_TIMEOUT_VAR) {
      Ok(raw) => {
        let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
          name: API_TIMEOUT_VAR.into(),
          reason: format!("expected whole seconds, got {:?}", raw),
        })?;
        Some(Duration::from_secs(secs))
      }
      Err(_) => None,
    };

    Ok(Self {
      base_url: normalize_base_url(&base_url)?,
      timeout,
    })
  }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
  let trimmed = raw.trim();
  let url = Url::parse(trimmed).map_err(|e| ConfigError::Invalid {
    name: API_URL_VAR.into(),
    reason: e.to_string(),
  })?;

  if url.scheme() != "http" && url.scheme() != "https" {
    return Err(ConfigError::Invalid {
      name: API_URL_VAR.into(),
      reason: format!("unsupported scheme {}", url.scheme()),
    });
  }

  Ok(trimmed.trim_end_matches('/').to_string())
}
