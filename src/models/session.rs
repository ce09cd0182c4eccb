use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// Response from the login, register and refresh endpoints.
/// The backend is inconsistent about the access token key, so both spellings are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
  #[serde(alias = "accessToken")]
  pub token: String,
  #[serde(default)]
  pub refresh_token: Option<String>,
  /// seconds
  #[serde(default)]
  pub expires_in: Option<i64>,
  #[serde(default)]
  pub user: Option<serde_json::Value>,
}

/// Out-of-range lifetimes yield `None` (unknown expiry) rather than overflowing
fn expiry_from_now(secs: i64) -> Option<DateTime<Utc>> {
  Duration::try_seconds(secs).and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
}

/// Credentials handed to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
  pub access_token: String,
  pub refresh_token: Option<String>,
  pub expires_at: Option<DateTime<Utc>>,
}

impl StoredCredentials {
  /// Build from a token response. A refresh response that omits the refresh
  /// token keeps the previous one.
  pub fn from_response(resp: TokenResponse, previous_refresh: Option<String>) -> Self {
    Self {
      access_token: resp.token,
      refresh_token: resp.refresh_token.or(previous_refresh),
      expires_at: resp.expires_in.and_then(expiry_from_now),
    }
  }

  /// Unknown expiry never triggers a proactive refresh
  pub fn needs_refresh(&self) -> bool {
    match self.expires_at {
      Some(expires_at) => {
        let buffer = Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES);
        Utc::now() + buffer >= expires_at
      }
      None => false,
    }
  }
}
