//! Token-authenticated API client
//!
//! Holds the in-memory access token, attaches it to every request, and
//! reports HTTP 401 through a single unauthorized callback. It never retries
//! and never refreshes on its own; that belongs to `auth::SessionManager` or
//! whatever owns the callback.

use crate::config::ClientConfig;
use crate::transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport, TransportError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, warn};

/// Invoked with no arguments after a 401 has cleared the token.
/// May fire more than once for one expired session when requests overlap,
/// so implementations must be idempotent.
pub type UnauthorizedCallback = Arc<dyn Fn() + Send + Sync>;

const DEFAULT_UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
const UNEXPECTED_FORMAT_MESSAGE: &str = "Unexpected response format";

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
  /// Response was not JSON, or not the shape the caller asked for
  #[error("{0}")]
  Protocol(String),

  /// HTTP 401; the token has already been cleared
  #[error("{0}")]
  Auth(String),

  /// Any other non-2xx status
  #[error("{message}")]
  Api { status: u16, message: String },

  /// No response received
  #[error("{0}")]
  Network(String),

  #[error("Failed to encode request body: {0}")]
  Serialization(String),
}

impl SessionError {
  pub fn is_auth(&self) -> bool {
    matches!(self, SessionError::Auth(_))
  }

  /// Whether an inline "try again" is appropriate
  pub fn is_retryable(&self) -> bool {
    matches!(self, SessionError::Api { .. } | SessionError::Network(_))
  }

  pub fn status(&self) -> Option<u16> {
    match self {
      SessionError::Auth(_) => Some(401),
      SessionError::Api { status, .. } => Some(*status),
      _ => None,
    }
  }
}

impl From<TransportError> for SessionError {
  fn from(e: TransportError) -> Self {
    SessionError::Network(e.to_string())
  }
}

impl Serialize for SessionError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Session Client
/// ---------------------------------------------------------------------------

pub struct SessionClient {
  base_url: String,
  transport: Arc<dyn Transport>,
  access_token: RwLock<Option<String>>,
  on_unauthorized: Mutex<Option<UnauthorizedCallback>>,
}

impl std::fmt::Debug for SessionClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SessionClient")
      .field("base_url", &self.base_url)
      .field("authenticated", &self.is_authenticated())
      .finish()
  }
}

impl SessionClient {
  /// A trailing `/` on the base URL is dropped so `base + path` stays exact
  pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
    let base_url = base_url.into().trim_end_matches('/').to_string();
    Self {
      base_url,
      transport,
      access_token: RwLock::new(None),
      on_unauthorized: Mutex::new(None),
    }
  }

  pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
    let transport = ReqwestTransport::from_config(config)?;
    Ok(Self::new(config.base_url.clone(), Arc::new(transport)))
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  // ---------------------------------------------------------------------------
  // Session State
  // ---------------------------------------------------------------------------

  /// Takes effect for the next request; requests already in flight keep
  /// whatever header they were sent with.
  pub fn set_access_token(&self, token: Option<String>) {
    let mut slot = self.access_token.write().unwrap_or_else(|e| e.into_inner());
    *slot = token;
  }

  pub fn access_token(&self) -> Option<String> {
    self
      .access_token
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }

  pub fn is_authenticated(&self) -> bool {
    self
      .access_token
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .is_some()
  }

  /// Replaces any previously registered callback
  pub fn set_unauthorized_callback<F>(&self, callback: F)
  where
    F: Fn() + Send + Sync + 'static,
  {
    let mut slot = self.on_unauthorized.lock().unwrap_or_else(|e| e.into_inner());
    *slot = Some(Arc::new(callback));
  }

  pub fn clear_unauthorized_callback(&self) {
    let mut slot = self.on_unauthorized.lock().unwrap_or_else(|e| e.into_inner());
    *slot = None;
  }

  fn handle_unauthorized(&self) {
    self.set_access_token(None);

    // Clone out so the callback runs without holding the lock
    let callback = self
      .on_unauthorized
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clone();

    if let Some(callback) = callback {
      callback();
    }
  }

  // ---------------------------------------------------------------------------
  // Requests
  // ---------------------------------------------------------------------------

  pub async fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<Value>,
  ) -> Result<Value, SessionError> {
    let url = format!("{}{}", self.base_url, path);
    let token = self.access_token();

    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    if let Some(token) = &token {
      headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
    }

    debug!(
      method = method.as_str(),
      path,
      authenticated = token.is_some(),
      "Sending API request"
    );

    let response = self
      .transport
      .send(HttpRequest {
        method,
        url,
        headers,
        body: body.map(|b| b.to_string()),
      })
      .await
      .map_err(|e| {
        warn!(method = method.as_str(), path, "Transport failure: {}", e);
        SessionError::from(e)
      })?;

    debug!(method = method.as_str(), path, status = response.status, "API response");
    self.interpret(method, path, response)
  }

  fn interpret(
    &self,
    method: Method,
    path: &str,
    response: HttpResponse,
  ) -> Result<Value, SessionError> {
    if !response.is_json() {
      error!(
        method = method.as_str(),
        path,
        status = response.status,
        content_type = response.content_type.as_deref().unwrap_or("<none>"),
        "Non-JSON response from API"
      );
      return Err(SessionError::Protocol(UNEXPECTED_FORMAT_MESSAGE.to_string()));
    }

    let payload = response.json().map_err(|e| {
      error!(method = method.as_str(), path, "Malformed JSON from API: {}", e);
      SessionError::Protocol(format!("{}: {}", UNEXPECTED_FORMAT_MESSAGE, e))
    })?;

    if response.status == 401 {
      warn!(method = method.as_str(), path, "Received 401, clearing access token");
      self.handle_unauthorized();
      let message = server_message(&payload).unwrap_or_else(|| DEFAULT_UNAUTHORIZED_MESSAGE.to_string());
      return Err(SessionError::Auth(message));
    }

    if !response.is_success() {
      let status = response.status;
      let message = server_message(&payload)
        .unwrap_or_else(|| format!("Request failed with status {}", status));
      warn!(method = method.as_str(), path, status, "API error: {}", message);
      return Err(SessionError::Api { status, message });
    }

    Ok(unwrap_envelope(payload))
  }

  /// `request` followed by deserialization into `T`
  pub async fn request_as<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    body: Option<Value>,
  ) -> Result<T, SessionError> {
    let value = self.request(method, path, body).await?;
    serde_json::from_value(value).map_err(|e| {
      error!(method = method.as_str(), path, "Response did not match expected shape: {}", e);
      SessionError::Protocol(format!("{}: {}", UNEXPECTED_FORMAT_MESSAGE, e))
    })
  }

  pub async fn get(&self, path: &str) -> Result<Value, SessionError> {
    self.request(Method::Get, path, None).await
  }

  pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, SessionError> {
    self.request(Method::Post, path, Some(encode(body)?)).await
  }

  pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, SessionError> {
    self.request(Method::Put, path, Some(encode(body)?)).await
  }

  pub async fn delete(&self, path: &str) -> Result<Value, SessionError> {
    self.request(Method::Delete, path, None).await
  }

  pub async fn delete_with<B: Serialize + ?Sized>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<Value, SessionError> {
    self.request(Method::Delete, path, Some(encode(body)?)).await
  }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value, SessionError> {
  serde_json::to_value(body).map_err(|e| SessionError::Serialization(e.to_string()))
}

/// Server-provided `message` field, if it is a non-empty string
fn server_message(payload: &Value) -> Option<String> {
  payload
    .get("message")
    .and_then(Value::as_str)
    .filter(|m| !m.is_empty())
    .map(String::from)
}

/// `{success: bool, data: T}` yields `T`; anything else is returned as-is
fn unwrap_envelope(payload: Value) -> Value {
  match payload {
    Value::Object(mut map)
      if map.get("success").map(Value::is_boolean).unwrap_or(false) && map.contains_key("data") =>
    {
      map.remove("data").unwrap_or(Value::Null)
    }
    other => other,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
