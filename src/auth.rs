//! Session management on top of `SessionClient`
//!
//! Owns the refresh token and the persisted credentials, and turns the
//! client's unauthorized callback into a forced logout. Persistence itself is
//! behind `CredentialStore`; the host app supplies the real backend.

use crate::models::{StoredCredentials, TokenResponse};
use crate::session::{SessionClient, SessionError};
use crate::transport::Method;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const REFRESH_PATH: &str = "/auth/refresh";

/// ---------------------------------------------------------------------------
/// Credential Storage
/// ---------------------------------------------------------------------------

pub trait CredentialStore: Send + Sync {
  fn load(&self) -> Option<StoredCredentials>;
  fn save(&self, credentials: &StoredCredentials);
  fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
  credentials: Mutex<Option<StoredCredentials>>,
}

impl MemoryCredentialStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CredentialStore for MemoryCredentialStore {
  fn load(&self) -> Option<StoredCredentials> {
    self
      .credentials
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }

  fn save(&self, credentials: &StoredCredentials) {
    *self.credentials.lock().unwrap_or_else(|e| e.into_inner()) = Some(credentials.clone());
  }

  fn clear(&self) {
    *self.credentials.lock().unwrap_or_else(|e| e.into_inner()) = None;
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
  #[error("Not authenticated")]
  NotAuthenticated,

  #[error("Session expired: {0}")]
  SessionExpired(String),

  #[error(transparent)]
  Session(#[from] SessionError),
}

impl Serialize for AuthError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Session Manager
/// ---------------------------------------------------------------------------

pub type LogoutListener = Arc<dyn Fn() + Send + Sync>;

type Listeners = Arc<Mutex<Vec<LogoutListener>>>;

fn notify_logout(listeners: &Listeners) {
  let snapshot: Vec<LogoutListener> = listeners
    .lock()
    .unwrap_or_else(|e| e.into_inner())
    .clone();
  for listener in snapshot {
    listener();
  }
}

pub struct SessionManager {
  client: Arc<SessionClient>,
  store: Arc<dyn CredentialStore>,
  listeners: Listeners,
}

impl SessionManager {
  /// Takes over the client's unauthorized callback: any 401 clears stored
  /// credentials and notifies logout listeners. A 401 from the login endpoint
  /// itself goes through the same path.
  pub fn new(client: Arc<SessionClient>, store: Arc<dyn CredentialStore>) -> Self {
    let listeners: Listeners = Arc::new(Mutex::new(Vec::new()));

    let callback_store = store.clone();
    let callback_listeners = listeners.clone();
    client.set_unauthorized_callback(move || {
      info!("Server rejected the session, signing out");
      callback_store.clear();
      notify_logout(&callback_listeners);
    });

    Self {
      client,
      store,
      listeners,
    }
  }

  pub fn client(&self) -> &Arc<SessionClient> {
    &self.client
  }

  pub fn is_authenticated(&self) -> bool {
    self.client.is_authenticated()
  }

  /// Listeners run on explicit logout and on forced logout after a 401.
  /// They may run more than once for one expired session.
  pub fn on_logout<F>(&self, listener: F)
  where
    F: Fn() + Send + Sync + 'static,
  {
    self
      .listeners
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .push(Arc::new(listener));
  }

  // ---------------------------------------------------------------------------
  // Sign In
  // ---------------------------------------------------------------------------

  /// Returns the user payload from the response, if the server sent one
  pub async fn login(&self, email: &str, password: &str) -> Result<Option<Value>, AuthError> {
    let body = json!({ "email": email, "password": password });
    let resp: TokenResponse = self
      .client
      .request_as(Method::Post, LOGIN_PATH, Some(body))
      .await?;

    info!("Login succeeded");
    Ok(self.establish(resp, None))
  }

  pub async fn register(
    &self,
    name: &str,
    email: &str,
    password: &str,
  ) -> Result<Option<Value>, AuthError> {
    let body = json!({ "name": name, "email": email, "password": password });
    let resp: TokenResponse = self
      .client
      .request_as(Method::Post, REGISTER_PATH, Some(body))
      .await?;

    info!("Registration succeeded");
    Ok(self.establish(resp, None))
  }

  fn establish(&self, resp: TokenResponse, previous_refresh: Option<String>) -> Option<Value> {
    let user = resp.user.clone();
    let credentials = StoredCredentials::from_response(resp, previous_refresh);
    self.store.save(&credentials);
    self.client.set_access_token(Some(credentials.access_token));
    user
  }

  // ---------------------------------------------------------------------------
  // Restore / Refresh
  // ---------------------------------------------------------------------------

  /// Re-activate persisted credentials at startup, refreshing first when the
  /// access token is about to expire. Returns whether a session is active.
  pub async fn restore(&self) -> Result<bool, AuthError> {
    let Some(credentials) = self.store.load() else {
      return Ok(false);
    };

    if !credentials.needs_refresh() {
      self.client.set_access_token(Some(credentials.access_token));
      return Ok(true);
    }

    if credentials.refresh_token.is_none() {
      info!("Stored access token expired and no refresh token is available");
      self.logout();
      return Ok(false);
    }

    self.refresh().await?;
    Ok(true)
  }

  /// Exchange the stored refresh token for a new access token.
  ///
  /// A 401 or other 4xx rejection ends the session. Network failures and 5xx
  /// responses leave the stored credentials in place so the caller can retry.
  pub async fn refresh(&self) -> Result<(), AuthError> {
    let refresh_token = self
      .store
      .load()
      .and_then(|c| c.refresh_token)
      .ok_or(AuthError::NotAuthenticated)?;

    let body = json!({ "refreshToken": refresh_token });
    match self
      .client
      .request_as::<TokenResponse>(Method::Post, REFRESH_PATH, Some(body))
      .await
    {
      Ok(resp) => {
        info!("Access token refreshed");
        self.establish(resp, Some(refresh_token));
        Ok(())
      }
      // The unauthorized callback has already cleared the session
      Err(e @ SessionError::Auth(_)) => {
        warn!("Refresh token rejected: {}", e);
        Err(AuthError::SessionExpired(e.to_string()))
      }
      Err(e @ SessionError::Api { status: 400..=499, .. }) => {
        warn!("Refresh token rejected: {}", e);
        self.logout();
        Err(AuthError::SessionExpired(e.to_string()))
      }
      Err(e) => Err(e.into()),
    }
  }

  // ---------------------------------------------------------------------------
  // Sign Out
  // ---------------------------------------------------------------------------

  /// Local only; the server is not contacted
  pub fn logout(&self) {
    self.client.set_access_token(None);
    self.store.clear();
    info!("Signed out");
    notify_logout(&self.listeners);
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::logging;
  use crate::test_utils::{json_response, mock_credentials, FakeTransport};
  use crate::transport::TransportError;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct Harness {
    fake: Arc<FakeTransport>,
    store: Arc<MemoryCredentialStore>,
    manager: SessionManager,
    logouts: Arc<AtomicUsize>,
  }

  fn harness() -> Harness {
    logging::init_test();
    let fake = FakeTransport::new();
    let client = Arc::new(SessionClient::new("https://api.example.test/api", fake.clone()));
    let store = Arc::new(MemoryCredentialStore::new());
    let manager = SessionManager::new(client, store.clone());

    let logouts = Arc::new(AtomicUsize::new(0));
    let counter = logouts.clone();
    manager.on_logout(move || {
      counter.fetch_add(1, Ordering::SeqCst);
    });

    Harness {
      fake,
      store,
      manager,
      logouts,
    }
  }

  fn sent_json(fake: &FakeTransport, index: usize) -> Value {
    serde_json::from_str(fake.requests()[index].body.as_deref().unwrap()).unwrap()
  }

  #[tokio::test]
  async fn test_login_stores_credentials_and_sets_token() {
    let h = harness();
    h.fake.push(json_response(
      200,
      json!({"success": true, "data": {
        "token": "access-1",
        "refreshToken": "refresh-1",
        "expiresIn": 3600,
        "user": {"id": 7, "name": "Sam"}
      }}),
    ));
    h.fake.push(json_response(200, json!({})));

    let user = h.manager.login("sam@example.test", "hunter2").await.unwrap();
    assert_eq!(user, Some(json!({"id": 7, "name": "Sam"})));
    assert!(h.manager.is_authenticated());

    let stored = h.store.load().unwrap();
    assert_eq!(stored.access_token, "access-1");
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
    assert!(!stored.needs_refresh());

    let login = &h.fake.requests()[0];
    assert_eq!(login.url, "https://api.example.test/api/auth/login");
    assert_eq!(
      sent_json(&h.fake, 0),
      json!({"email": "sam@example.test", "password": "hunter2"})
    );

    h.manager.client().get("/users/profile").await.unwrap();
    assert_eq!(h.fake.requests()[1].header("authorization"), Some("Bearer access-1"));
  }

  #[tokio::test]
  async fn test_login_with_oversized_lifetime_has_unknown_expiry() {
    let h = harness();
    h.fake.push(json_response(200, json!({"token": "t", "expiresIn": 9000000000000000i64})));

    h.manager.login("sam@example.test", "pw").await.unwrap();
    assert!(h.manager.is_authenticated());
    assert_eq!(h.store.load().unwrap().expires_at, None);
  }

  #[tokio::test]
  async fn test_register_accepts_bare_response() {
    let h = harness();
    h.fake.push(json_response(201, json!({"accessToken": "access-2"})));

    let user = h.manager.register("Sam", "sam@example.test", "pw").await.unwrap();
    assert_eq!(user, None);
    assert_eq!(h.manager.client().access_token().as_deref(), Some("access-2"));
    assert_eq!(h.fake.requests()[0].url, "https://api.example.test/api/auth/register");
  }

  #[tokio::test]
  async fn test_login_rejected_surfaces_server_message() {
    let h = harness();
    h.fake.push(json_response(400, json!({"message": "Invalid credentials"})));

    let err = h.manager.login("sam@example.test", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid credentials");
    assert!(!h.manager.is_authenticated());
    assert!(h.store.load().is_none());
  }

  #[tokio::test]
  async fn test_unauthorized_response_forces_logout() {
    let h = harness();
    h.store.save(&mock_credentials(60));
    assert!(h.manager.restore().await.unwrap());

    h.fake.push(json_response(401, json!({"message": "Token revoked"})));
    let err = h.manager.client().get("/meals").await.unwrap_err();

    assert!(err.is_auth());
    assert!(!h.manager.is_authenticated());
    assert!(h.store.load().is_none());
    assert_eq!(h.logouts.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_restore_without_credentials() {
    let h = harness();
    assert!(!h.manager.restore().await.unwrap());
    assert!(h.fake.requests().is_empty());
  }

  #[tokio::test]
  async fn test_restore_fresh_credentials_skips_network() {
    let h = harness();
    h.store.save(&mock_credentials(60));

    assert!(h.manager.restore().await.unwrap());
    assert_eq!(h.manager.client().access_token().as_deref(), Some("stored-access"));
    assert!(h.fake.requests().is_empty());
  }

  #[tokio::test]
  async fn test_restore_expiring_credentials_refreshes() {
    let h = harness();
    h.store.save(&mock_credentials(1));
    h.fake.push(json_response(200, json!({"token": "access-new", "expiresIn": 3600})));

    assert!(h.manager.restore().await.unwrap());

    let request = &h.fake.requests()[0];
    assert_eq!(request.url, "https://api.example.test/api/auth/refresh");
    assert_eq!(sent_json(&h.fake, 0), json!({"refreshToken": "stored-refresh"}));

    let stored = h.store.load().unwrap();
    assert_eq!(stored.access_token, "access-new");
    // server did not rotate the refresh token
    assert_eq!(stored.refresh_token.as_deref(), Some("stored-refresh"));
    assert_eq!(h.manager.client().access_token().as_deref(), Some("access-new"));
  }

  #[tokio::test]
  async fn test_restore_expired_without_refresh_token_signs_out() {
    let h = harness();
    let mut creds = mock_credentials(1);
    creds.refresh_token = None;
    h.store.save(&creds);

    assert!(!h.manager.restore().await.unwrap());
    assert!(h.store.load().is_none());
    assert_eq!(h.logouts.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_refresh_rejected_ends_session() {
    let h = harness();
    h.store.save(&mock_credentials(60));
    h.fake.push(json_response(401, json!({"message": "Refresh token expired"})));

    let err = h.manager.refresh().await.unwrap_err();
    assert!(matches!(err, AuthError::SessionExpired(_)));
    assert!(!h.manager.is_authenticated());
    assert!(h.store.load().is_none());
    // one failed request, one logout notification
    assert_eq!(h.logouts.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_refresh_client_error_ends_session_once() {
    let h = harness();
    h.store.save(&mock_credentials(60));
    h.fake.push(json_response(400, json!({"message": "Unknown refresh token"})));

    let err = h.manager.refresh().await.unwrap_err();
    assert!(matches!(err, AuthError::SessionExpired(_)));
    assert!(h.store.load().is_none());
    assert_eq!(h.logouts.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_refresh_network_failure_keeps_credentials() {
    let h = harness();
    h.store.save(&mock_credentials(60));
    h.fake.push_error(TransportError::Timeout);

    let err = h.manager.refresh().await.unwrap_err();
    assert!(matches!(err, AuthError::Session(SessionError::Network(_))));
    assert!(h.store.load().is_some());
    assert_eq!(h.logouts.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_refresh_server_error_keeps_credentials() {
    let h = harness();
    h.store.save(&mock_credentials(60));
    h.fake.push(json_response(503, json!({"message": "Maintenance"})));

    let err = h.manager.refresh().await.unwrap_err();
    assert_eq!(err.to_string(), "Maintenance");
    assert!(h.store.load().is_some());
  }

  #[tokio::test]
  async fn test_refresh_without_refresh_token() {
    let h = harness();
    let err = h.manager.refresh().await.unwrap_err();
    assert!(matches!(err, AuthError::NotAuthenticated));
    assert!(h.fake.requests().is_empty());
  }

  #[tokio::test]
  async fn test_logout_clears_everything() {
    let h = harness();
    h.store.save(&mock_credentials(60));
    h.manager.restore().await.unwrap();

    h.manager.logout();
    assert!(!h.manager.is_authenticated());
    assert!(h.store.load().is_none());
    assert_eq!(h.logouts.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_auth_error_serializes_as_message() {
    let err = AuthError::SessionExpired("Refresh token expired".into());
    assert_eq!(
      serde_json::to_string(&err).unwrap(),
      r#""Session expired: Refresh token expired""#
    );
  }
}
