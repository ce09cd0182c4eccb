//! HTTP transport seam for the session client
//!
//! `SessionClient` only depends on the `Transport` trait, so tests can swap in
//! a scripted fake. `ReqwestTransport` is the production implementation.

use crate::config::ClientConfig;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// ---------------------------------------------------------------------------
/// Request / Response
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Put,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
    }
  }
}

impl From<Method> for reqwest::Method {
  fn from(method: Method) -> Self {
    match method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Delete => reqwest::Method::DELETE,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
  pub method: Method,
  pub url: String,
  pub headers: Vec<(String, String)>,
  pub body: Option<String>,
}

impl HttpRequest {
  /// Case-insensitive header lookup
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(key, _)| key.eq_ignore_ascii_case(name))
      .map(|(_, value)| value.as_str())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: String,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// `application/json` or any `+json` media type
  pub fn is_json(&self) -> bool {
    self
      .content_type
      .as_deref()
      .map(|ct| {
        let media_type = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        media_type == "application/json" || media_type.ends_with("+json")
      })
      .unwrap_or(false)
  }

  pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::from_str(&self.body)
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

/// Failure before any response was received
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
  #[error("{0}")]
  Request(String),

  #[error("Request timed out")]
  Timeout,
}

impl From<reqwest::Error> for TransportError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      TransportError::Timeout
    } else {
      TransportError::Request(e.to_string())
    }
  }
}

/// ---------------------------------------------------------------------------
/// Transport Trait
/// ---------------------------------------------------------------------------

#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// ---------------------------------------------------------------------------
/// Reqwest Implementation
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
  client: Client,
}

impl ReqwestTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client })
  }

  pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
    match config.timeout {
      Some(timeout) => Self::with_timeout(timeout),
      None => Ok(Self::new()),
    }
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    let mut builder = self.client.request(request.method.into(), &request.url);

    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }

    if let Some(body) = request.body {
      builder = builder.body(body);
    }

    let response = builder.send().await?;

    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let body = response.text().await?;

    Ok(HttpResponse {
      status,
      content_type,
      body,
    })
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
