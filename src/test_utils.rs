//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - A scripted fake transport that records requests
//! - Mock data factories
//! - Helper assertions

use crate::models::{ActivityLevel, Gender, ProfileSnapshot, StoredCredentials, WeightGoal};
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// ---------------------------------------------------------------------------
/// Fake Transport
/// ---------------------------------------------------------------------------

/// Replays scripted responses in order and records every request it sees.
/// Running out of script is reported as a transport failure.
#[derive(Default)]
pub struct FakeTransport {
  script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
  requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn push(&self, response: HttpResponse) {
    self.script.lock().unwrap().push_back(Ok(response));
  }

  pub fn push_error(&self, error: TransportError) {
    self.script.lock().unwrap().push_back(Err(error));
  }

  pub fn requests(&self) -> Vec<HttpRequest> {
    self.requests.lock().unwrap().clone()
  }
}

#[async_trait]
impl Transport for FakeTransport {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    self.requests.lock().unwrap().push(request);
    self
      .script
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| Err(TransportError::Request("no scripted response".into())))
  }
}

pub fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
  HttpResponse {
    status,
    content_type: Some("application/json; charset=utf-8".into()),
    body: body.to_string(),
  }
}

pub fn html_response(status: u16, body: &str) -> HttpResponse {
  HttpResponse {
    status,
    content_type: Some("text/html".into()),
    body: body.into(),
  }
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// 70kg / 175cm / 30y male, moderately active, losing weight.
/// Derives to BMR 1649, TDEE 2556, goal 2006.
pub fn mock_profile_snapshot() -> ProfileSnapshot {
  ProfileSnapshot {
    weight_kg: 70.0,
    height_cm: 175.0,
    age_years: 30,
    gender: Gender::Male,
    activity_level: Some(ActivityLevel::Moderate),
    goal: WeightGoal::Lose,
    target_weight_kg: None,
    weight_change_rate_kg_per_week: None,
  }
}

pub fn mock_credentials(expires_in_minutes: i64) -> StoredCredentials {
  StoredCredentials {
    access_token: "stored-access".into(),
    refresh_token: Some("stored-refresh".into()),
    expires_at: Some(Utc::now() + Duration::minutes(expires_in_minutes)),
  }
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::transport::Method;

  #[tokio::test]
  async fn test_fake_transport_replays_in_order() {
    let fake = FakeTransport::new();
    fake.push(json_response(200, serde_json::json!({"n": 1})));
    fake.push(html_response(500, "oops"));

    let request = HttpRequest {
      method: Method::Get,
      url: "http://fake/a".into(),
      headers: vec![],
      body: None,
    };

    let first = fake.send(request.clone()).await.unwrap();
    let second = fake.send(request.clone()).await.unwrap();
    let third = fake.send(request).await;

    assert_eq!(first.status, 200);
    assert_eq!(second.status, 500);
    assert!(third.is_err());
    assert_eq!(fake.requests().len(), 3);
  }

  #[test]
  fn test_mock_factories_create_valid_data() {
    let snapshot = mock_profile_snapshot();
    assert!(snapshot.validate().is_ok());

    let creds = mock_credentials(60);
    assert!(!creds.needs_refresh());
    assert!(mock_credentials(1).needs_refresh());
  }
}
