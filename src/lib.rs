//! Nutrition tracking core
//!
//! Two independent pieces: `metabolic` derives BMR, TDEE and a daily calorie
//! goal from a physical profile, and `session` is the token-authenticated API
//! client every backend call goes through. `auth` layers login, refresh and
//! forced logout on top of the client.

pub mod auth;
pub mod config;
pub mod logging;
pub mod metabolic;
pub mod models;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_utils;

pub use auth::{AuthError, CredentialStore, MemoryCredentialStore, SessionManager};
pub use config::{ClientConfig, ConfigError};
pub use metabolic::{
  classify_bmi, compute_bmi, compute_bmr, compute_daily_calorie_goal, compute_tdee,
  derive_metabolic_profile,
};
pub use models::{
  ActivityLevel, BmiStatus, Gender, MetabolicProfile, ProfilePatch, ProfileSnapshot, WeightGoal,
};
pub use session::{SessionClient, SessionError};
pub use transport::{Method, ReqwestTransport, Transport};
