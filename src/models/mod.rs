pub mod profile;
pub mod session;

pub use profile::{
  ActivityLevel, BmiReading, BmiStatus, Gender, MetabolicProfile, ProfileError, ProfilePatch,
  ProfileSnapshot, WeightGoal,
};
pub use session::{StoredCredentials, TokenResponse};
