//! Physical profile types consumed by the metabolic calculator

use serde::{Deserialize, Deserializer, Serialize};

/// ---------------------------------------------------------------------------
/// Realistic Input Ranges
/// ---------------------------------------------------------------------------

pub const WEIGHT_RANGE_KG: (f64, f64) = (30.0, 300.0);
pub const HEIGHT_RANGE_CM: (f64, f64) = (100.0, 250.0);
pub const AGE_RANGE_YEARS: (f64, f64) = (10.0, 120.0);
pub const WEIGHT_CHANGE_RATE_RANGE: (f64, f64) = (0.1, 1.0);

/// ---------------------------------------------------------------------------
/// Enumerations
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
  Male,
  Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
  Sedentary,  // little or no exercise
  Light,      // 1-3 days/week
  Moderate,   // 3-5 days/week
  Active,     // 6-7 days/week
  VeryActive, // physical job or twice-daily training
}

impl ActivityLevel {
  /// Lenient parse for values coming from forms or the backend.
  /// Accepts any case and treats `-` or spaces as `_`.
  pub fn parse(raw: &str) -> Option<Self> {
    let normalized = raw.trim().to_lowercase().replace(['-', ' '], "_");
    match normalized.as_str() {
      "sedentary" => Some(ActivityLevel::Sedentary),
      "light" => Some(ActivityLevel::Light),
      "moderate" => Some(ActivityLevel::Moderate),
      "active" => Some(ActivityLevel::Active),
      "very_active" => Some(ActivityLevel::VeryActive),
      _ => None,
    }
  }

  pub fn multiplier(&self) -> f64 {
    match self {
      ActivityLevel::Sedentary => 1.2,
      ActivityLevel::Light => 1.375,
      ActivityLevel::Moderate => 1.55,
      ActivityLevel::Active => 1.725,
      ActivityLevel::VeryActive => 1.9,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ActivityLevel::Sedentary => "sedentary",
      ActivityLevel::Light => "light",
      ActivityLevel::Moderate => "moderate",
      ActivityLevel::Active => "active",
      ActivityLevel::VeryActive => "very_active",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightGoal {
  Maintain,
  Lose,
  Gain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiStatus {
  Underweight,
  Normal,
  Overweight,
  Obese,
}

impl BmiStatus {
  pub fn label(&self) -> &'static str {
    match self {
      BmiStatus::Underweight => "Underweight",
      BmiStatus::Normal => "Normal",
      BmiStatus::Overweight => "Overweight",
      BmiStatus::Obese => "Obese",
    }
  }
}

/// ---------------------------------------------------------------------------
/// Profile Snapshot
/// ---------------------------------------------------------------------------

/// Immutable input to the calculator. Ranges are documented preconditions;
/// call `validate` to enforce them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
  pub weight_kg: f64,
  pub height_cm: f64,
  pub age_years: u32,
  pub gender: Gender,
  /// `None` when missing or unrecognized; treated as sedentary
  #[serde(default, deserialize_with = "deserialize_activity_level")]
  pub activity_level: Option<ActivityLevel>,
  pub goal: WeightGoal,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_weight_kg: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub weight_change_rate_kg_per_week: Option<f64>,
}

fn deserialize_activity_level<'de, D>(deserializer: D) -> Result<Option<ActivityLevel>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<String> = Option::deserialize(deserializer)?;
  Ok(raw.as_deref().and_then(ActivityLevel::parse))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
  #[error("{field} out of range: {value} (expected {min}..={max})")]
  OutOfRange {
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
  },
}

fn check_range(field: &'static str, value: f64, range: (f64, f64)) -> Result<(), ProfileError> {
  let (min, max) = range;
  // NaN fails `contains`, so it is rejected too
  if (min..=max).contains(&value) {
    Ok(())
  } else {
    Err(ProfileError::OutOfRange { field, value, min, max })
  }
}

impl ProfileSnapshot {
  /// Guard against unrealistic input before it reaches the formulas.
  /// The calculator itself never calls this.
  pub fn validate(&self) -> Result<(), ProfileError> {
    check_range("weightKg", self.weight_kg, WEIGHT_RANGE_KG)?;
    check_range("heightCm", self.height_cm, HEIGHT_RANGE_CM)?;
    check_range("ageYears", self.age_years as f64, AGE_RANGE_YEARS)?;

    if self.goal != WeightGoal::Maintain {
      if let Some(target) = self.target_weight_kg {
        check_range("targetWeightKg", target, WEIGHT_RANGE_KG)?;
      }
      if let Some(rate) = self.weight_change_rate_kg_per_week {
        check_range("weightChangeRateKgPerWeek", rate, WEIGHT_CHANGE_RATE_RANGE)?;
      }
    }

    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Partial Updates
/// ---------------------------------------------------------------------------

/// Partial profile update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub weight_kg: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub height_cm: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub age_years: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gender: Option<Gender>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub activity_level: Option<ActivityLevel>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub goal: Option<WeightGoal>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_weight_kg: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub weight_change_rate_kg_per_week: Option<f64>,
}

impl ProfilePatch {
  pub fn is_empty(&self) -> bool {
    *self == ProfilePatch::default()
  }

  /// Produce a new snapshot with this patch applied. The input is untouched.
  ///
  /// Moving the goal to `Maintain` drops target weight and rate, which only
  /// mean something while losing or gaining.
  pub fn apply(&self, base: &ProfileSnapshot) -> ProfileSnapshot {
    let goal = self.goal.unwrap_or(base.goal);

    let mut next = ProfileSnapshot {
      weight_kg: self.weight_kg.unwrap_or(base.weight_kg),
      height_cm: self.height_cm.unwrap_or(base.height_cm),
      age_years: self.age_years.unwrap_or(base.age_years),
      gender: self.gender.unwrap_or(base.gender),
      activity_level: self.activity_level.or(base.activity_level),
      goal,
      target_weight_kg: self.target_weight_kg.or(base.target_weight_kg),
      weight_change_rate_kg_per_week: self
        .weight_change_rate_kg_per_week
        .or(base.weight_change_rate_kg_per_week),
    };

    if goal == WeightGoal::Maintain {
      next.target_weight_kg = None;
      next.weight_change_rate_kg_per_week = None;
    }

    next
  }
}

/// ---------------------------------------------------------------------------
/// Calculator Output
/// ---------------------------------------------------------------------------

/// Derived daily energy figures in kcal. Values are whole numbers unless the
/// input was malformed, in which case they may be NaN or infinite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetabolicProfile {
  pub bmr: f64,
  pub tdee: f64,
  pub daily_calorie_goal: f64,
}

impl MetabolicProfile {
  /// False when any figure is NaN or infinite and should be shown as unavailable
  pub fn is_available(&self) -> bool {
    self.bmr.is_finite() && self.tdee.is_finite() && self.daily_calorie_goal.is_finite()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BmiReading {
  pub bmi: f64,
  pub status: BmiStatus,
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
