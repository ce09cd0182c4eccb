//! Deterministic metabolic calculations for daily calorie targets
//!
//! Pure functions only: BMR via Mifflin-St Jeor, TDEE via a fixed activity
//! multiplier table, and a goal-adjusted daily calorie target. Inputs are
//! assumed valid (see `ProfileSnapshot::validate`); malformed numbers
//! propagate as NaN or infinity rather than raising.

use crate::models::{
  ActivityLevel, BmiReading, BmiStatus, Gender, MetabolicProfile, ProfileSnapshot, WeightGoal,
};

/// ---------------------------------------------------------------------------
/// Constants
/// ---------------------------------------------------------------------------

/// Daily deficit or surplus applied for lose/gain goals. Roughly 0.5 kg/week
/// (7700 kcal per kg of fat). Not scaled by the user's selected rate.
pub const GOAL_CALORIE_OFFSET: f64 = 550.0;

const MALE_BMR_OFFSET: f64 = 5.0;
const FEMALE_BMR_OFFSET: f64 = -161.0;

const BMI_UNDERWEIGHT_BELOW: f64 = 18.5;
const BMI_NORMAL_BELOW: f64 = 25.0;
const BMI_OVERWEIGHT_BELOW: f64 = 30.0;

/// ---------------------------------------------------------------------------
/// Energy Expenditure
/// ---------------------------------------------------------------------------

/// Basal Metabolic Rate (Mifflin-St Jeor), rounded to whole kcal.
///
/// Male: `10w + 6.25h - 5a + 5`, female: `10w + 6.25h - 5a - 161`.
pub fn compute_bmr(weight_kg: f64, height_cm: f64, age_years: u32, gender: Gender) -> f64 {
  let offset = match gender {
    Gender::Male => MALE_BMR_OFFSET,
    Gender::Female => FEMALE_BMR_OFFSET,
  };
  (10.0 * weight_kg + 6.25 * height_cm - 5.0 * age_years as f64 + offset).round()
}

/// Multiplier for an activity level; missing or unrecognized levels use sedentary
pub fn activity_multiplier(activity_level: Option<ActivityLevel>) -> f64 {
  activity_level.unwrap_or(ActivityLevel::Sedentary).multiplier()
}

/// Total Daily Energy Expenditure, rounded to whole kcal
pub fn compute_tdee(bmr: f64, activity_level: Option<ActivityLevel>) -> f64 {
  (bmr * activity_multiplier(activity_level)).round()
}

/// Same as `compute_tdee` for a raw label, e.g. straight from a form field
pub fn compute_tdee_for_label(bmr: f64, activity_label: &str) -> f64 {
  compute_tdee(bmr, ActivityLevel::parse(activity_label))
}

pub fn compute_daily_calorie_goal(tdee: f64, goal: WeightGoal) -> f64 {
  match goal {
    WeightGoal::Maintain => tdee,
    WeightGoal::Lose => tdee - GOAL_CALORIE_OFFSET,
    WeightGoal::Gain => tdee + GOAL_CALORIE_OFFSET,
  }
}

/// BMR, TDEE and the daily calorie goal for a profile
pub fn derive_metabolic_profile(snapshot: &ProfileSnapshot) -> MetabolicProfile {
  let bmr = compute_bmr(
    snapshot.weight_kg,
    snapshot.height_cm,
    snapshot.age_years,
    snapshot.gender,
  );
  let tdee = compute_tdee(bmr, snapshot.activity_level);
  let daily_calorie_goal = compute_daily_calorie_goal(tdee, snapshot.goal);

  MetabolicProfile {
    bmr,
    tdee,
    daily_calorie_goal,
  }
}

/// ---------------------------------------------------------------------------
/// Body Mass Index
/// ---------------------------------------------------------------------------

/// BMI rounded to one decimal
pub fn compute_bmi(weight_kg: f64, height_cm: f64) -> f64 {
  let height_m = height_cm / 100.0;
  let bmi = weight_kg / (height_m * height_m);
  (bmi * 10.0).round() / 10.0
}

/// Half-open bands: 18.5 is normal, 25 is overweight, 30 is obese
pub fn classify_bmi(bmi: f64) -> BmiStatus {
  if bmi < BMI_UNDERWEIGHT_BELOW {
    BmiStatus::Underweight
  } else if bmi < BMI_NORMAL_BELOW {
    BmiStatus::Normal
  } else if bmi < BMI_OVERWEIGHT_BELOW {
    BmiStatus::Overweight
  } else {
    BmiStatus::Obese
  }
}

pub fn bmi_for(snapshot: &ProfileSnapshot) -> BmiReading {
  let bmi = compute_bmi(snapshot.weight_kg, snapshot.height_cm);
  BmiReading {
    bmi,
    status: classify_bmi(bmi),
  }
}

/// ---------------------------------------------------------------------------
/// Goal Timeline
/// ---------------------------------------------------------------------------

/// Weeks to reach the target weight at the selected weekly rate, one decimal.
/// Informational only; the calorie goal does not depend on it.
pub fn estimate_weeks_to_target(snapshot: &ProfileSnapshot) -> Option<f64> {
  if snapshot.goal == WeightGoal::Maintain {
    return None;
  }

  match (snapshot.target_weight_kg, snapshot.weight_change_rate_kg_per_week) {
    (Some(target), Some(rate)) if rate > 0.0 => {
      let weeks = (snapshot.weight_kg - target).abs() / rate;
      Some((weeks * 10.0).round() / 10.0)
    }
    _ => None,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
