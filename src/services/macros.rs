// ABOUTME: Macro target arithmetic: check-in delta clamping and formula-based targets
// ABOUTME: Mifflin-St Jeor fallback used when the macro generation prompt returns nothing usable
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use fitai_core::constants::macros::{
    MAX_CALORIE_DELTA, MAX_CARB_DELTA, MAX_FAT_DELTA, MAX_PROTEIN_DELTA, MIN_CALORIES,
};
use fitai_core::constants::prompts::MACRO_GENERATION;
use fitai_core::errors::{AppError, AppResult};
use fitai_core::models::{lenient_number, MacroTargets};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{instrument, warn};

use crate::database::{Database, ProfileRecord};
use crate::llm::LlmProvider;
use crate::services::prompt_runner::{parse_json_output, run_prompt};

/// Non-finite changes count as no change
fn clamp_field(value: f64, bound: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-bound, bound)
    } else {
        0.0
    }
}

/// Clamp each field of a suggested change to its allowed range
#[must_use]
pub fn clamp_delta(delta: &MacroTargets) -> MacroTargets {
    MacroTargets {
        calories: clamp_field(delta.calories, MAX_CALORIE_DELTA),
        protein: clamp_field(delta.protein, MAX_PROTEIN_DELTA),
        carbs: clamp_field(delta.carbs, MAX_CARB_DELTA),
        fats: clamp_field(delta.fats, MAX_FAT_DELTA),
    }
}

/// Add a delta to current targets, flooring calories and non-negative macros
#[must_use]
pub fn apply_delta(current: &MacroTargets, delta: &MacroTargets) -> MacroTargets {
    let summed = current.add(delta);
    MacroTargets {
        calories: summed.calories.max(MIN_CALORIES),
        protein: summed.protein.max(0.0),
        carbs: summed.carbs.max(0.0),
        fats: summed.fats.max(0.0),
    }
}

/// Activity multiplier for a weekly training frequency
fn activity_factor(training_days: f64) -> f64 {
    match training_days {
        d if d >= 6.0 => 1.725,
        d if d >= 4.0 => 1.55,
        d if d >= 2.0 => 1.375,
        _ => 1.2,
    }
}

/// Calorie adjustment for a goal description
fn goal_adjustment(goal: &str) -> f64 {
    let goal = goal.to_lowercase();
    if ["lose", "cut", "fat", "lean", "weight loss"]
        .iter()
        .any(|k| goal.contains(k))
    {
        -500.0
    } else if ["gain", "bulk", "muscle", "build", "mass"]
        .iter()
        .any(|k| goal.contains(k))
    {
        300.0
    } else {
        0.0
    }
}

fn round_whole(value: f64) -> f64 {
    value.round()
}

/// Targets from Mifflin-St Jeor BMR, training frequency and goal
///
/// Missing body stats default to 70 kg, 170 cm and 30 years. Protein is set
/// at 2 g/kg, fat at 25% of energy, carbs take the remainder.
#[must_use]
pub fn formula_macros(profile: &ProfileRecord) -> MacroTargets {
    let weight = profile.weight_kg.filter(|w| *w > 0.0).unwrap_or(70.0);
    let height = profile.height_cm.filter(|h| *h > 0.0).unwrap_or(170.0);
    let age = profile.age.filter(|a| *a > 0).unwrap_or(30) as f64;

    let sex = profile
        .sex
        .clone()
        .or_else(|| {
            profile
                .preferences
                .get("gender")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_default()
        .to_lowercase();
    let sex_offset = if sex.starts_with('m') {
        5.0
    } else if sex.starts_with('f') || sex.starts_with('w') {
        -161.0
    } else {
        -78.0
    };

    let bmr = 10.0f64.mul_add(weight, 6.25 * height) - 5.0 * age + sex_offset;
    let training_days = lenient_number(profile.preferences.get("training_days"));
    let calories = (bmr * activity_factor(training_days)
        + goal_adjustment(profile.goal.as_deref().unwrap_or_default()))
    .max(MIN_CALORIES);

    let protein = 2.0 * weight;
    let fats = calories * 0.25 / 9.0;
    let carbs = ((calories - protein * 4.0 - fats * 9.0) / 4.0).max(0.0);

    MacroTargets {
        calories: round_whole(calories),
        protein: round_whole(protein),
        carbs: round_whole(carbs),
        fats: round_whole(fats),
    }
}

/// Accept model output only when it holds positive calories
#[must_use]
pub fn usable_macros(value: &Value) -> Option<MacroTargets> {
    let source = value.get("macros").unwrap_or(value);
    MacroTargets::from_value(source).filter(|m| m.calories > 0.0)
}

/// Where generated targets came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MacroSource {
    Ai,
    Formula,
}

/// Generated and stored targets
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedMacros {
    pub macros: MacroTargets,
    pub source: MacroSource,
}

/// Ask the model for targets, fall back to the formula, and store the result
///
/// A failed prompt is treated like unusable output.
///
/// # Errors
///
/// Returns `ResourceNotFound` without a profile, or an error if the write fails
#[instrument(skip(database, llm))]
pub async fn generate_for_profile(
    database: &Database,
    llm: &dyn LlmProvider,
    user_id: &str,
) -> AppResult<GeneratedMacros> {
    let profiles = database.profiles();
    let profile = profiles
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Profile"))?;

    let inputs = json!({ "profile": profile });
    let from_model = match run_prompt(database, llm, MACRO_GENERATION, Some(user_id), &inputs).await
    {
        Ok(output) => parse_json_output(&output).as_ref().and_then(usable_macros),
        Err(e) => {
            warn!(user_id, error = %e.message, "Macro generation prompt failed");
            None
        }
    };

    let generated = from_model.map_or_else(
        || GeneratedMacros {
            macros: formula_macros(&profile),
            source: MacroSource::Formula,
        },
        |macros| GeneratedMacros {
            macros,
            source: MacroSource::Ai,
        },
    );

    profiles.set_macros(user_id, &json!(generated.macros)).await?;
    Ok(generated)
}
