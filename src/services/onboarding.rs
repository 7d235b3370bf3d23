// ABOUTME: Onboarding intake processing: unit conversion, equipment resolution and starter plan
// ABOUTME: Writes the audit row, profile, coach interest and an AI-generated starter template
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use fitai_core::constants::prompts::WORKOUT_GENERATION;
use fitai_core::constants::units::{CM_PER_FOOT, CM_PER_INCH, KG_PER_POUND};
use fitai_core::errors::AppResult;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::database::{Database, ProfileUpdate};
use crate::llm::LlmProvider;
use crate::services::{identity, prompt_runner};

/// Step index recorded for a submitted intake form
const FINAL_STEP: i64 = 5;

/// Accept a JSON string or number and keep its text form
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

const fn default_true() -> bool {
    true
}

fn default_gym_access() -> String {
    "full_gym".to_owned()
}

/// Intake form as sent by the mobile app
///
/// Numeric answers arrive as free text and are parsed leniently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnboardingForm {
    #[serde(default, skip_serializing)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub height_feet: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub height_inches: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub weight_lbs: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub training_days: i64,
    #[serde(default = "default_gym_access")]
    pub gym_access: String,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub checkin_day: Option<String>,
    #[serde(default)]
    pub has_injury: bool,
    #[serde(default)]
    pub injury_notes: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub macro_protein: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub macro_carbs: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub macro_fats: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub macro_calories: Option<String>,
    #[serde(default = "default_true")]
    pub photos_pending: bool,
    #[serde(default)]
    pub coach_interest: bool,
    #[serde(default)]
    pub wants_to_coach: bool,
}

/// Result of a completed intake
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingOutcome {
    pub user_id: String,
    pub workout_plan: String,
}

fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim).and_then(|s| s.parse::<i64>().ok())
}

fn parse_float(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim).and_then(|s| s.parse::<f64>().ok())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Feet and inches to centimetres, rounded to 2 decimals
///
/// A part that does not parse counts as zero; when neither parses the
/// height is unknown.
#[must_use]
pub fn height_cm(feet: Option<&str>, inches: Option<&str>) -> Option<f64> {
    let feet = parse_int(feet);
    let inches = parse_int(inches);
    if feet.is_none() && inches.is_none() {
        return None;
    }
    let total = (feet.unwrap_or(0) as f64)
        .mul_add(CM_PER_FOOT, inches.unwrap_or(0) as f64 * CM_PER_INCH);
    Some(round2(total))
}

/// Pounds to kilograms, rounded to 2 decimals
#[must_use]
pub fn weight_kg(pounds: Option<&str>) -> Option<f64> {
    parse_float(pounds).map(|lbs| round2(lbs * KG_PER_POUND))
}

/// Equipment list implied by the gym access answer
#[must_use]
pub fn resolve_equipment(gym_access: &str, equipment: &[String]) -> Vec<String> {
    match gym_access {
        "home_gym" if !equipment.is_empty() => equipment.to_vec(),
        "home_gym" | "calisthenics" => vec!["bodyweight".to_owned()],
        _ => vec!["full gym".to_owned()],
    }
}

impl OnboardingForm {
    fn macros(&self) -> Value {
        json!({
            "calories": self.macro_calories,
            "protein": self.macro_protein,
            "carbs": self.macro_carbs,
            "fats": self.macro_fats,
        })
    }

    fn preferences(&self, equipment: &[String]) -> Value {
        json!({
            "training_days": self.training_days,
            "gym_access": self.gym_access,
            "equipment": equipment,
            "experience": self.experience,
            "checkin_day": self.checkin_day,
            "gender": self.gender,
            "has_injury": self.has_injury,
            "injury_notes": self.injury_notes,
        })
    }

    fn coach_interest_kind(&self) -> Option<&'static str> {
        if self.wants_to_coach {
            Some("coach")
        } else if self.coach_interest {
            Some("hire")
        } else {
            None
        }
    }
}

/// Persist an intake form and generate the starter plan
///
/// # Errors
///
/// Returns an error if any write fails or the workout prompt cannot run
pub async fn submit(
    database: &Database,
    llm: &dyn LlmProvider,
    form: &OnboardingForm,
) -> AppResult<OnboardingOutcome> {
    let raw_id = form
        .user_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let user_id = identity::ensure_user(database, &raw_id).await?;

    let equipment = resolve_equipment(&form.gym_access, &form.equipment);
    let form_json = serde_json::to_value(form)?;

    let profiles = database.profiles();
    profiles
        .record_onboarding_state(&user_id, FINAL_STEP, &form_json, true)
        .await?;

    profiles
        .upsert(
            &user_id,
            &ProfileUpdate {
                full_name: form.full_name.clone(),
                age: parse_int(form.age.as_deref()),
                height_cm: height_cm(form.height_feet.as_deref(), form.height_inches.as_deref()),
                weight_kg: weight_kg(form.weight_lbs.as_deref()),
                goal: form.goal.clone(),
                macros: Some(form.macros()),
                preferences: Some(form.preferences(&equipment)),
                photos_pending: Some(form.photos_pending),
                ..ProfileUpdate::default()
            },
        )
        .await?;

    if let Some(kind) = form.coach_interest_kind() {
        profiles.record_coach_interest(&user_id, kind).await?;
    }

    let goal = form.goal.clone().unwrap_or_default();
    let inputs = json!({
        "muscle_groups": ["full body"],
        "workout_type": goal,
        "equipment": equipment,
        "experience": form.experience,
        "goal": goal,
        "gym_access": form.gym_access,
    });
    let plan = prompt_runner::run_prompt(
        database,
        llm,
        WORKOUT_GENERATION,
        Some(&user_id),
        &inputs,
    )
    .await?;

    let template_id = database
        .workouts()
        .create_template(
            &user_id,
            "Starter plan",
            Some("Plan generated during onboarding"),
            "auto",
            &json!({ "summary": plan, "form": form_json }),
        )
        .await?;

    info!(user_id = %user_id, template_id = %template_id, "Onboarding complete");
    Ok(OnboardingOutcome {
        user_id,
        workout_plan: plan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_conversion() {
        assert_eq!(height_cm(Some("5"), Some("10")), Some(177.8));
        assert_eq!(height_cm(Some("6"), None), Some(182.88));
        assert_eq!(height_cm(Some("tall"), Some("")), None);
        assert_eq!(height_cm(None, Some("3")), Some(7.62));
    }

    #[test]
    fn test_weight_conversion() {
        assert_eq!(weight_kg(Some("180")), Some(81.65));
        assert_eq!(weight_kg(Some(" 150.5 ")), Some(68.27));
        assert_eq!(weight_kg(Some("heavy")), None);
    }

    #[test]
    fn test_equipment_resolution() {
        let given = vec!["dumbbells".to_owned()];
        assert_eq!(resolve_equipment("home_gym", &given), given);
        assert_eq!(resolve_equipment("home_gym", &[]), vec!["bodyweight"]);
        assert_eq!(resolve_equipment("calisthenics", &given), vec!["bodyweight"]);
        assert_eq!(resolve_equipment("full_gym", &given), vec!["full gym"]);
    }

    #[test]
    fn test_form_accepts_numbers_or_text() {
        let form: OnboardingForm = serde_json::from_value(json!({
            "age": 31,
            "height_feet": "5",
            "weight_lbs": 165.5,
            "wants_to_coach": true,
        }))
        .unwrap();
        assert_eq!(form.age.as_deref(), Some("31"));
        assert_eq!(form.weight_lbs.as_deref(), Some("165.5"));
        assert_eq!(form.gym_access, "full_gym");
        assert!(form.photos_pending);
        assert_eq!(form.coach_interest_kind(), Some("coach"));
    }
}
