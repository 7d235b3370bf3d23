// ABOUTME: Workout domain logic: template assembly, session completion with PR detection, history
// ABOUTME: Also builds coach-picked templates from workout_generation output
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Training Service
//!
//! Estimated one-rep max uses the Epley formula, `w * (1 + reps / 30)`,
//! rounded to two decimals. A personal record is only written when a
//! session's best estimate is strictly greater than the stored maximum.
//! Session completion and PR inserts are separate writes and are not
//! atomic.

use std::collections::{BTreeMap, HashSet};

use fitai_core::constants::prompts::WORKOUT_GENERATION;
use fitai_core::constants::workouts::{
    COACH_DEFAULT_REPS, COACH_DEFAULT_REST_SECONDS, COACH_DEFAULT_SETS, ESTIMATED_1RM_METRIC,
};
use fitai_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::database::{
    Database, NewTemplateExercise, TemplateExerciseRecord, WorkoutTemplateRecord,
};
use crate::llm::LlmProvider;
use crate::services::prompt_runner::{parse_json_output, run_prompt};

/// Epley estimated one-rep max; zero for non-positive weight or reps
#[must_use]
pub fn estimated_1rm(weight: f64, reps: i64) -> f64 {
    if weight <= 0.0 || reps <= 0 {
        return 0.0;
    }
    let estimate = weight * (1.0 + reps as f64 / 30.0);
    (estimate * 100.0).round() / 100.0
}

// ============================================================================
// Templates
// ============================================================================

/// Exercise entry in a template create or update request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateExerciseInput {
    /// Exercise name, looked up or created in the catalogue
    pub name: String,
    #[serde(default)]
    pub muscle_groups: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    pub sets: Option<i64>,
    pub reps: Option<i64>,
    pub rest_seconds: Option<i64>,
    pub notes: Option<String>,
}

/// Find or create each named exercise and keep request order as position
///
/// # Errors
///
/// Returns an error if an exercise lookup or insert fails
pub async fn resolve_template_exercises(
    database: &Database,
    inputs: &[TemplateExerciseInput],
) -> AppResult<Vec<NewTemplateExercise>> {
    let exercises = database.exercises();
    let mut resolved = Vec::with_capacity(inputs.len());
    for (position, input) in (0_i64..).zip(inputs) {
        let exercise_id = exercises
            .get_or_create(
                &input.name,
                &json!(input.muscle_groups),
                &json!(input.equipment),
            )
            .await?;
        resolved.push(NewTemplateExercise {
            exercise_id,
            position,
            sets: input.sets.unwrap_or(0),
            reps: input.reps.unwrap_or(0),
            rest_seconds: input.rest_seconds.unwrap_or(0),
            notes: input.notes.clone(),
        });
    }
    Ok(resolved)
}

/// Template row plus its exercises enriched from the catalogue
#[derive(Debug, Clone, Serialize)]
pub struct TemplateDetail {
    pub template: WorkoutTemplateRecord,
    pub exercises: Vec<Value>,
}

fn enrich_exercise(
    entry: &TemplateExerciseRecord,
    name: &str,
    muscles: &Value,
    gear: &Value,
) -> Value {
    json!({
        "id": entry.id,
        "exercise_id": entry.exercise_id,
        "position": entry.position,
        "sets": entry.sets,
        "reps": entry.reps,
        "rest_seconds": entry.rest_seconds,
        "notes": entry.notes,
        "name": name,
        "muscle_groups": muscles,
        "equipment": gear,
    })
}

/// Load a template with enriched exercises
///
/// # Errors
///
/// Returns `ResourceNotFound` when the template does not exist
pub async fn template_detail(database: &Database, template_id: &str) -> AppResult<TemplateDetail> {
    let workouts = database.workouts();
    let template = workouts
        .get_template(template_id)
        .await?
        .ok_or_else(|| AppError::not_found("Template"))?;
    let entries = workouts.template_exercises(template_id).await?;

    let ids: Vec<String> = entries.iter().map(|e| e.exercise_id.clone()).collect();
    let catalogue = database.exercises().get_many(&ids).await?;

    let empty = json!([]);
    let exercises = entries
        .iter()
        .map(|entry| match catalogue.get(&entry.exercise_id) {
            Some(exercise) => enrich_exercise(
                entry,
                &exercise.name,
                &exercise.muscle_groups,
                &exercise.equipment,
            ),
            None => enrich_exercise(entry, "Unknown", &empty, &empty),
        })
        .collect();

    Ok(TemplateDetail {
        template,
        exercises,
    })
}

/// Copy a template and its exercises for a user
///
/// # Errors
///
/// Returns `ResourceNotFound` when the source template does not exist
pub async fn duplicate_template(
    database: &Database,
    template_id: &str,
    user_id: Option<&str>,
    title: Option<&str>,
) -> AppResult<String> {
    let workouts = database.workouts();
    let source = workouts
        .get_template(template_id)
        .await?
        .ok_or_else(|| AppError::not_found("Template"))?;

    let owner = user_id.unwrap_or(&source.user_id);
    let title = title
        .filter(|t| !t.trim().is_empty())
        .map_or_else(|| format!("{} Copy", source.title), str::to_owned);

    let copy_id = workouts
        .create_template(
            owner,
            &title,
            source.description.as_deref(),
            &source.mode,
            &source.metadata,
        )
        .await?;

    let exercises: Vec<NewTemplateExercise> = workouts
        .template_exercises(template_id)
        .await?
        .into_iter()
        .map(|e| NewTemplateExercise {
            exercise_id: e.exercise_id,
            position: e.position,
            sets: e.sets,
            reps: e.reps,
            rest_seconds: e.rest_seconds,
            notes: e.notes,
        })
        .collect();
    workouts.add_template_exercises(&copy_id, &exercises).await?;

    Ok(copy_id)
}

// ============================================================================
// Sessions
// ============================================================================

/// A personal record set during a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrUpdate {
    pub exercise_name: String,
    pub value: f64,
    pub previous_value: Option<f64>,
}

/// Outcome of completing a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionCompletion {
    pub session_id: String,
    pub status: String,
    pub duration_seconds: i64,
    pub prs: Vec<PrUpdate>,
}

/// Mark a session finished and record any new estimated 1RM PRs
///
/// # Errors
///
/// Returns `ResourceNotFound` when the session does not exist
#[instrument(skip(database))]
pub async fn complete_session(
    database: &Database,
    session_id: &str,
    status: &str,
    duration_seconds: Option<i64>,
) -> AppResult<SessionCompletion> {
    let workouts = database.workouts();
    let session = workouts
        .get_session(session_id)
        .await?
        .ok_or_else(|| AppError::not_found("Session"))?;

    let duration_seconds = duration_seconds.unwrap_or(0);
    workouts
        .complete_session(session_id, status, duration_seconds)
        .await?;

    // BTreeMap keeps PR output order stable
    let mut best_by_exercise: BTreeMap<String, f64> = BTreeMap::new();
    for log in workouts.session_logs(session_id).await? {
        let estimate = estimated_1rm(log.weight, log.reps);
        if estimate <= 0.0 {
            continue;
        }
        let name = if log.exercise_name.is_empty() {
            "Unknown".to_owned()
        } else {
            log.exercise_name
        };
        let best = best_by_exercise.entry(name).or_insert(0.0);
        *best = best.max(estimate);
    }

    let mut prs = Vec::new();
    for (exercise_name, value) in best_by_exercise {
        let previous_value = workouts
            .best_pr(&session.user_id, &exercise_name, ESTIMATED_1RM_METRIC)
            .await?;
        if previous_value.is_some_and(|previous| value <= previous) {
            continue;
        }
        workouts
            .insert_pr(&session.user_id, &exercise_name, ESTIMATED_1RM_METRIC, value)
            .await?;
        prs.push(PrUpdate {
            exercise_name,
            value,
            previous_value,
        });
    }

    info!(session_id, prs = prs.len(), "Session completed");
    Ok(SessionCompletion {
        session_id: session_id.to_owned(),
        status: status.to_owned(),
        duration_seconds,
        prs,
    })
}

/// Per-exercise history with best set and e1RM trend, newest first
///
/// # Errors
///
/// Returns an error if the database query fails
pub async fn exercise_history(
    database: &Database,
    user_id: &str,
    exercise_name: &str,
    limit: i64,
) -> AppResult<Value> {
    let rows = database
        .workouts()
        .exercise_history(user_id, exercise_name, limit)
        .await?;

    let mut entries = Vec::with_capacity(rows.len());
    let mut trend = Vec::with_capacity(rows.len());
    let mut best_set = Value::Null;
    let mut best_estimated = 0.0_f64;

    for row in &rows {
        let estimated = estimated_1rm(row.log.weight, row.log.reps);
        entries.push(json!({
            "id": row.log.id,
            "date": row.session_date,
            "sets": row.log.sets,
            "reps": row.log.reps,
            "weight": row.log.weight,
            "estimated_1rm": estimated,
        }));
        trend.push(json!({ "date": row.session_date, "estimated_1rm": estimated }));
        if estimated > best_estimated {
            best_estimated = estimated;
            best_set = json!({
                "weight": row.log.weight,
                "reps": row.log.reps,
                "estimated_1rm": estimated,
            });
        }
    }

    Ok(json!({
        "exercise_name": exercise_name,
        "entries": entries,
        "best_set": best_set,
        "estimated_1rm": best_estimated,
        "trend": trend,
    }))
}

// ============================================================================
// Coach-picked workouts
// ============================================================================

/// Request for a coach-generated workout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoachWorkoutRequest {
    pub focus: String,
    pub muscle_groups: Vec<String>,
    pub duration_minutes: u32,
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Leading integer of a rep value such as `10`, `"8-10"` or `"12 reps"`
fn leading_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

/// Generate a workout with the LLM and store it as a "Coaches Pick" template
///
/// Never fails: errors are reported as `{success: false, error}` so the
/// chat flow can answer with a fallback line.
pub async fn create_coach_workout(
    database: &Database,
    llm: &dyn LlmProvider,
    user_id: &str,
    request: &CoachWorkoutRequest,
) -> Value {
    match build_coach_workout(database, llm, user_id, request).await {
        Ok(result) => result,
        Err(e) => {
            warn!(user_id, error = %e.message, "Coach workout generation failed");
            json!({ "success": false, "error": e.message })
        }
    }
}

async fn build_coach_workout(
    database: &Database,
    llm: &dyn LlmProvider,
    user_id: &str,
    request: &CoachWorkoutRequest,
) -> AppResult<Value> {
    let inputs = json!({
        "muscle_groups": request.muscle_groups,
        "workout_type": request.focus,
        "duration_minutes": request.duration_minutes,
    });
    let output = run_prompt(database, llm, WORKOUT_GENERATION, Some(user_id), &inputs).await?;
    let plan = parse_json_output(&output)
        .ok_or_else(|| AppError::external_service("LLM", "Workout output was not valid JSON"))?;

    let base_title = plan
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .map_or_else(|| title_case(&request.focus), str::to_owned);
    let title = format!("Coaches Pick: {base_title}");

    let template_id = database
        .workouts()
        .create_template(
            user_id,
            &title,
            Some(&format!("AI-generated {}", request.focus)),
            "coach",
            &json!({
                "generated_by": "coach_chat",
                "focus": request.focus,
                "muscle_groups": request.muscle_groups,
            }),
        )
        .await?;

    let empty = Vec::new();
    let items = plan
        .get("exercises")
        .and_then(Value::as_array)
        .unwrap_or(&empty);

    let exercises = database.exercises();
    let muscles = json!(request.muscle_groups);
    let mut template_exercises = Vec::with_capacity(items.len());
    for (position, item) in (0_i64..).zip(items) {
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Unknown Exercise");
        let exercise_id = exercises.get_or_create(name, &muscles, &json!([])).await?;
        template_exercises.push(NewTemplateExercise {
            exercise_id,
            position,
            sets: leading_int(item.get("sets")).unwrap_or(COACH_DEFAULT_SETS),
            reps: leading_int(item.get("reps")).unwrap_or(COACH_DEFAULT_REPS),
            rest_seconds: leading_int(item.get("rest_seconds"))
                .unwrap_or(COACH_DEFAULT_REST_SECONDS),
            notes: item.get("notes").and_then(Value::as_str).map(str::to_owned),
        });
    }
    database
        .workouts()
        .add_template_exercises(&template_id, &template_exercises)
        .await?;

    Ok(json!({
        "success": true,
        "template_id": template_id,
        "title": title,
        "exercise_count": template_exercises.len(),
    }))
}

/// Dedupe muscle groups preserving order, defaulting to full body
#[must_use]
pub fn dedupe_muscle_groups(groups: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let deduped: Vec<String> = groups
        .iter()
        .map(|g| g.trim().to_lowercase())
        .filter(|g| !g.is_empty() && seen.insert(g.clone()))
        .collect();
    if deduped.is_empty() {
        vec!["full body".to_owned()]
    } else {
        deduped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epley_estimate() {
        assert!((estimated_1rm(100.0, 5) - 116.67).abs() < f64::EPSILON);
        assert!((estimated_1rm(60.0, 10) - 80.0).abs() < f64::EPSILON);
        assert!(estimated_1rm(0.0, 5).abs() < f64::EPSILON);
        assert!(estimated_1rm(100.0, 0).abs() < f64::EPSILON);
        assert!(estimated_1rm(-5.0, 3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rep_ranges_take_lower_bound() {
        assert_eq!(leading_int(Some(&json!("8-10"))), Some(8));
        assert_eq!(leading_int(Some(&json!(12))), Some(12));
        assert_eq!(leading_int(Some(&json!("AMRAP"))), None);
        assert_eq!(leading_int(None), None);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("upper body"), "Upper Body");
        assert_eq!(title_case("HIIT"), "Hiit");
    }

    #[test]
    fn test_dedupe_muscle_groups() {
        let groups = vec!["Chest".to_owned(), "chest".to_owned(), "back".to_owned()];
        assert_eq!(dedupe_muscle_groups(&groups), vec!["chest", "back"]);
        assert_eq!(dedupe_muscle_groups(&[]), vec!["full body"]);
    }
}
