// ABOUTME: Weekly check-in analysis with clamped macro adjustment and photo retention
// ABOUTME: Daily streak check-ins with an LLM one-liner and a local fallback table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{Duration, NaiveDate, Utc};
use fitai_core::constants::llm::{DAILY_CHECKIN_MAX_TOKENS, DAILY_CHECKIN_TEMPERATURE};
use fitai_core::constants::prompts::WEEKLY_CHECKIN_ANALYSIS;
use fitai_core::errors::AppResult;
use fitai_core::models::{lenient_number, MacroTargets, SleepQuality, TrainingStatus};
use rand::seq::SliceRandom;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::database::{today, Database, NewWeeklyCheckin};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::logging::AppLogger;
use crate::services::macros::{apply_delta, clamp_delta};
use crate::services::prompt_runner::{parse_json_output, run_prompt};
use crate::storage::{validate_object_path, BlobStore};

// ============================================================================
// Weekly check-ins
// ============================================================================

/// Weekly check-in as submitted by the client
#[derive(Debug, Clone, Default)]
pub struct WeeklyCheckinInput {
    pub user_id: String,
    pub adherence: Value,
    pub photo_urls: Vec<String>,
    pub checkin_date: Option<String>,
}

/// Where check-in photos live and how many check-ins keep them
pub struct PhotoRetention<'a> {
    pub blob_store: &'a dyn BlobStore,
    pub bucket: &'a str,
    pub keep: usize,
}

/// Outcome of a weekly check-in
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyCheckinOutcome {
    pub status: &'static str,
    pub ai_result: String,
    pub macro_update: Value,
}

/// Parsed analysis fields pulled from model output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckinAnalysis {
    pub summary: Option<String>,
    pub macro_delta: MacroTargets,
    pub cardio: Value,
}

/// Extract summary, macro delta and cardio advice from model output
///
/// The delta is clamped before it is returned.
#[must_use]
pub fn parse_analysis(output: &str) -> CheckinAnalysis {
    let Some(parsed) = parse_json_output(output) else {
        return CheckinAnalysis::default();
    };
    let delta = parsed
        .get("macro_delta")
        .and_then(MacroTargets::from_value)
        .unwrap_or_default();
    CheckinAnalysis {
        summary: parsed
            .get("summary")
            .and_then(Value::as_str)
            .map(str::to_owned),
        macro_delta: clamp_delta(&delta),
        cardio: parsed.get("cardio").cloned().unwrap_or(Value::Null),
    }
}

/// Run the analysis, adjust macros and store the check-in
///
/// # Errors
///
/// Returns an error if the prompt or a database write fails. Blob cleanup
/// failures are logged and ignored.
#[instrument(skip_all, fields(user_id = %input.user_id))]
pub async fn submit_weekly(
    database: &Database,
    llm: &dyn LlmProvider,
    retention: &PhotoRetention<'_>,
    input: &WeeklyCheckinInput,
) -> AppResult<WeeklyCheckinOutcome> {
    let user_id = &input.user_id;
    let prompt_input = json!({
        "adherence": input.adherence,
        "photo_urls": input.photo_urls,
    });
    let output = run_prompt(
        database,
        llm,
        WEEKLY_CHECKIN_ANALYSIS,
        Some(user_id),
        &prompt_input,
    )
    .await?;
    let analysis = parse_analysis(&output);

    let macro_update = apply_macro_delta(database, user_id, &analysis.macro_delta).await?;

    let weight = input
        .adherence
        .get("current_weight")
        .filter(|w| !w.is_null())
        .map(|w| lenient_number(Some(w)));
    let photos: Vec<Value> = input
        .photo_urls
        .iter()
        .map(|url| json!({ "url": url }))
        .collect();

    database
        .checkins()
        .insert_weekly(&NewWeeklyCheckin {
            user_id: user_id.clone(),
            date: input.checkin_date.clone().unwrap_or_else(today),
            weight,
            adherence: input.adherence.clone(),
            photos: Value::Array(photos),
            ai_summary: json!({ "raw": output, "summary": analysis.summary }),
            macro_update: macro_update.clone(),
            cardio_update: analysis.cardio,
        })
        .await?;

    enforce_photo_retention(database, retention, user_id).await?;

    Ok(WeeklyCheckinOutcome {
        status: "complete",
        ai_result: output,
        macro_update,
    })
}

/// Add a clamped delta to the stored targets when there is something to apply
async fn apply_macro_delta(
    database: &Database,
    user_id: &str,
    delta: &MacroTargets,
) -> AppResult<Value> {
    let profiles = database.profiles();
    let previous = profiles
        .get(user_id)
        .await?
        .and_then(|p| MacroTargets::from_value(&p.macros))
        .filter(|m| !m.is_zero());

    let Some(previous) = previous.filter(|_| !delta.is_zero()) else {
        return Ok(json!({
            "previous": previous,
            "delta": delta,
            "updated": Value::Null,
            "applied": false,
        }));
    };

    let updated = apply_delta(&previous, delta);
    profiles.set_macros(user_id, &json!(updated)).await?;
    info!(user_id, calories = updated.calories, "Macro targets adjusted from check-in");

    Ok(json!({
        "previous": previous,
        "delta": delta,
        "updated": updated,
        "applied": true,
    }))
}

/// Object paths for `urls` that live under the user's own folder
///
/// Check-in photo URLs come from the client, so a URL pointing into another
/// user's folder (or outside the bucket) is logged and left alone.
#[must_use]
pub fn owned_photo_paths(
    blob_store: &dyn BlobStore,
    bucket: &str,
    user_id: &str,
    urls: &[String],
) -> Vec<String> {
    let owner_prefix = format!("{user_id}/");
    urls.iter()
        .filter_map(|url| blob_store.path_from_url(bucket, url))
        .filter(|path| {
            let owned = validate_object_path(path).is_ok() && path.starts_with(&owner_prefix);
            if !owned {
                warn!(user_id, bucket, path = %path, "Not deleting photo outside the user's folder");
            }
            owned
        })
        .collect()
}

/// Strip photos from all but the newest check-ins
async fn enforce_photo_retention(
    database: &Database,
    retention: &PhotoRetention<'_>,
    user_id: &str,
) -> AppResult<()> {
    let keep = i64::try_from(retention.keep).unwrap_or(i64::MAX);
    let checkins = database.checkins();
    let expired = checkins.expired_photo_checkins(user_id, keep).await?;
    if expired.is_empty() {
        return Ok(());
    }

    let mut urls = Vec::new();
    for checkin in &expired {
        urls.extend(checkin.photo_urls());
        checkins.clear_photos(&checkin.id).await?;
    }

    let paths = owned_photo_paths(retention.blob_store, retention.bucket, user_id, &urls);
    if let Err(e) = retention.blob_store.remove(retention.bucket, &paths).await {
        AppLogger::log_storage_cleanup_failure(retention.bucket, paths.len(), &e.message);
    }

    let removed = database.progress().delete_by_urls(user_id, &urls).await?;
    info!(
        user_id,
        checkins = expired.len(),
        photos = urls.len(),
        progress_rows = removed,
        "Expired check-in photos removed"
    );
    Ok(())
}

// ============================================================================
// Daily check-ins and streaks
// ============================================================================

const ALL_HIT: &[&str] = &[
    "Perfect day yesterday! Keep that energy going today.",
    "You're crushing it! Consistency like this builds champions.",
    "Elite habits! Your future self is thanking you right now.",
    "All boxes checked! This is how transformations happen.",
];

const MACROS_AND_TRAINING: &[&str] = &[
    "Great work on training and nutrition! Prioritize sleep tonight.",
    "Two out of three ain't bad! Rest up and keep building.",
    "Solid effort! Better sleep = better gains tomorrow.",
];

const MACROS_ONLY: &[&str] = &[
    "Nutrition on point! Rest day recovery is important too.",
    "Macros hit! Even rest days are progress days.",
    "Great job fueling right! Your body's recovering.",
];

const TRAINING_ONLY: &[&str] = &[
    "Great workout! Let's dial in those macros today.",
    "Training done! Fuel that body right and watch the gains come.",
    "Good session! Remember: nutrition amplifies your hard work.",
];

const FRESH_START: &[&str] = &[
    "New day, fresh start! Let's make today count.",
    "Every day is a chance to build momentum. Let's go!",
    "Progress isn't always perfect. Keep showing up!",
    "One day at a time. You've got this!",
];

/// Daily check-in answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyAnswers {
    pub hit_macros: bool,
    pub training_status: TrainingStatus,
    pub sleep_quality: SleepQuality,
}

/// Outcome of a daily check-in
#[derive(Debug, Clone, Serialize)]
pub struct DailyCheckinOutcome {
    pub coach_response: String,
    pub streak_saved: bool,
    pub current_streak: u32,
}

/// Response pool for a set of answers
#[must_use]
pub fn fallback_pool(answers: &DailyAnswers) -> &'static [&'static str] {
    let trained = answers.training_status == TrainingStatus::Trained;
    let good_sleep = answers.sleep_quality == SleepQuality::Good;
    match (answers.hit_macros, trained, good_sleep) {
        (true, true, true) => ALL_HIT,
        (true, true, false) => MACROS_AND_TRAINING,
        (true, false, _) => MACROS_ONLY,
        (false, true, _) => TRAINING_ONLY,
        (false, false, _) => FRESH_START,
    }
}

fn local_response(answers: &DailyAnswers) -> String {
    let pool = fallback_pool(answers);
    pool.choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FRESH_START[0])
        .to_owned()
}

fn daily_prompt(answers: &DailyAnswers) -> String {
    format!(
        "You are FitAI Coach, a friendly fitness coach.\n\
         A user just completed their daily check-in with these answers:\n\
         - Hit macros yesterday: {}\n\
         - Training: {}\n\
         - Sleep quality: {}\n\n\
         Respond with ONE short motivational sentence (15-20 words max).\n\
         Be encouraging and acknowledge their honest answers.\n\
         If they didn't hit macros or had poor sleep, be supportive not critical.\n\
         Use a casual, friendly tone like a gym buddy.\n\
         Don't use hashtags or emojis at the start.",
        if answers.hit_macros { "Yes" } else { "No" },
        answers.training_status.as_str().replace('_', " "),
        answers.sleep_quality.as_str(),
    )
}

/// One-line motivational reply, falling back to the local table on any failure
pub async fn coach_response(llm: &dyn LlmProvider, answers: &DailyAnswers) -> String {
    let request = ChatRequest::new(vec![
        ChatMessage::system("You are a concise, motivational fitness coach."),
        ChatMessage::user(daily_prompt(answers)),
    ])
    .with_max_tokens(DAILY_CHECKIN_MAX_TOKENS)
    .with_temperature(DAILY_CHECKIN_TEMPERATURE);

    match llm.complete(&request).await {
        Ok(response) if !response.content.trim().is_empty() => response.content.trim().to_owned(),
        Ok(_) => local_response(answers),
        Err(e) => {
            warn!(error = %e.message, "Daily check-in reply fell back to local table");
            local_response(answers)
        }
    }
}

/// Consecutive check-in days ending at `today`
///
/// `dates` must be distinct `YYYY-MM-DD` strings, newest first.
#[must_use]
pub fn current_streak(dates: &[String], today: NaiveDate) -> u32 {
    let mut expected = today;
    let mut streak = 0;
    for raw in dates {
        let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
            continue;
        };
        if date > expected {
            continue;
        }
        if date != expected {
            break;
        }
        streak += 1;
        expected -= Duration::days(1);
    }
    streak
}

/// Record today's check-in and report the streak
///
/// Storage failures never fail the request.
#[instrument(skip(database, llm))]
pub async fn submit_daily(
    database: &Database,
    llm: &dyn LlmProvider,
    user_id: &str,
    answers: DailyAnswers,
) -> DailyCheckinOutcome {
    let reply = coach_response(llm, &answers).await;
    let checkins = database.checkins();
    let date = today();

    if let Err(e) = checkins
        .upsert_daily(
            user_id,
            &date,
            answers.hit_macros,
            answers.training_status.as_str(),
            answers.sleep_quality.as_str(),
            &reply,
        )
        .await
    {
        warn!(user_id, error = %e.message, "Failed to store daily check-in");
    }

    let current_streak = match checkins.daily_dates(user_id, 366).await {
        Ok(dates) => current_streak(&dates, Utc::now().date_naive()),
        Err(e) => {
            warn!(user_id, error = %e.message, "Failed to compute streak");
            0
        }
    };

    DailyCheckinOutcome {
        coach_response: reply,
        streak_saved: true,
        current_streak,
    }
}
