// ABOUTME: Meal logging from photos or manual entries, and per-day macro adherence
// ABOUTME: Interprets meal_photo_parse output into items and totals with a raw fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use fitai_core::constants::prompts::MEAL_PHOTO_PARSE;
use fitai_core::constants::progress::MAX_ADHERENCE_RANGE_DAYS;
use fitai_core::errors::{AppError, AppResult};
use fitai_core::models::{lenient_number, MacroTargets};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::instrument;

use crate::database::{Database, NewNutritionLog, NutritionLogRecord};
use crate::llm::LlmProvider;
use crate::services::prompt_runner::{parse_json_output, run_prompt};

/// Upper bound on logs read for an adherence window
const ADHERENCE_LOG_LIMIT: i64 = 2000;

/// Hand-entered food line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualItem {
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fats: f64,
}

impl ManualItem {
    const fn macros(&self) -> MacroTargets {
        MacroTargets {
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fats: self.fats,
        }
    }
}

/// Sum of all manual items
#[must_use]
pub fn manual_totals(items: &[ManualItem]) -> MacroTargets {
    items
        .iter()
        .fold(MacroTargets::default(), |acc, item| acc.add(&item.macros()))
}

/// Items and totals from a meal parse
///
/// Accepts `{"items": [...], "totals": {...}}`. Totals are summed from the
/// items when absent. Unparseable output is kept as a single `raw` item with
/// zero totals.
#[must_use]
pub fn parse_meal_output(output: &str, photo_url: Option<&str>) -> (Value, MacroTargets) {
    let items = parse_json_output(output)
        .and_then(|parsed| {
            let items = parsed.get("items").and_then(Value::as_array).cloned()?;
            let totals = parsed
                .get("totals")
                .and_then(MacroTargets::from_value)
                .unwrap_or_else(|| {
                    items
                        .iter()
                        .filter_map(MacroTargets::from_value)
                        .fold(MacroTargets::default(), |acc, m| acc.add(&m))
                });
            Some((Value::Array(items), totals))
        });

    items.unwrap_or_else(|| {
        let mut raw = json!({ "raw": output });
        if let Some(url) = photo_url {
            raw["photo_url"] = json!(url);
        }
        (json!([raw]), MacroTargets::default())
    })
}

/// Meal log produced by the AI parser
#[derive(Debug, Clone)]
pub struct ParsedMealLog {
    pub log: NutritionLogRecord,
    pub ai_result: String,
}

/// Run the meal photo prompt and store the resulting log
///
/// # Errors
///
/// Returns an error if the prompt or the insert fails
#[instrument(skip(database, llm))]
pub async fn log_photo_meal(
    database: &Database,
    llm: &dyn LlmProvider,
    user_id: &str,
    meal_type: &str,
    photo_url: Option<&str>,
    date: String,
) -> AppResult<ParsedMealLog> {
    let photo_urls: Vec<&str> = photo_url.into_iter().collect();
    let inputs = json!({
        "meal_type": meal_type,
        "photo_url": photo_url,
        "photo_urls": photo_urls,
    });
    let ai_result = run_prompt(database, llm, MEAL_PHOTO_PARSE, Some(user_id), &inputs).await?;
    let (items, totals) = parse_meal_output(&ai_result, photo_url);

    let log = database
        .nutrition()
        .insert_log(&NewNutritionLog {
            user_id: user_id.to_owned(),
            date,
            meal_type: meal_type.to_owned(),
            items,
            totals,
            photo_url: photo_url.map(str::to_owned),
        })
        .await?;

    Ok(ParsedMealLog { log, ai_result })
}

/// First day of an adherence window of `range_days` ending on `today`
///
/// # Errors
///
/// Returns an error unless `range_days` is within `1..=MAX_ADHERENCE_RANGE_DAYS`
pub fn adherence_window_start(range_days: i64, today: NaiveDate) -> AppResult<NaiveDate> {
    if !(1..=MAX_ADHERENCE_RANGE_DAYS).contains(&range_days) {
        return Err(AppError::invalid_input(format!(
            "range_days must be between 1 and {MAX_ADHERENCE_RANGE_DAYS}"
        )));
    }
    Duration::try_days(range_days - 1)
        .and_then(|offset| today.checked_sub_signed(offset))
        .ok_or_else(|| AppError::invalid_input("range_days is out of range"))
}

/// Logged totals per day against the profile targets, oldest day first
///
/// # Errors
///
/// Returns an error if `range_days` is out of bounds or the profile or log reads fail
pub async fn macro_adherence(
    database: &Database,
    user_id: &str,
    range_days: i64,
    today: NaiveDate,
) -> AppResult<Value> {
    let start = adherence_window_start(range_days, today)?
        .format("%Y-%m-%d")
        .to_string();
    let end = today.format("%Y-%m-%d").to_string();

    let target = database
        .profiles()
        .get(user_id)
        .await?
        .and_then(|p| MacroTargets::from_value(&p.macros))
        .map_or_else(|| json!({}), |m| json!(m));

    let logs = database
        .nutrition()
        .logs_since(user_id, &start, ADHERENCE_LOG_LIMIT)
        .await?;

    let mut by_date: BTreeMap<String, MacroTargets> = BTreeMap::new();
    for log in logs.iter().filter(|l| l.date.as_str() <= end.as_str()) {
        let totals = MacroTargets {
            calories: lenient_number(log.totals.get("calories")),
            protein: lenient_number(log.totals.get("protein")),
            carbs: lenient_number(log.totals.get("carbs")),
            fats: lenient_number(log.totals.get("fats")),
        };
        let day = by_date.entry(log.date.clone()).or_default();
        *day = day.add(&totals);
    }

    let days: Vec<Value> = by_date
        .into_iter()
        .map(|(date, logged)| json!({ "date": date, "logged": logged, "target": target }))
        .collect();
    Ok(json!({ "days": days }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitai_core::errors::ErrorCode;

    #[test]
    fn test_structured_output_keeps_items() {
        let output = r#"```json
{"items":[{"name":"rice","calories":200,"protein":4,"carbs":44,"fats":0.5},
          {"name":"chicken","calories":"165","protein":31,"carbs":0,"fats":3.6}]}
```"#;
        let (items, totals) = parse_meal_output(output, None);
        assert_eq!(items.as_array().map(Vec::len), Some(2));
        assert!((totals.calories - 365.0).abs() < f64::EPSILON);
        assert!((totals.protein - 35.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_explicit_totals_win() {
        let output = r#"{"items":[{"name":"bar"}],"totals":{"calories":250,"protein":20,"carbs":25,"fats":9}}"#;
        let (_, totals) = parse_meal_output(output, None);
        assert!((totals.calories - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_adherence_window_bounds() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(adherence_window_start(1, today).unwrap(), today);
        assert_eq!(
            adherence_window_start(7, today).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
        );
        assert!(adherence_window_start(MAX_ADHERENCE_RANGE_DAYS, today).is_ok());

        for bad in [0, -5, MAX_ADHERENCE_RANGE_DAYS + 1, 100_000_000_000, i64::MIN, i64::MAX] {
            let err = adherence_window_start(bad, today).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidInput, "range_days={bad}");
        }
    }

    #[test]
    fn test_prose_falls_back_to_raw() {
        let (items, totals) = parse_meal_output("Looks like a salad", Some("http://x/a.jpg"));
        assert_eq!(
            items,
            json!([{ "raw": "Looks like a salad", "photo_url": "http://x/a.jpg" }])
        );
        assert!(totals.is_zero());
    }

    #[test]
    fn test_manual_totals() {
        let items = vec![
            ManualItem {
                name: "eggs".to_owned(),
                calories: 140.0,
                protein: 12.0,
                carbs: 1.0,
                fats: 10.0,
            },
            ManualItem {
                name: "toast".to_owned(),
                calories: 80.0,
                protein: 3.0,
                carbs: 15.0,
                fats: 1.0,
            },
        ];
        let totals = manual_totals(&items);
        assert!((totals.calories - 220.0).abs() < f64::EPSILON);
        assert!((totals.fats - 11.0).abs() < f64::EPSILON);
    }
}
