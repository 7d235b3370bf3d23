// ABOUTME: Runs versioned prompt templates against the LLM with ai_jobs audit rows
// ABOUTME: Also extracts JSON objects from model output wrapped in prose or code fences
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Prompt Runner
//!
//! Every templated AI call (workout generation, check-in analysis, meal
//! photo parsing, macro generation) goes through [`run_prompt`]:
//!
//! 1. Load the highest version of the named prompt
//! 2. Record a `running` job
//! 3. Send the template as the system message and the inputs as JSON
//! 4. Mark the job `completed` or `failed`

use fitai_core::errors::{AppError, AppResult};
use std::time::Instant;

use serde_json::Value;
use tracing::{instrument, warn};

use crate::database::Database;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::logging::AppLogger;

/// Execute a stored prompt and return the raw model output
///
/// # Errors
///
/// Returns `ResourceNotFound` for an unknown prompt name, or the LLM error
/// after the job has been marked failed
#[instrument(skip(database, llm, inputs))]
pub async fn run_prompt(
    database: &Database,
    llm: &dyn LlmProvider,
    name: &str,
    user_id: Option<&str>,
    inputs: &Value,
) -> AppResult<String> {
    let ai = database.ai();
    let prompt = ai
        .latest_prompt(name)
        .await?
        .ok_or_else(|| AppError::not_found("Prompt"))?;

    let job_id = ai.start_job(user_id, &prompt, inputs).await?;

    let mut user_message = ChatMessage::user(inputs.to_string());
    if llm.capabilities().supports_vision() {
        let photo_urls = photo_urls(inputs);
        if !photo_urls.is_empty() {
            user_message = user_message.with_images(photo_urls);
        }
    }

    let request = ChatRequest::new(vec![ChatMessage::system(&prompt.template), user_message]);

    let started = Instant::now();
    let result = llm.complete(&request).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    AppLogger::log_ai_job(name, &job_id, result.is_ok(), elapsed_ms);

    match result {
        Ok(response) => {
            ai.complete_job(&job_id, &response.content).await?;
            Ok(response.content)
        }
        Err(e) => {
            warn!(prompt = name, version = prompt.version, error = %e.message, "Prompt failed");
            if let Err(db_err) = ai.fail_job(&job_id, &e.message).await {
                warn!(error = %db_err.message, "Could not mark AI job failed");
            }
            Err(e)
        }
    }
}

/// Non-empty `photo_urls` strings from prompt inputs
fn photo_urls(inputs: &Value) -> Vec<String> {
    inputs
        .get("photo_urls")
        .and_then(Value::as_array)
        .map(|urls| {
            urls.iter()
                .filter_map(Value::as_str)
                .filter(|u| !u.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Pull a JSON object out of model output
///
/// Strips Markdown code fences, then parses the text between the first `{`
/// and the last `}`. Returns `None` when no object can be parsed.
#[must_use]
pub fn parse_json_output(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map_or(trimmed, |rest| rest.trim_end().trim_end_matches("```"))
        .trim();

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(unfenced) {
        return Some(value);
    }

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&unfenced[start..=end])
        .ok()
        .filter(Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_object() {
        assert_eq!(
            parse_json_output(r#"{"title":"Leg Day"}"#),
            Some(json!({"title": "Leg Day"}))
        );
    }

    #[test]
    fn test_parse_fenced_object() {
        let text = "```json\n{\"summary\": \"ok\", \"macro_delta\": {\"calories\": -100}}\n```";
        let value = parse_json_output(text).unwrap();
        assert_eq!(value["macro_delta"]["calories"], -100);
    }

    #[test]
    fn test_parse_object_inside_prose() {
        let text = "Here is your plan: {\"exercises\": []} Enjoy!";
        assert_eq!(parse_json_output(text), Some(json!({"exercises": []})));
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(parse_json_output("[1,2,3]").is_none());
        assert!(parse_json_output("no json here").is_none());
        assert!(parse_json_output("} backwards {").is_none());
    }

    #[test]
    fn test_photo_urls_filters_empty() {
        let urls = photo_urls(&json!({"photo_urls": ["a", "", 3, "b"]}));
        assert_eq!(urls, vec!["a", "b"]);
        assert!(photo_urls(&json!({})).is_empty());
    }
}
