// ABOUTME: Text heuristics for the chat coach: reply shaping, workout intent and proposal answers
// ABOUTME: Pure functions with no I/O so they can be tested in isolation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::OnceLock;

use fitai_core::constants::chat::{
    EMPTY_REPLY_FALLBACK, GENERIC_REFUSAL, MAX_PROPOSAL_WORDS, MAX_REPLY_SENTENCES,
    MAX_REPLY_WORDS, PROPOSAL_QUESTION, SELF_HARM_REFUSAL,
};
use fitai_core::constants::workouts::{
    DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES,
};
use regex::Regex;

use crate::services::training::{dedupe_muscle_groups, CoachWorkoutRequest};

const WORKOUT_NOUNS: &[&str] = &["workout", "routine", "session"];

const WORKOUT_ACTIONS: &[&str] = &["build", "create", "make", "generate", "design", "plan"];

/// Keyword to muscle group, matched by substring in this order
const MUSCLE_KEYWORDS: &[(&str, &str)] = &[
    ("glute", "glutes"),
    ("glutes", "glutes"),
    ("booty", "glutes"),
    ("hamstring", "hamstrings"),
    ("hamstrings", "hamstrings"),
    ("quad", "quads"),
    ("quads", "quads"),
    ("leg", "legs"),
    ("legs", "legs"),
    ("calf", "calves"),
    ("calves", "calves"),
    ("chest", "chest"),
    ("pec", "chest"),
    ("pecs", "chest"),
    ("back", "back"),
    ("lat", "back"),
    ("lats", "back"),
    ("shoulder", "shoulders"),
    ("shoulders", "shoulders"),
    ("delt", "shoulders"),
    ("delts", "shoulders"),
    ("biceps", "biceps"),
    ("triceps", "triceps"),
    ("arms", "arms"),
    ("core", "core"),
    ("abs", "core"),
    ("upper", "upper body"),
    ("lower", "lower body"),
    ("push", "push"),
    ("pull", "pull"),
    ("full body", "full body"),
    ("hiit", "hiit"),
];

const DECLINE_PHRASES: &[&str] = &[
    "no", "nope", "nah", "dont", "do not", "not now", "keep", "cancel", "skip",
];

const CONFIRM_PHRASES: &[&str] = &[
    "yes",
    "yep",
    "yeah",
    "sure",
    "do it",
    "apply",
    "ok",
    "okay",
    "sounds good",
    "go ahead",
    "please do",
];

fn duration_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(\d{2,3})\s*(min|mins|minute|minutes)").ok())
        .as_ref()
}

fn link_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").ok())
        .as_ref()
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

fn mentions_muscle(text: &str) -> bool {
    MUSCLE_KEYWORDS.iter().any(|(k, _)| text.contains(k))
}

/// Whether a message asks the coach to build a workout
#[must_use]
pub fn is_workout_request(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let has_noun = contains_any(&lowered, WORKOUT_NOUNS);
    let has_action = contains_any(&lowered, WORKOUT_ACTIONS);
    (has_noun && has_action)
        || (lowered.contains("workout") && mentions_muscle(&lowered))
        || (has_action && mentions_muscle(&lowered))
}

/// Clamp a requested duration into the supported range
#[must_use]
pub fn clamp_duration(minutes: Option<i64>) -> u32 {
    minutes.map_or(DEFAULT_DURATION_MINUTES, |m| {
        let clamped = m.clamp(
            i64::from(MIN_DURATION_MINUTES),
            i64::from(MAX_DURATION_MINUTES),
        );
        u32::try_from(clamped).unwrap_or(DEFAULT_DURATION_MINUTES)
    })
}

/// Focus, muscle groups and duration from a free-text workout request
#[must_use]
pub fn parse_workout_request(text: &str) -> CoachWorkoutRequest {
    let lowered = text.to_lowercase();
    let minutes = duration_pattern()
        .and_then(|re| re.captures(&lowered))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok());

    let groups: Vec<String> = MUSCLE_KEYWORDS
        .iter()
        .filter(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, group)| (*group).to_owned())
        .collect();

    let focus = text.trim();
    CoachWorkoutRequest {
        focus: if focus.is_empty() {
            "custom workout".to_owned()
        } else {
            focus.to_owned()
        },
        muscle_groups: dedupe_muscle_groups(&groups),
        duration_minutes: clamp_duration(minutes),
    }
}

/// Refusal line for flagged moderation categories
#[must_use]
pub fn refusal_for(flags: &[String]) -> &'static str {
    if flags
        .iter()
        .any(|f| f.contains("self-harm") || f.contains("self_harm"))
    {
        SELF_HARM_REFUSAL
    } else {
        GENERIC_REFUSAL
    }
}

/// Answer to a pending proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalAnswer {
    Confirm,
    Decline,
}

fn normalize_answer(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn matches_phrase(text: &str, phrases: &[&str]) -> bool {
    phrases
        .iter()
        .any(|p| text == *p || text.starts_with(&format!("{p} ")))
}

/// Classify a short reply as confirming or declining a proposal
///
/// Declines win so "no, don't do it" is never read as a confirmation.
#[must_use]
pub fn classify_answer(text: &str) -> Option<ProposalAnswer> {
    let normalized = normalize_answer(text);
    if normalized.is_empty() {
        return None;
    }
    if matches_phrase(&normalized, DECLINE_PHRASES) {
        Some(ProposalAnswer::Decline)
    } else if matches_phrase(&normalized, CONFIRM_PHRASES) {
        Some(ProposalAnswer::Confirm)
    } else {
        None
    }
}

/// Remove Markdown emphasis, headings, list markers and link syntax
#[must_use]
pub fn strip_markdown(text: &str) -> String {
    let unlinked = link_pattern().map_or_else(
        || text.to_owned(),
        |re| re.replace_all(text, "$1").into_owned(),
    );
    unlinked
        .lines()
        .map(|line| {
            let line = line.trim_start().trim_start_matches('#').trim_start();
            let line = line
                .strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .or_else(|| line.strip_prefix("+ "))
                .unwrap_or(line);
            let digits = line.chars().take_while(char::is_ascii_digit).count();
            if digits > 0 && line[digits..].starts_with(". ") {
                line[digits + 2..].to_owned()
            } else {
                line.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
        .replace("**", "")
        .replace("__", "")
        .replace('`', "")
}

/// Split on sentence-ending punctuation followed by whitespace
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|(_, n)| n.is_whitespace()) {
            out.push(text[start..=i].trim());
            start = i + 1;
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

fn cut_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_owned();
    }
    words[..max_words]
        .join(" ")
        .trim_end_matches(['.', ',', '!', '?'])
        .to_owned()
}

/// Shape model output into a short texting-style reply
#[must_use]
pub fn shape_reply(text: &str) -> String {
    let plain = strip_markdown(text);
    let collapsed = plain.split_whitespace().collect::<Vec<_>>().join(" ");
    let kept = sentences(&collapsed)
        .into_iter()
        .take(MAX_REPLY_SENTENCES)
        .collect::<Vec<_>>()
        .join(" ");
    let shaped = cut_words(&kept, MAX_REPLY_WORDS);
    if shaped.trim().is_empty() {
        EMPTY_REPLY_FALLBACK.to_owned()
    } else {
        shaped
    }
}

/// Reply text for a proposed app action
#[must_use]
pub fn proposal_reply(summary: &str) -> String {
    let collapsed = strip_markdown(summary)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut short = cut_words(&collapsed, MAX_PROPOSAL_WORDS);
    if short.is_empty() {
        short = "I can adjust your plan".to_owned();
    }
    if !short.ends_with(['.', '!', '?']) {
        short.push('.');
    }
    format!("{short} {PROPOSAL_QUESTION}")
}

/// Drop the trailing history entry when it echoes the current user message
#[must_use]
pub fn drop_echo<T, F>(mut history: Vec<T>, is_echo: F) -> Vec<T>
where
    F: Fn(&T) -> bool,
{
    if history.last().is_some_and(&is_echo) {
        history.pop();
    }
    history
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workout_intent() {
        assert!(is_workout_request("Can you build me a workout?"));
        assert!(is_workout_request("leg workout please"));
        assert!(is_workout_request("make something for chest"));
        assert!(!is_workout_request("How much protein should I eat?"));
        assert!(!is_workout_request("my workout went great"));
    }

    #[test]
    fn test_parse_request_duration_and_groups() {
        let parsed = parse_workout_request("Build a 30 min glute and hamstring workout");
        assert_eq!(parsed.duration_minutes, 30);
        assert_eq!(parsed.muscle_groups, vec!["glutes", "hamstrings"]);
        assert_eq!(parsed.focus, "Build a 30 min glute and hamstring workout");

        assert_eq!(parse_workout_request("make a 200 minutes routine").duration_minutes, 120);
        assert_eq!(parse_workout_request("make a 5 min routine").duration_minutes, 45);
        assert_eq!(
            parse_workout_request("create a routine").muscle_groups,
            vec!["full body"]
        );
    }

    #[test]
    fn test_shape_reply_limits() {
        let long = "**Great** job today. Keep pushing hard. Drink water and sleep well tonight.";
        assert_eq!(shape_reply(long), "Great job today. Keep pushing hard.");

        let wordy = "one two three four five six seven eight nine ten eleven twelve thirteen \
                     fourteen fifteen sixteen seventeen eighteen nineteen twenty.";
        let shaped = shape_reply(wordy);
        assert_eq!(shaped.split_whitespace().count(), 18);
        assert!(shaped.ends_with("eighteen"));

        assert_eq!(shape_reply("  \n "), EMPTY_REPLY_FALLBACK);
        assert_eq!(shape_reply("- Try [this](http://x.y) now"), "Try this now");
    }

    #[test]
    fn test_answer_classification() {
        assert_eq!(classify_answer("Yes!"), Some(ProposalAnswer::Confirm));
        assert_eq!(classify_answer("sounds good, thanks"), Some(ProposalAnswer::Confirm));
        assert_eq!(classify_answer("No thanks"), Some(ProposalAnswer::Decline));
        assert_eq!(classify_answer("Don't change it"), Some(ProposalAnswer::Decline));
        assert_eq!(classify_answer("okay"), Some(ProposalAnswer::Confirm));
        assert_eq!(classify_answer("what about carbs?"), None);
        assert_eq!(classify_answer("know what"), None);
    }

    #[test]
    fn test_refusals() {
        assert_eq!(refusal_for(&["self-harm/intent".to_owned()]), SELF_HARM_REFUSAL);
        assert_eq!(refusal_for(&["violence".to_owned()]), GENERIC_REFUSAL);
    }

    #[test]
    fn test_proposal_reply() {
        assert_eq!(
            proposal_reply("Drop calories to 2100 for a steady cut"),
            "Drop calories to 2100 for a steady cut. Want me to apply it?"
        );
        let long = proposal_reply("a b c d e f g h i j k l m n o p");
        assert!(long.starts_with("a b c d e f g h i j k l m. "));
    }

    #[test]
    fn test_drop_echo_removes_only_one() {
        let history = vec!["hi", "hi"];
        assert_eq!(drop_echo(history, |m| *m == "hi"), vec!["hi"]);
        assert_eq!(drop_echo(vec!["a", "b"], |m| *m == "hi"), vec!["a", "b"]);
    }
}
