// ABOUTME: Application constants organized by domain
// ABOUTME: Prompt names, LLM defaults, macro limits, chat replies and storage defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into small domain modules rather than one flat list.

/// Network defaults
pub mod network {
    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 8000;
    /// Default bind host
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    /// Default request timeout
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
    /// Largest accepted request body (photo uploads included)
    pub const MAX_BODY_BYTES: usize = 15 * 1024 * 1024;
}

/// Service identity
pub mod service {
    /// Service name used in logs and health responses
    pub const SERVICE_NAME: &str = "fitai-server";
    /// Crate version baked in at compile time
    pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Names of the versioned prompts stored in `ai_prompts`
pub mod prompts {
    /// Workout plan generation
    pub const WORKOUT_GENERATION: &str = "workout_generation";
    /// Weekly check-in analysis with macro delta
    pub const WEEKLY_CHECKIN_ANALYSIS: &str = "weekly_checkin_analysis";
    /// Meal photo parsing into food items
    pub const MEAL_PHOTO_PARSE: &str = "meal_photo_parse";
    /// Macro target generation from a profile
    pub const MACRO_GENERATION: &str = "macro_generation";
}

/// LLM defaults
pub mod llm {
    /// Default chat model
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
    /// Default moderation model
    pub const DEFAULT_MODERATION_MODEL: &str = "omni-moderation-latest";
    /// Default OpenAI-compatible base URL
    pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
    /// Token cap for coach chat replies
    pub const CHAT_MAX_TOKENS: u32 = 60;
    /// Sampling temperature for coach chat replies
    pub const CHAT_TEMPERATURE: f32 = 0.4;
    /// Token cap for daily check-in replies
    pub const DAILY_CHECKIN_MAX_TOKENS: u32 = 50;
    /// Sampling temperature for daily check-in replies
    pub const DAILY_CHECKIN_TEMPERATURE: f32 = 0.7;
}

/// Macro target limits
pub mod macros {
    /// Calories never go below this after applying a delta
    pub const MIN_CALORIES: f64 = 1200.0;
    /// Largest calorie change a single check-in may apply
    pub const MAX_CALORIE_DELTA: f64 = 300.0;
    /// Largest protein change (g)
    pub const MAX_PROTEIN_DELTA: f64 = 30.0;
    /// Largest carb change (g)
    pub const MAX_CARB_DELTA: f64 = 50.0;
    /// Largest fat change (g)
    pub const MAX_FAT_DELTA: f64 = 15.0;
}

/// Imperial to metric conversion factors
pub mod units {
    /// Centimetres per foot
    pub const CM_PER_FOOT: f64 = 30.48;
    /// Centimetres per inch
    pub const CM_PER_INCH: f64 = 2.54;
    /// Kilograms per pound
    pub const KG_PER_POUND: f64 = 0.453_592_37;
}

/// Workout tracking constants
pub mod workouts {
    /// Metric name stored on PR rows
    pub const ESTIMATED_1RM_METRIC: &str = "estimated_1rm";
    /// Sessions returned by the session list
    pub const SESSION_LIST_LIMIT: i64 = 20;
    /// Default workout length when none is requested
    pub const DEFAULT_DURATION_MINUTES: u32 = 45;
    /// Shortest workout the coach will build
    pub const MIN_DURATION_MINUTES: u32 = 10;
    /// Longest workout the coach will build
    pub const MAX_DURATION_MINUTES: u32 = 120;
    /// Default sets for coach-built exercises
    pub const COACH_DEFAULT_SETS: i64 = 3;
    /// Default reps for coach-built exercises
    pub const COACH_DEFAULT_REPS: i64 = 10;
    /// Default rest for coach-built exercises
    pub const COACH_DEFAULT_REST_SECONDS: i64 = 60;
}

/// Coach chat behaviour
pub mod chat {
    /// History messages loaded per turn
    pub const HISTORY_LIMIT: i64 = 12;
    /// Longest reply in words
    pub const MAX_REPLY_WORDS: usize = 18;
    /// Longest reply in sentences
    pub const MAX_REPLY_SENTENCES: usize = 2;
    /// Longest proposal summary in words
    pub const MAX_PROPOSAL_WORDS: usize = 13;
    /// Model name stored on canned replies
    pub const LOCAL_MODEL: &str = "fitai-local";

    /// Refusal when moderation flags self-harm
    pub const SELF_HARM_REFUSAL: &str =
        "I can't help with that. If you're in danger, contact a local professional or emergency service.";
    /// Refusal for any other flagged content
    pub const GENERIC_REFUSAL: &str =
        "I can't help with that. I can help with training, nutrition, recovery, and your plan.";
    /// Streamed before building a workout
    pub const WORKOUT_PENDING: &str = "One moment while I build your workout.";
    /// Reply after a workout was created
    pub const WORKOUT_CREATED: &str = "It's live in your workout view. Go check it out.";
    /// Reply when workout creation failed
    pub const WORKOUT_FAILED: &str = "Workout failed. Tell me your goal and equipment.";
    /// Appended to proposal summaries
    pub const PROPOSAL_QUESTION: &str = "Want me to apply it?";
    /// Reply after applying a macro proposal
    pub const MACROS_APPLIED: &str = "Done. Your macros are updated.";
    /// Reply after applying a split proposal
    pub const SPLIT_APPLIED: &str = "Done. Your training split is updated.";
    /// Reply after a declined proposal
    pub const PROPOSAL_DECLINED: &str = "No problem. Keeping your current plan.";
    /// Reply when the model returned nothing usable
    pub const EMPTY_REPLY_FALLBACK: &str = "Tell me a bit more so I can help.";
}

/// Blob storage defaults
pub mod storage {
    /// Bucket for meal scan photos
    pub const DEFAULT_MEAL_PHOTO_BUCKET: &str = "meal-photos";
    /// Bucket for progress photos
    pub const DEFAULT_PROGRESS_PHOTO_BUCKET: &str = "progress-photos";
    /// Check-ins that keep their photos
    pub const DEFAULT_CHECKIN_PHOTO_RETENTION: usize = 12;
}

/// Progress report bounds
pub mod progress {
    /// Days covered by the macro adherence report when none are requested
    pub const DEFAULT_ADHERENCE_RANGE_DAYS: i64 = 30;
    /// Longest macro adherence window a client may request
    pub const MAX_ADHERENCE_RANGE_DAYS: i64 = 365;
}

/// Identity defaults
pub mod users {
    /// Prefix hashed into UUID v5 for non-UUID client ids
    pub const USER_ID_NAMESPACE_PREFIX: &str = "fitai:";
    /// Password hash stored for placeholder users
    pub const PLACEHOLDER_PASSWORD_HASH: &str = "placeholder";
    /// Default role for new users
    pub const DEFAULT_ROLE: &str = "user";
}
