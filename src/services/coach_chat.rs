// ABOUTME: Chat coach orchestration: moderation, context fan-out, proposals, tool calls, persistence
// ABOUTME: Produces a finished reply or a deferred workout build for the streaming route
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Chat Coach
//!
//! One user turn runs as follows:
//!
//! 1. Validate content and thread ownership
//! 2. Concurrently: moderation, user context (7 reads), recent history,
//!    thread summary, and persisting the user message
//! 3. Refuse flagged content
//! 4. Resolve a pending proposal when the user confirms or declines
//! 5. Defer to the workout builder when the message asks for a workout
//! 6. Otherwise call the model with tools and shape the reply
//!
//! Every assistant reply is stored before it is returned.

use std::fmt::Write;

use chrono::{Duration, Utc};
use fitai_core::constants::chat::{
    HISTORY_LIMIT, LOCAL_MODEL, MACROS_APPLIED, PROPOSAL_DECLINED, SPLIT_APPLIED, WORKOUT_CREATED,
    WORKOUT_FAILED,
};
use fitai_core::constants::llm::{CHAT_MAX_TOKENS, CHAT_TEMPERATURE};
use fitai_core::errors::{AppError, AppResult};
use fitai_core::models::{lenient_number, MacroTargets};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, instrument, warn};

use crate::database::{ChatMessageRecord, Database, NewChatMessage};
use crate::llm::{ChatMessage, ChatRequest, FunctionCall, LlmProvider, MessageRole, ToolDefinition};
use crate::services::coach_reply::{
    classify_answer, clamp_duration, drop_echo, is_workout_request, parse_workout_request,
    proposal_reply, refusal_for, shape_reply, ProposalAnswer,
};
use crate::services::identity;
use crate::services::training::{create_coach_workout, dedupe_muscle_groups, CoachWorkoutRequest};

const SYSTEM_PROMPT: &str = "You are FitAI Coach - a gym buddy who texts quick, punchy advice.

RESPONSE RULES (CRITICAL):
- MAX 18 words. Prefer 1 sentence; 2 sentences allowed only if under 18 words.
- Single response only. No multi-part replies or separate messages.
- NO bullet points, lists, or headers unless explicitly asked.
- NEVER repeat info from previous messages or restate what you already know.
- Be encouraging but brief - like texting a friend between sets.
- Only fitness/nutrition topics. Politely redirect others.
- For injuries: one brief tip + \"see a professional.\"
- If user gender is provided, tailor advice and examples accordingly; use neutral language otherwise.

ACTIVE WORKOUT MODE:
- If device_active_workout or active_workout_session is present, they're mid-workout.
- Reference their current exercises and performance naturally, especially last_completed_set if present.
- Keep feedback under 18 words.

WORKOUT GENERATION:
- If user asks to build/create/make/generate a workout, use the generate_workout function.
- Do NOT list exercises yourself.
- Final message must be under 18 words and mention the workout view.

APP ACTIONS:
- To change macro targets or the training split, call propose_app_action with a one-line summary.
- Never claim a change is applied; the user confirms first.

CONTEXT: You have user profile, macros, nutrition, workout history, PRs, templates, and live workout data.";

/// Tools offered to the model on every turn
fn coach_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "generate_workout".to_owned(),
            description: "Creates a new workout for the user based on their request. Call this \
                          when the user asks to build, create, make, or generate a workout."
                .to_owned(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "focus": {
                        "type": "string",
                        "description": "Primary focus of the workout (e.g., 'upper body push')"
                    },
                    "muscle_groups": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Target muscle groups (e.g., ['chest', 'triceps'])"
                    },
                    "duration_minutes": {
                        "type": "integer",
                        "description": "Estimated duration in minutes. Default to 45 if not specified."
                    }
                },
                "required": ["focus", "muscle_groups"]
            }),
        },
        ToolDefinition {
            name: "propose_app_action".to_owned(),
            description: "Proposes a change to the user's macro targets or training split. \
                          The user must confirm before it is applied."
                .to_owned(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "action_type": {"type": "string", "enum": ["update_macros", "change_split"]},
                    "summary": {"type": "string", "description": "One-line description of the change"},
                    "calories": {"type": "number"},
                    "protein": {"type": "number"},
                    "carbs": {"type": "number"},
                    "fats": {"type": "number"},
                    "training_days": {"type": "integer"},
                    "split": {"type": "string"}
                },
                "required": ["action_type", "summary"]
            }),
        },
    ]
}

/// One user message
#[derive(Debug, Clone)]
pub struct CoachMessage {
    /// Client-supplied user id (normalized internally)
    pub user_id: String,
    pub thread_id: String,
    pub content: String,
    /// Live workout state reported by the device
    pub local_workout_snapshot: Value,
}

/// Assistant reply returned to the client
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoachReply {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout_created: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed_action: Option<Value>,
}

/// Outcome of the first phase of a turn
#[derive(Debug, Clone)]
pub enum CoachTurn {
    /// Reply produced and stored
    Complete(CoachReply),
    /// Workout requested; finish with [`finish_workout`]
    Workout {
        user_id: String,
        request: CoachWorkoutRequest,
    },
}

/// Context snapshot sent to the model as a system message
///
/// # Errors
///
/// Returns an error if any of the reads fails
pub async fn build_user_context(
    database: &Database,
    user_id: &str,
    device_snapshot: &Value,
) -> AppResult<Value> {
    let profiles = database.profiles();
    let checkins = database.checkins();
    let nutrition = database.nutrition();
    let workouts = database.workouts();
    let week_ago = (Utc::now().date_naive() - Duration::days(7))
        .format("%Y-%m-%d")
        .to_string();

    let recent_workouts = async {
        let sessions = workouts.list_sessions(user_id, 5).await?;
        let ids: Vec<String> = sessions.iter().map(|s| s.id.clone()).collect();
        let logs = workouts.logs_for_sessions(&ids, 30).await?;
        Ok::<_, AppError>(json!({ "sessions": sessions, "logs": logs }))
    };
    let active_session = async {
        let Some(session) = workouts.active_session(user_id).await? else {
            return Ok::<_, AppError>(Value::Null);
        };
        let logs = workouts.session_logs(&session.id).await?;
        let mut value = serde_json::to_value(&session)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("exercise_logs".to_owned(), serde_json::to_value(logs)?);
        }
        Ok(value)
    };

    let (profile, latest_checkin, recent_workouts, recent_prs, nutrition_logs, templates, active) =
        tokio::try_join!(
            profiles.get(user_id),
            checkins.latest_weekly(user_id),
            recent_workouts,
            workouts.recent_prs(user_id, 5),
            nutrition.logs_since(user_id, &week_ago, 20),
            workouts.list_templates(user_id, Some(10)),
            active_session,
        )?;

    let profile_json = profile.as_ref().map_or_else(
        || {
            json!({
                "name": null, "age": null, "height_cm": null, "weight_kg": null,
                "goal": null, "sex": null, "gender": null, "preferences": null,
            })
        },
        |p| {
            let gender = ["gender", "sex"]
                .iter()
                .find_map(|k| p.preferences.get(*k).and_then(Value::as_str))
                .map(str::to_owned)
                .or_else(|| p.sex.clone());
            json!({
                "name": p.full_name,
                "age": p.age,
                "height_cm": p.height_cm,
                "weight_kg": p.weight_kg,
                "goal": p.goal,
                "sex": p.sex,
                "gender": gender,
                "preferences": p.preferences,
            })
        },
    );

    Ok(json!({
        "profile": profile_json,
        "macro_targets": profile.as_ref().map_or(Value::Null, |p| p.macros.clone()),
        "latest_checkin": latest_checkin,
        "recent_workouts": recent_workouts,
        "recent_prs": recent_prs,
        "nutrition_last_7_days": nutrition_logs,
        "saved_workout_templates": templates,
        "active_workout_session": active,
        "device_active_workout": device_snapshot,
    }))
}

async fn persist_user_message(
    database: &Database,
    user_id: &str,
    thread_id: &str,
    content: &str,
) -> AppResult<()> {
    database.users().ensure_exists(user_id).await?;
    let chat = database.chat();
    chat.insert_message(&NewChatMessage {
        thread_id: thread_id.to_owned(),
        user_id: user_id.to_owned(),
        role: "user".to_owned(),
        content: content.to_owned(),
        ..NewChatMessage::default()
    })
    .await?;
    chat.touch_thread(thread_id).await
}

async fn persist_reply(
    database: &Database,
    user_id: &str,
    thread_id: &str,
    content: &str,
    model: &str,
    metadata: Value,
    safety_flags: Vec<String>,
) -> AppResult<()> {
    let chat = database.chat();
    chat.insert_message(&NewChatMessage {
        thread_id: thread_id.to_owned(),
        user_id: user_id.to_owned(),
        role: "assistant".to_owned(),
        content: content.to_owned(),
        model: Some(model.to_owned()),
        metadata,
        safety_flags,
    })
    .await?;
    chat.touch_thread(thread_id).await
}

/// Pending proposal carried by the last assistant message, if any
fn pending_proposal(
    message: Option<&ChatMessageRecord>,
) -> Option<(&ChatMessageRecord, &Value)> {
    let message = message?;
    let proposal = message.metadata.get("proposed_action")?;
    let pending = proposal.get("status").and_then(Value::as_str) == Some("pending");
    pending.then_some((message, proposal))
}

/// Apply a confirmed proposal and return the confirmation line
async fn apply_proposal(
    database: &Database,
    user_id: &str,
    proposal: &Value,
) -> AppResult<&'static str> {
    let profiles = database.profiles();
    match proposal.get("action_type").and_then(Value::as_str) {
        Some("update_macros") => {
            let current = profiles
                .get(user_id)
                .await?
                .and_then(|p| MacroTargets::from_value(&p.macros))
                .unwrap_or_default();
            let pick = |field: &str, existing: f64| {
                let proposed = lenient_number(proposal.get(field));
                if proposed > 0.0 {
                    proposed
                } else {
                    existing
                }
            };
            let updated = MacroTargets {
                calories: pick("calories", current.calories),
                protein: pick("protein", current.protein),
                carbs: pick("carbs", current.carbs),
                fats: pick("fats", current.fats),
            };
            profiles.set_macros(user_id, &json!(updated)).await?;
            Ok(MACROS_APPLIED)
        }
        Some("change_split") => {
            let mut patch = Map::new();
            if let Some(days) = proposal.get("training_days").filter(|v| !v.is_null()) {
                patch.insert("training_days".to_owned(), days.clone());
            }
            if let Some(split) = proposal.get("split").filter(|v| !v.is_null()) {
                patch.insert("split".to_owned(), split.clone());
            }
            profiles.merge_preferences(user_id, patch).await?;
            Ok(SPLIT_APPLIED)
        }
        other => Err(AppError::invalid_input(format!(
            "Unsupported proposed action: {}",
            other.unwrap_or("none")
        ))),
    }
}

/// Confirm or decline a pending proposal
async fn resolve_proposal(
    database: &Database,
    user_id: &str,
    thread_id: &str,
    message: &ChatMessageRecord,
    proposal: &Value,
    answer: ProposalAnswer,
) -> AppResult<CoachReply> {
    let (reply, status) = match answer {
        ProposalAnswer::Decline => (PROPOSAL_DECLINED, "declined"),
        ProposalAnswer::Confirm => (apply_proposal(database, user_id, proposal).await?, "applied"),
    };

    let mut updated = proposal.clone();
    if let Some(obj) = updated.as_object_mut() {
        obj.insert("status".to_owned(), json!(status));
    }
    let mut metadata = message.metadata.clone();
    if let Some(obj) = metadata.as_object_mut() {
        obj.insert("proposed_action".to_owned(), updated.clone());
    }
    database
        .chat()
        .update_message_metadata(&message.id, &metadata)
        .await?;

    persist_reply(
        database,
        user_id,
        thread_id,
        reply,
        LOCAL_MODEL,
        json!({ "proposed_action": updated }),
        Vec::new(),
    )
    .await?;
    info!(user_id, status, "Proposal resolved");

    Ok(CoachReply {
        reply: reply.to_owned(),
        proposed_action: Some(updated),
        ..CoachReply::default()
    })
}

fn workout_request_from_tool(call: &FunctionCall) -> CoachWorkoutRequest {
    let focus = call
        .args
        .get("focus")
        .and_then(Value::as_str)
        .filter(|f| !f.trim().is_empty())
        .unwrap_or("custom workout")
        .to_owned();
    let groups: Vec<String> = call
        .args
        .get("muscle_groups")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_owned).collect())
        .unwrap_or_default();
    CoachWorkoutRequest {
        focus,
        muscle_groups: dedupe_muscle_groups(&groups),
        duration_minutes: clamp_duration(call.args.get("duration_minutes").and_then(Value::as_i64)),
    }
}

fn proposal_from_tool(call: &FunctionCall) -> Value {
    let mut proposal = Map::new();
    for key in [
        "action_type",
        "summary",
        "calories",
        "protein",
        "carbs",
        "fats",
        "training_days",
        "split",
    ] {
        if let Some(value) = call.args.get(key).filter(|v| !v.is_null()) {
            proposal.insert(key.to_owned(), value.clone());
        }
    }
    proposal.insert("status".to_owned(), json!("pending"));
    Value::Object(proposal)
}

fn workout_outcome_line(result: &Value) -> &'static str {
    match result.get("success") {
        Some(Value::Bool(true)) => WORKOUT_CREATED,
        _ => WORKOUT_FAILED,
    }
}

/// Run a turn up to the point where a reply exists or a workout must be built
///
/// # Errors
///
/// Returns `InvalidInput` for empty content, `ResourceNotFound` for a thread
/// the user does not own, or any storage/model error
#[instrument(skip_all, fields(thread_id = %message.thread_id))]
pub async fn start_turn(
    database: &Database,
    llm: &dyn LlmProvider,
    message: &CoachMessage,
) -> AppResult<CoachTurn> {
    let content = message.content.as_str();
    if content.trim().is_empty() {
        return Err(AppError::invalid_input("Message content required"));
    }

    let user_id = identity::normalize_user_id(&message.user_id);
    let thread_id = message.thread_id.as_str();
    let chat = database.chat();
    if chat.get_thread_for_user(thread_id, &user_id).await?.is_none() {
        return Err(AppError::not_found("Thread"));
    }

    let (moderation, context, history, summary, last_assistant, persisted) = tokio::join!(
        llm.moderate(content),
        build_user_context(database, &user_id, &message.local_workout_snapshot),
        chat.recent_messages(thread_id, HISTORY_LIMIT),
        chat.thread_summary(thread_id),
        chat.last_assistant_message(thread_id),
        persist_user_message(database, &user_id, thread_id, content),
    );
    persisted?;

    let moderation = moderation?;
    if moderation.flagged {
        let refusal = refusal_for(&moderation.categories);
        warn!(user_id = %user_id, categories = ?moderation.categories, "Message refused by moderation");
        persist_reply(
            database,
            &user_id,
            thread_id,
            refusal,
            LOCAL_MODEL,
            Value::Null,
            moderation.categories,
        )
        .await?;
        return Ok(CoachTurn::Complete(CoachReply {
            reply: refusal.to_owned(),
            ..CoachReply::default()
        }));
    }

    let history = drop_echo(history?, |m| m.role == "user" && m.content == content);

    let last_assistant = last_assistant?;
    if let Some((proposal_message, proposal)) = pending_proposal(last_assistant.as_ref()) {
        if let Some(answer) = classify_answer(content) {
            let reply = resolve_proposal(
                database,
                &user_id,
                thread_id,
                proposal_message,
                proposal,
                answer,
            )
            .await?;
            return Ok(CoachTurn::Complete(reply));
        }
    }

    if is_workout_request(content) {
        return Ok(CoachTurn::Workout {
            user_id,
            request: parse_workout_request(content),
        });
    }

    let mut context_message = format!(
        "User Context (server-trusted + device snapshot): {}",
        context?
    );
    if let Some(summary) = summary?.filter(|s| !s.trim().is_empty()) {
        let _ = write!(context_message, "\nThread Summary: {summary}");
    }

    let mut messages = vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::system(context_message),
    ];
    messages.extend(
        history
            .iter()
            .map(|m| ChatMessage::new(MessageRole::from_stored(&m.role), m.content.clone())),
    );
    messages.push(ChatMessage::user(content));

    let request = ChatRequest::new(messages)
        .with_max_tokens(CHAT_MAX_TOKENS)
        .with_temperature(CHAT_TEMPERATURE)
        .with_tools(coach_tools());
    let response = llm.complete(&request).await?;

    let mut reply = CoachReply::default();
    let mut metadata = Value::Null;
    for call in &response.function_calls {
        match call.name.as_str() {
            "generate_workout" => {
                let result =
                    create_coach_workout(database, llm, &user_id, &workout_request_from_tool(call))
                        .await;
                reply.reply = workout_outcome_line(&result).to_owned();
                metadata = json!({ "workout_created": result });
                reply.workout_created = Some(result);
            }
            "propose_app_action" => {
                let proposal = proposal_from_tool(call);
                reply.reply = proposal_reply(
                    proposal.get("summary").and_then(Value::as_str).unwrap_or_default(),
                );
                metadata = json!({ "proposed_action": proposal });
                reply.proposed_action = Some(proposal);
            }
            other => warn!(tool = other, "Ignoring unknown tool call"),
        }
    }
    if reply.proposed_action.is_none() {
        let raw = if reply.reply.is_empty() {
            response.content.as_str()
        } else {
            reply.reply.as_str()
        };
        reply.reply = shape_reply(raw);
    }

    persist_reply(
        database,
        &user_id,
        thread_id,
        &reply.reply,
        &response.model,
        metadata,
        Vec::new(),
    )
    .await?;

    Ok(CoachTurn::Complete(reply))
}

/// Build a requested workout and store the assistant reply
///
/// When `streamed_prefix` is set the stored content is the prefix that was
/// already streamed followed by the outcome line.
///
/// # Errors
///
/// Returns an error if the reply cannot be stored
pub async fn finish_workout(
    database: &Database,
    llm: &dyn LlmProvider,
    thread_id: &str,
    user_id: &str,
    request: &CoachWorkoutRequest,
    streamed_prefix: Option<&str>,
) -> AppResult<CoachReply> {
    let result = create_coach_workout(database, llm, user_id, request).await;
    let outcome = workout_outcome_line(&result);
    let content = streamed_prefix.map_or_else(|| outcome.to_owned(), |p| format!("{p} {outcome}"));

    persist_reply(
        database,
        user_id,
        thread_id,
        &content,
        llm.default_model(),
        json!({ "workout_created": result }),
        Vec::new(),
    )
    .await?;

    Ok(CoachReply {
        reply: outcome.to_owned(),
        workout_created: Some(result),
        proposed_action: None,
    })
}
