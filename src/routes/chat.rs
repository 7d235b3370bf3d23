// ABOUTME: Chat route handlers for coach threads and messages
// ABOUTME: Messages answer as JSON or as a server-sent event stream ending in [DONE]
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Chat routes for the AI coach
//!
//! `POST /chat/message` streams by default. Workout requests emit a holding
//! line first, build the workout, then emit the outcome line. Every stream
//! ends with a `[DONE]` event.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fitai_core::constants::chat::WORKOUT_PENDING;
use fitai_core::errors::AppError;
use futures_util::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::resources::ServerResources;
use crate::services::coach_chat::{self, CoachMessage, CoachTurn};
use crate::services::identity::{ensure_user, normalize_user_id};

/// Stream terminator
const DONE_EVENT: &str = "[DONE]";

/// Create thread request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateThreadRequest {
    pub user_id: String,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user_id: String,
}

const fn default_stream() -> bool {
    true
}

/// Chat message request
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageRequest {
    pub user_id: String,
    pub thread_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default)]
    pub local_workout_snapshot: Value,
}

/// Coach chat routes
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/chat/thread", post(Self::handle_create_thread))
            .route("/chat/threads", get(Self::handle_list_threads))
            .route("/chat/thread/:thread_id", get(Self::handle_get_thread))
            .route("/chat/message", post(Self::handle_message))
            .with_state(resources)
    }

    async fn handle_create_thread(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<CreateThreadRequest>,
    ) -> Result<Response, AppError> {
        let user_id = ensure_user(&resources.database, &request.user_id).await?;
        let title = request.title.as_deref().filter(|t| !t.trim().is_empty());
        let thread = resources
            .database
            .chat()
            .create_thread(&user_id, title)
            .await?;
        info!(thread_id = %thread.id, "Chat thread created");
        Ok((StatusCode::OK, Json(json!({ "thread": thread }))).into_response())
    }

    async fn handle_list_threads(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<UserQuery>,
    ) -> Result<Response, AppError> {
        let threads = resources
            .database
            .chat()
            .list_threads(&normalize_user_id(&query.user_id))
            .await?;
        Ok((StatusCode::OK, Json(json!({ "threads": threads }))).into_response())
    }

    async fn handle_get_thread(
        State(resources): State<Arc<ServerResources>>,
        Path(thread_id): Path<String>,
        Query(query): Query<UserQuery>,
    ) -> Result<Response, AppError> {
        let chat = resources.database.chat();
        let thread = chat
            .get_thread_for_user(&thread_id, &normalize_user_id(&query.user_id))
            .await?
            .ok_or_else(|| AppError::not_found("Thread"))?;
        let (messages, summary) =
            tokio::try_join!(chat.list_messages(&thread_id), chat.thread_summary(&thread_id))?;
        Ok((
            StatusCode::OK,
            Json(json!({ "thread": thread, "messages": messages, "summary": summary })),
        )
            .into_response())
    }

    async fn handle_message(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<ChatMessageRequest>,
    ) -> Result<Response, AppError> {
        let stream = request.stream;
        let message = CoachMessage {
            user_id: request.user_id,
            thread_id: request.thread_id,
            content: request.content,
            local_workout_snapshot: request.local_workout_snapshot,
        };
        let turn =
            coach_chat::start_turn(&resources.database, resources.llm.as_ref(), &message).await?;

        if stream {
            return Ok(Self::stream_turn(resources, message.thread_id, turn).into_response());
        }

        let reply = match turn {
            CoachTurn::Complete(reply) => reply,
            CoachTurn::Workout { user_id, request } => {
                coach_chat::finish_workout(
                    &resources.database,
                    resources.llm.as_ref(),
                    &message.thread_id,
                    &user_id,
                    &request,
                    None,
                )
                .await?
            }
        };
        Ok((StatusCode::OK, Json(reply)).into_response())
    }

    /// Emit a finished or in-progress turn as server-sent events
    fn stream_turn(
        resources: Arc<ServerResources>,
        thread_id: String,
        turn: CoachTurn,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        let stream = async_stream::stream! {
            match turn {
                CoachTurn::Complete(reply) => {
                    yield Ok(Event::default().data(reply.reply));
                }
                CoachTurn::Workout { user_id, request } => {
                    yield Ok(Event::default().data(WORKOUT_PENDING));
                    match coach_chat::finish_workout(
                        &resources.database,
                        resources.llm.as_ref(),
                        &thread_id,
                        &user_id,
                        &request,
                        Some(WORKOUT_PENDING),
                    )
                    .await
                    {
                        Ok(reply) => yield Ok(Event::default().data(format!(" {}", reply.reply))),
                        Err(e) => error!(thread_id = %thread_id, error = %e.message, "Failed to store workout reply"),
                    }
                }
            }
            yield Ok(Event::default().data(DONE_EVENT));
        };

        Sse::new(stream).keep_alive(KeepAlive::default())
    }
}
