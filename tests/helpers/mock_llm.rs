// ABOUTME: Scripted LLM provider for integration tests
// ABOUTME: Replays queued completions, records requests, and fakes moderation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use fitai_server::errors::AppError;
use fitai_server::llm::{
    ChatRequest, ChatResponse, FunctionCall, LlmCapabilities, LlmProvider, ModerationResult,
};
use serde_json::Value;

/// Model name reported by scripted completions
pub const SCRIPTED_MODEL: &str = "scripted-model";

/// Provider that answers from a queue
///
/// An empty queue answers with `default_reply`. Queued errors are returned
/// once, in order with the other entries.
pub struct ScriptedLlm {
    queue: Mutex<VecDeque<Result<ChatResponse, AppError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    moderation: Mutex<ModerationResult>,
    default_reply: String,
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            moderation: Mutex::new(ModerationResult::default()),
            default_reply: "Keep going, you're doing great.".to_owned(),
        }
    }

    /// Queue a text completion
    pub fn push_text(&self, content: &str) {
        self.push(Ok(ChatResponse {
            content: content.to_owned(),
            model: SCRIPTED_MODEL.to_owned(),
            ..ChatResponse::default()
        }));
    }

    /// Queue a completion that only calls a tool
    pub fn push_tool_call(&self, name: &str, args: Value) {
        self.push(Ok(ChatResponse {
            function_calls: vec![FunctionCall {
                name: name.to_owned(),
                args,
            }],
            model: SCRIPTED_MODEL.to_owned(),
            finish_reason: Some("tool_calls".to_owned()),
            ..ChatResponse::default()
        }));
    }

    /// Queue a failed completion
    pub fn push_error(&self, message: &str) {
        self.push(Err(AppError::external_service("OpenAI", message)));
    }

    fn push(&self, entry: Result<ChatResponse, AppError>) {
        self.queue.lock().unwrap().push_back(entry);
    }

    /// Flag every following moderation call
    pub fn flag_moderation(&self, categories: &[&str]) {
        *self.moderation.lock().unwrap() = ModerationResult {
            flagged: true,
            categories: categories.iter().map(|c| (*c).to_owned()).collect(),
        };
    }

    /// All completion requests seen so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of completion calls made
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::full_featured()
    }

    fn default_model(&self) -> &str {
        SCRIPTED_MODEL
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.queue.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Ok(ChatResponse {
                content: self.default_reply.clone(),
                model: SCRIPTED_MODEL.to_owned(),
                ..ChatResponse::default()
            })
        })
    }

    async fn moderate(&self, _input: &str) -> Result<ModerationResult, AppError> {
        Ok(self.moderation.lock().unwrap().clone())
    }
}
