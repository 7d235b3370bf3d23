// ABOUTME: OpenAI-compatible chat completion and moderation provider
// ABOUTME: Handles tool calls, image parts, and maps HTTP failures onto AppError codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # `OpenAI` Provider
//!
//! Talks to `/chat/completions` and `/moderations` on any endpoint that
//! speaks the `OpenAI` wire format. Without an API key the provider still
//! constructs, but every call fails with a configuration error so callers
//! with a local fallback (daily check-in replies) keep working.

use std::time::Duration;

use async_trait::async_trait;
use fitai_core::errors::{AppError, ErrorCode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error, instrument};

use super::{
    ChatMessage, ChatRequest, ChatResponse, FunctionCall, LlmCapabilities, LlmProvider,
    ModerationResult, TokenUsage, ToolDefinition,
};
use crate::config::LlmConfig;

/// Connection timeout for the API
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Request timeout (vision calls can be slow)
const REQUEST_TIMEOUT_SECS: u64 = 120;

const SERVICE: &str = "OpenAI";

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ToolDefinition> for OpenAiTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            tool_type: "function",
            function: OpenAiFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

/// Message content is a plain string, or text + image parts for vision
#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: Value,
}

impl OpenAiMessage {
    fn convert(msg: &ChatMessage, vision: bool) -> Self {
        let content = if vision && !msg.image_urls.is_empty() {
            let mut parts = vec![json!({ "type": "text", "text": msg.content })];
            parts.extend(
                msg.image_urls
                    .iter()
                    .filter(|url| !url.is_empty())
                    .map(|url| json!({ "type": "image_url", "image_url": { "url": url } })),
            );
            Value::Array(parts)
        } else {
            Value::String(msg.content.clone())
        };
        Self {
            role: msg.role.as_str(),
            content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    function: OpenAiFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    #[serde(default)]
    results: Vec<ModerationEntry>,
}

#[derive(Debug, Deserialize)]
struct ModerationEntry {
    flagged: bool,
    #[serde(default)]
    categories: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// `OpenAI`-compatible LLM provider
pub struct OpenAiProvider {
    client: Client,
    config: LlmConfig,
}

impl OpenAiProvider {
    /// Create a new provider
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(config: LlmConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'))
    }

    fn api_key(&self) -> Result<&str, AppError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::config("OPENAI_API_KEY is not set"))
    }

    async fn post_json(&self, endpoint: &str, body: &impl Serialize) -> Result<String, AppError> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .post(self.api_url(endpoint))
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send request to {SERVICE}: {e}");
                AppError::external_service(SERVICE, format!("Failed to connect: {e}"))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AppError::external_service(SERVICE, format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            return Err(Self::parse_error_response(status, &text));
        }
        Ok(text)
    }

    /// Map an error status onto an `AppError`
    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> AppError {
        let message = serde_json::from_str::<OpenAiErrorResponse>(body).map_or_else(
            |_| body.chars().take(200).collect::<String>(),
            |e| e.error.message,
        );

        match status.as_u16() {
            401 | 403 => AppError::new(
                ErrorCode::ExternalServiceError,
                format!("{SERVICE} authentication failed: {message}"),
            ),
            429 => AppError::new(
                ErrorCode::ExternalRateLimited,
                "LLM rate limit reached. Please wait a moment and try again.",
            ),
            502..=504 => AppError::new(
                ErrorCode::ExternalServiceUnavailable,
                format!("{SERVICE} is unavailable: {message}"),
            ),
            _ => AppError::external_service(SERVICE, format!("API error ({status}): {message}")),
        }
    }

    fn convert_tool_calls(calls: Vec<OpenAiToolCall>) -> Vec<FunctionCall> {
        calls
            .into_iter()
            .map(|call| FunctionCall {
                args: serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null),
                name: call.function.name,
            })
            .collect()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::full_featured()
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.config.model)))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let model = request.model.as_deref().unwrap_or(&self.config.model);
        let has_tools = !request.tools.is_empty();

        let body = OpenAiRequest {
            model: model.to_owned(),
            messages: request
                .messages
                .iter()
                .map(|m| OpenAiMessage::convert(m, true))
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools: has_tools.then(|| request.tools.iter().map(OpenAiTool::from).collect()),
            tool_choice: has_tools.then_some("auto"),
        };
        debug!(
            messages = body.messages.len(),
            tools = has_tools,
            "Sending chat completion request"
        );

        let text = self.post_json("chat/completions", &body).await?;
        let parsed: OpenAiResponse = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse {SERVICE} response: {e}");
            AppError::external_service(SERVICE, format!("Failed to parse response: {e}"))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::external_service(SERVICE, "API returned no choices"))?;

        let function_calls = choice
            .message
            .tool_calls
            .map(Self::convert_tool_calls)
            .unwrap_or_default();

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            function_calls,
            model: if parsed.model.is_empty() {
                model.to_owned()
            } else {
                parsed.model
            },
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }

    #[instrument(skip(self, input))]
    async fn moderate(&self, input: &str) -> Result<ModerationResult, AppError> {
        let body = json!({ "model": self.config.moderation_model, "input": input });
        let text = self.post_json("moderations", &body).await?;
        let parsed: ModerationResponse = serde_json::from_str(&text).map_err(|e| {
            AppError::external_service(SERVICE, format!("Failed to parse moderation: {e}"))
        })?;

        let Some(entry) = parsed.results.into_iter().next() else {
            return Ok(ModerationResult::default());
        };
        if !entry.flagged {
            return Ok(ModerationResult::default());
        }

        let categories = entry
            .categories
            .into_iter()
            .filter(|(_, flagged)| flagged.as_bool().unwrap_or(false))
            .map(|(name, _)| name)
            .collect();
        Ok(ModerationResult {
            flagged: true,
            categories,
        })
    }
}
