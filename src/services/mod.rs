// ABOUTME: Domain service layer for business logic extracted from route handlers
// ABOUTME: Onboarding, training, check-ins, macros and the chat coach sit here, routes stay thin
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Domain service layer
//!
//! Route handlers parse requests and shape responses. Anything with a
//! business rule (unit conversion, PR detection, macro clamping, the chat
//! turn) lives here as free async functions over [`crate::database::Database`]
//! and the [`crate::llm::LlmProvider`] trait.

/// Weekly check-in analysis and daily streaks
pub mod checkins;

/// Chat coach turn orchestration
pub mod coach_chat;

/// Reply shaping and intent heuristics for the chat coach
pub mod coach_reply;

/// Client id normalization and placeholder users
pub mod identity;

/// Macro clamping and formula targets
pub mod macros;

/// Meal logs and macro adherence
pub mod meals;

/// Intake form processing
pub mod onboarding;

/// Prompt execution with AI job tracking
pub mod prompt_runner;

/// Templates, sessions, PRs and coach workouts
pub mod training;
