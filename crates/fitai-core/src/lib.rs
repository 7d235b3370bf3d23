// ABOUTME: Core types and constants for the FitAI backend
// ABOUTME: Foundation crate with error handling, domain models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # FitAI Core
//!
//! Foundation crate providing shared types and constants for the FitAI
//! backend. It changes rarely so the server crate gets incremental
//! compilation benefits.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **constants**: Application-wide constants organized by domain
//! - **models**: Domain value types shared between services and routes

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core domain models (macro targets, normalized foods, check-in answers)
pub mod models;
