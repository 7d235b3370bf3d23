// ABOUTME: HTTP middleware for CORS and request tracing
// ABOUTME: Provides the CORS layer and request-id aware spans for structured logging
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod cors;
pub mod tracing;

// CORS configuration
pub use cors::setup_cors;

// Request tracing
pub use tracing::{make_request_span, REQUEST_ID_HEADER};
