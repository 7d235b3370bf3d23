// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Re-exports the environment-driven ServerConfig and its sections
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module for the `FitAI` server
//!
//! All settings come from environment variables (optionally loaded from a
//! `.env` file). There is no config file format.

/// Environment and server configuration
pub mod environment;

pub use environment::{
    DatabaseConfig, DatabaseUrl, Environment, FatSecretConfig, LlmConfig, LogLevel,
    NutritionApiConfig, ServerConfig, StorageBackend, StorageConfig, UsdaConfig,
};
