// ABOUTME: External food database clients (USDA FoodData Central, FatSecret)
// ABOUTME: Both clients normalize their responses into the shared NormalizedFood schema
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! External API Clients
//!
//! Third-party nutrition databases. Each client is optional at runtime:
//! routes answer 503 when the matching credentials are not configured.

pub mod fatsecret_client;
pub mod usda_client;

pub use fatsecret_client::{FatSecretClient, FatSecretClientConfig};
pub use usda_client::{UsdaClient, UsdaClientConfig};
