// ABOUTME: Centralized resource container shared by every route handler
// ABOUTME: Holds config, database, LLM provider, blob store and optional food-database clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Server Resources
//!
//! Built once at startup and handed to each router as `Arc<ServerResources>`.
//! The LLM and blob store are trait objects so tests can swap in fakes; the
//! food-database clients are `None` when their credentials are missing.

use std::sync::Arc;

use fitai_core::errors::{AppError, AppResult};
use tracing::info;

use crate::config::ServerConfig;
use crate::database::Database;
use crate::external::{FatSecretClient, FatSecretClientConfig, UsdaClient, UsdaClientConfig};
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::storage::{self, BlobStore};

/// Shared dependencies for request handlers
#[derive(Clone)]
pub struct ServerResources {
    pub config: Arc<ServerConfig>,
    pub database: Database,
    pub llm: Arc<dyn LlmProvider>,
    pub blob_store: Arc<dyn BlobStore>,
    pub usda: Option<Arc<UsdaClient>>,
    pub fatsecret: Option<Arc<FatSecretClient>>,
}

impl ServerResources {
    /// Assemble resources from explicit parts
    #[must_use]
    pub fn new(
        config: Arc<ServerConfig>,
        database: Database,
        llm: Arc<dyn LlmProvider>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            config,
            database,
            llm,
            blob_store,
            usda: None,
            fatsecret: None,
        }
    }

    /// Attach a USDA client
    #[must_use]
    pub fn with_usda(mut self, client: UsdaClient) -> Self {
        self.usda = Some(Arc::new(client));
        self
    }

    /// Attach a `FatSecret` client
    #[must_use]
    pub fn with_fatsecret(mut self, client: FatSecretClient) -> Self {
        self.fatsecret = Some(Arc::new(client));
        self
    }

    /// Build production resources from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the LLM client or blob store cannot be created
    pub fn from_config(config: Arc<ServerConfig>, database: Database) -> AppResult<Self> {
        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(config.llm.clone())?);
        let blob_store = storage::from_config(&config.storage)?;

        let mut resources = Self::new(config.clone(), database, llm, blob_store);
        if let Some(usda) = UsdaClientConfig::from_settings(&config.nutrition.usda) {
            resources = resources.with_usda(UsdaClient::new(usda));
        }
        if let Some(fatsecret) = FatSecretClientConfig::from_settings(&config.nutrition.fatsecret) {
            resources = resources.with_fatsecret(FatSecretClient::new(fatsecret));
        }

        info!(
            llm = resources.llm.name(),
            storage = resources.blob_store.name(),
            usda = resources.usda.is_some(),
            fatsecret = resources.fatsecret.is_some(),
            "Server resources ready"
        );
        Ok(resources)
    }

    /// USDA client or 503 when not configured
    ///
    /// # Errors
    ///
    /// Returns `ExternalServiceUnavailable` when no API key was configured
    pub fn usda(&self) -> AppResult<&UsdaClient> {
        self.usda
            .as_deref()
            .ok_or_else(|| AppError::external_unavailable("USDA FoodData Central"))
    }

    /// `FatSecret` client or 503 when not configured
    ///
    /// # Errors
    ///
    /// Returns `ExternalServiceUnavailable` when no credentials were configured
    pub fn fatsecret(&self) -> AppResult<&FatSecretClient> {
        self.fatsecret
            .as_deref()
            .ok_or_else(|| AppError::external_unavailable("FatSecret"))
    }
}
