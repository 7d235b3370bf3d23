// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management for production deployment

use std::env;
use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use fitai_core::constants::{llm, network, storage};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Strongly typed log level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational (default)
    #[default]
    Info,
    /// Debug output
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    /// Convert to `tracing::Level`
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }

    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        f.write_str(name)
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development (default)
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Test runs
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Testing => "testing",
        };
        f.write_str(name)
    }
}

/// Type-safe database location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Database file
        path: PathBuf,
    },
    /// In-memory `SQLite` (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string with validation
    ///
    /// # Errors
    ///
    /// Returns an error for database engines this server cannot drive
    pub fn parse_url(s: &str) -> Result<Self> {
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            return Err(anyhow::anyhow!(
                "PostgreSQL URLs are not supported; use a sqlite: URL"
            ));
        }
        let path_str = s.strip_prefix("sqlite:").unwrap_or(s);
        let path_str = path_str.strip_prefix("//").unwrap_or(path_str);
        if path_str == ":memory:" {
            Ok(Self::Memory)
        } else {
            Ok(Self::SQLite {
                path: PathBuf::from(path_str),
            })
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::SQLite {
            path: PathBuf::from("./data/fitai.db"),
        }
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database location
    pub url: DatabaseUrl,
    /// Run table migrations at startup
    pub auto_migrate: bool,
}

/// OpenAI-compatible LLM settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key; requests fail with a config error when absent
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Chat completion model
    pub model: String,
    /// Moderation model
    pub moderation_model: String,
}

/// USDA `FoodData` Central settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsdaConfig {
    /// API key; the client is disabled when absent
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
}

/// `FatSecret` Platform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FatSecretConfig {
    /// OAuth2 client id
    pub client_id: Option<String>,
    /// OAuth2 client secret
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    /// REST base URL
    pub base_url: String,
    /// OAuth2 token endpoint
    pub token_url: String,
}

impl FatSecretConfig {
    /// Both credentials are present
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

/// Third-party nutrition database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionApiConfig {
    /// USDA settings
    pub usda: UsdaConfig,
    /// `FatSecret` settings
    pub fatsecret: FatSecretConfig,
}

/// Where uploaded photos are stored
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Local filesystem directory
    #[default]
    Local,
    /// Supabase Storage over HTTP
    Supabase,
}

impl StorageBackend {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        if s.eq_ignore_ascii_case("supabase") {
            Self::Supabase
        } else {
            Self::Local
        }
    }
}

/// Blob storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Selected backend
    pub backend: StorageBackend,
    /// Root directory for the local backend
    pub local_dir: PathBuf,
    /// URL prefix under which local files are served
    pub public_base_url: String,
    /// Supabase project URL
    pub supabase_url: Option<String>,
    /// Supabase service-role key
    #[serde(skip_serializing)]
    pub supabase_key: Option<String>,
    /// Bucket for meal scan photos
    pub meal_photo_bucket: String,
    /// Bucket for progress photos
    pub progress_photo_bucket: String,
    /// Number of most recent weekly check-ins that keep their photos
    pub checkin_photo_retention: usize,
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Bind address
    pub host: String,
    /// Log level
    pub log_level: LogLevel,
    /// Deployment environment
    pub environment: Environment,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Allowed CORS origins (`*` for any)
    pub cors_origins: Vec<String>,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// LLM provider settings
    pub llm: LlmConfig,
    /// Nutrition database settings
    pub nutrition: NutritionApiConfig,
    /// Blob storage settings
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: network::DEFAULT_HTTP_PORT,
            host: network::DEFAULT_HOST.to_owned(),
            log_level: LogLevel::default(),
            environment: Environment::default(),
            database: DatabaseConfig {
                url: DatabaseUrl::default(),
                auto_migrate: true,
            },
            cors_origins: vec!["*".to_owned()],
            request_timeout_secs: network::DEFAULT_REQUEST_TIMEOUT_SECS,
            llm: LlmConfig {
                api_key: None,
                base_url: llm::DEFAULT_BASE_URL.to_owned(),
                model: llm::DEFAULT_MODEL.to_owned(),
                moderation_model: llm::DEFAULT_MODERATION_MODEL.to_owned(),
            },
            nutrition: NutritionApiConfig {
                usda: UsdaConfig {
                    api_key: None,
                    base_url: "https://api.nal.usda.gov/fdc/v1".to_owned(),
                },
                fatsecret: FatSecretConfig {
                    client_id: None,
                    client_secret: None,
                    base_url: "https://platform.fatsecret.com/rest".to_owned(),
                    token_url: "https://oauth.fatsecret.com/connect/token".to_owned(),
                },
            },
            storage: StorageConfig {
                backend: StorageBackend::Local,
                local_dir: PathBuf::from("./data/uploads"),
                public_base_url: "/uploads".to_owned(),
                supabase_url: None,
                supabase_key: None,
                meal_photo_bucket: storage::DEFAULT_MEAL_PHOTO_BUCKET.to_owned(),
                progress_photo_bucket: storage::DEFAULT_PROGRESS_PHOTO_BUCKET.to_owned(),
                checkin_photo_retention: storage::DEFAULT_CHECKIN_PHOTO_RETENTION,
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed or validation fails
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {e}");
        }

        let defaults = Self::default();

        let config = Self {
            http_port: env_var_or("HTTP_PORT", &defaults.http_port.to_string())
                .parse()
                .context("Invalid HTTP_PORT value")?,
            host: env_var_or("HOST", &defaults.host),
            log_level: LogLevel::from_str_or_default(&env_var_or("LOG_LEVEL", "info")),
            environment: Environment::from_str_or_default(&env_var_or(
                "ENVIRONMENT",
                "development",
            )),
            database: DatabaseConfig {
                url: DatabaseUrl::parse_url(&env_var_or(
                    "DATABASE_URL",
                    &defaults.database.url.to_connection_string(),
                ))?,
                auto_migrate: env_var_or("AUTO_MIGRATE", "true")
                    .parse()
                    .context("Invalid AUTO_MIGRATE value")?,
            },
            cors_origins: parse_origins(&env_var_or("CORS_ALLOWED_ORIGINS", "*")),
            request_timeout_secs: env_var_or(
                "REQUEST_TIMEOUT_SECS",
                &defaults.request_timeout_secs.to_string(),
            )
            .parse()
            .context("Invalid REQUEST_TIMEOUT_SECS value")?,
            llm: LlmConfig {
                api_key: optional_env("OPENAI_API_KEY"),
                base_url: env_var_or("OPENAI_BASE_URL", &defaults.llm.base_url),
                model: env_var_or("OPENAI_MODEL", &defaults.llm.model),
                moderation_model: env_var_or(
                    "OPENAI_MODERATION_MODEL",
                    &defaults.llm.moderation_model,
                ),
            },
            nutrition: NutritionApiConfig {
                usda: UsdaConfig {
                    api_key: optional_env("USDA_API_KEY"),
                    base_url: env_var_or("USDA_BASE_URL", &defaults.nutrition.usda.base_url),
                },
                fatsecret: FatSecretConfig {
                    client_id: optional_env("FATSECRET_CLIENT_ID"),
                    client_secret: optional_env("FATSECRET_CLIENT_SECRET"),
                    base_url: env_var_or(
                        "FATSECRET_BASE_URL",
                        &defaults.nutrition.fatsecret.base_url,
                    ),
                    token_url: env_var_or(
                        "FATSECRET_TOKEN_URL",
                        &defaults.nutrition.fatsecret.token_url,
                    ),
                },
            },
            storage: StorageConfig {
                backend: StorageBackend::from_str_or_default(&env_var_or(
                    "STORAGE_BACKEND",
                    "local",
                )),
                local_dir: PathBuf::from(env_var_or(
                    "STORAGE_LOCAL_DIR",
                    &defaults.storage.local_dir.display().to_string(),
                )),
                public_base_url: env_var_or(
                    "STORAGE_PUBLIC_BASE_URL",
                    &defaults.storage.public_base_url,
                ),
                supabase_url: optional_env("SUPABASE_URL"),
                supabase_key: optional_env("SUPABASE_SERVICE_ROLE_KEY"),
                meal_photo_bucket: env_var_or(
                    "SUPABASE_MEAL_PHOTO_BUCKET",
                    &defaults.storage.meal_photo_bucket,
                ),
                progress_photo_bucket: env_var_or(
                    "SUPABASE_PROGRESS_PHOTO_BUCKET",
                    &defaults.storage.progress_photo_bucket,
                ),
                checkin_photo_retention: env_var_or(
                    "CHECKIN_PHOTO_RETENTION",
                    &defaults.storage.checkin_photo_retention.to_string(),
                )
                .parse()
                .context("Invalid CHECKIN_PHOTO_RETENTION value")?,
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error when settings contradict each other
    pub fn validate(&self) -> Result<()> {
        if self.http_port == 0 {
            return Err(anyhow::anyhow!("HTTP_PORT must be non-zero"));
        }

        if self.storage.backend == StorageBackend::Supabase
            && (self.storage.supabase_url.is_none() || self.storage.supabase_key.is_none())
        {
            return Err(anyhow::anyhow!(
                "STORAGE_BACKEND=supabase requires SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY"
            ));
        }

        let fatsecret = &self.nutrition.fatsecret;
        if fatsecret.client_id.is_some() != fatsecret.client_secret.is_some() {
            return Err(anyhow::anyhow!(
                "FATSECRET_CLIENT_ID and FATSECRET_CLIENT_SECRET must be set together"
            ));
        }

        if self.llm.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; AI endpoints will fail");
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        let enabled = |on: bool| if on { "Enabled" } else { "Disabled" };
        format!(
            "FitAI Server Configuration:\n\
             - Bind: {}:{}\n\
             - Environment: {}\n\
             - Log Level: {}\n\
             - Database: {}\n\
             - LLM Model: {} ({})\n\
             - USDA: {}\n\
             - FatSecret: {}\n\
             - Storage: {:?}\n\
             - Check-in Photo Retention: {}",
            self.host,
            self.http_port,
            self.environment,
            self.log_level,
            if self.database.url.is_memory() {
                "SQLite (memory)"
            } else {
                "SQLite"
            },
            self.llm.model,
            enabled(self.llm.api_key.is_some()),
            enabled(self.nutrition.usda.api_key.is_some()),
            enabled(self.nutrition.fatsecret.is_configured()),
            self.storage.backend,
            self.storage.checkin_photo_retention,
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Get a non-empty environment variable
fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str.trim() == "*" {
        vec!["*".to_owned()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
