// ABOUTME: FitAI server binary entry point
// ABOUTME: Loads configuration, prepares the database, and serves the HTTP API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # FitAI Server Binary
//!
//! Environment variables configure everything; the command-line flags only
//! override the port and database location.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use fitai_server::{
    config::{DatabaseUrl, ServerConfig},
    database::Database,
    logging::LoggingConfig,
    resources::ServerResources,
    server,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "fitai-server")]
#[command(about = "FitAI API - onboarding, workouts, nutrition, check-ins and an AI coach")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override database URL (`sqlite:path` or `sqlite::memory:`)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(url) = args.database_url.as_deref() {
        config.database.url = DatabaseUrl::parse_url(url)?;
    }
    config.validate()?;

    LoggingConfig::from_env()
        .with_default_level(&config.log_level.to_string())
        .init()?;
    info!("{}", config.summary());

    let database = Database::new(&config.database.url).await?;
    if config.database.auto_migrate {
        database.migrate().await?;
    }
    info!(database = %config.database.url, "Database initialized");

    let config = Arc::new(config);
    let resources = Arc::new(ServerResources::from_config(config, database)?);

    if let Err(e) = server::serve(resources).await {
        error!("Server error: {e:#}");
        return Err(e);
    }

    Ok(())
}
