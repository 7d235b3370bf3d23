// ABOUTME: HTTP server assembly for the FitAI API
// ABOUTME: Merges domain routers, applies the tower middleware stack, and serves with graceful shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # HTTP Server
//!
//! `build_router` is what tests drive; `serve` binds the listener and runs
//! until ctrl-c or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Request, Uri};
use axum::Router;
use fitai_core::constants::network::MAX_BODY_BYTES;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{ServerConfig, StorageBackend};
use crate::middleware::{make_request_span, setup_cors};
use crate::resources::ServerResources;
use crate::routes::{
    AiRoutes, AuthRoutes, ChatRoutes, CheckinRoutes, CoachRoutes, ExerciseRoutes, HealthRoutes,
    NutritionRoutes, OnboardingRoutes, PaymentRoutes, ProfileRoutes, ProgressRoutes, ScanRoutes,
    WorkoutRoutes,
};

/// Every domain router merged, without middleware
pub fn api_routes(resources: &Arc<ServerResources>) -> Router {
    Router::new()
        .merge(HealthRoutes::routes(resources.clone()))
        .merge(AuthRoutes::routes(resources.clone()))
        .merge(OnboardingRoutes::routes(resources.clone()))
        .merge(ProfileRoutes::routes(resources.clone()))
        .merge(WorkoutRoutes::routes(resources.clone()))
        .merge(ExerciseRoutes::routes(resources.clone()))
        .merge(NutritionRoutes::routes(resources.clone()))
        .merge(ScanRoutes::routes(resources.clone()))
        .merge(ProgressRoutes::routes(resources.clone()))
        .merge(CheckinRoutes::routes(resources.clone()))
        .merge(ChatRoutes::routes(resources.clone()))
        .merge(CoachRoutes::routes(resources.clone()))
        .merge(PaymentRoutes::routes(resources.clone()))
        .merge(AiRoutes::routes(resources.clone()))
}

/// Mount point for locally stored uploads, if any
///
/// Only the path of `STORAGE_PUBLIC_BASE_URL` matters; an absolute URL is
/// reduced to its path.
fn local_upload_mount(config: &ServerConfig) -> Option<String> {
    if config.storage.backend != StorageBackend::Local {
        return None;
    }
    let base = config.storage.public_base_url.trim();
    let path = if base.starts_with('/') {
        base.to_owned()
    } else {
        base.parse::<Uri>().ok()?.path().to_owned()
    };
    let path = path.trim_end_matches('/');
    (!path.is_empty()).then(|| path.to_owned())
}

/// Full application with middleware
pub fn build_router(resources: &Arc<ServerResources>) -> Router {
    let config = &resources.config;
    let mut app = api_routes(resources);

    if let Some(mount) = local_upload_mount(config) {
        info!(mount = %mount, dir = %config.storage.local_dir.display(), "Serving local uploads");
        app = app.nest_service(&mount, ServeDir::new(&config.storage.local_dir));
    }

    // Layers run bottom-up on requests: the id must exist before the trace span reads it
    app.layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(setup_cors(config))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            make_request_span(request)
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Bind and serve until a shutdown signal arrives
///
/// # Errors
///
/// Returns an error if the address is invalid, the port cannot be bound, or
/// the server fails
pub async fn serve(resources: Arc<ServerResources>) -> Result<()> {
    let config = resources.config.clone();
    let addr: SocketAddr = format!("{}:{}", config.host, config.http_port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.http_port))?;

    let app = build_router(&resources);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "FitAI server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("FitAI server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received ctrl-c, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_mount_from_path() {
        let config = ServerConfig::default();
        assert_eq!(local_upload_mount(&config).as_deref(), Some("/uploads"));
    }

    #[test]
    fn test_upload_mount_from_absolute_url() {
        let mut config = ServerConfig::default();
        config.storage.public_base_url = "http://localhost:8000/files/".to_owned();
        assert_eq!(local_upload_mount(&config).as_deref(), Some("/files"));
    }

    #[test]
    fn test_no_mount_for_supabase() {
        let mut config = ServerConfig::default();
        config.storage.backend = StorageBackend::Supabase;
        assert_eq!(local_upload_mount(&config), None);
    }
}
