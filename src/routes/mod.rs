// ABOUTME: Route module organization for the FitAI HTTP API
// ABOUTME: One router per domain, merged by the server into a single application
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route module for the FitAI server
//!
//! Each domain module exposes a `*Routes` type whose `routes` function
//! builds an `axum::Router` over the shared `ServerResources`. Handlers stay
//! thin and delegate to `crate::services` or the database managers.

/// AI prompt templates, prompt runs and job history
pub mod ai;
/// Registration and login
pub mod auth;
/// Coach chat threads and messages
pub mod chat;
/// Weekly check-ins and daily streak check-ins
pub mod checkins;
/// Coach marketplace profiles
pub mod coach;
/// Exercise catalogue
pub mod exercises;
/// Liveness and readiness probes
pub mod health;
/// Food search, meal logs and third-party food databases
pub mod nutrition;
/// First-run onboarding
pub mod onboarding;
/// Payment event records
pub mod payments;
/// Profiles, macro targets and user settings
pub mod profiles;
/// Progress photos and macro adherence
pub mod progress;
/// Meal photo scanning
pub mod scan;
/// Multipart photo form parsing shared by upload routes
pub mod uploads;
/// Workout templates, sessions, logs and history
pub mod workouts;

pub use ai::AiRoutes;
pub use auth::{AuthRoutes, AuthService};
pub use chat::ChatRoutes;
pub use checkins::CheckinRoutes;
pub use coach::CoachRoutes;
pub use exercises::ExerciseRoutes;
pub use health::HealthRoutes;
pub use nutrition::NutritionRoutes;
pub use onboarding::OnboardingRoutes;
pub use payments::PaymentRoutes;
pub use profiles::ProfileRoutes;
pub use progress::ProgressRoutes;
pub use scan::ScanRoutes;
pub use uploads::PhotoForm;
pub use workouts::WorkoutRoutes;
