//! HTTP API Layer
//!
//! REST surface of the leave engine using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one module per area (leave, roster/flex, months, grants, views)
//! - **Middleware**: JWT authentication and audit logging
//! - **DTOs**: request/response bodies; the domain types never cross the wire
//! - **Error Handling**: `LeaveError` kinds map onto HTTP status codes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(service, store, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::HealthCheckable;
use domain_leave::LeaveService;

use crate::config::ApiConfig;
use crate::handlers::{grants, health, leave, months, roster, views};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LeaveService>,
    /// Store checked by the readiness endpoint
    pub health: Arc<dyn HealthCheckable>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(service: Arc<LeaveService>, health: Arc<dyn HealthCheckable>, config: ApiConfig) -> Self {
        Self { service, health, config }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let leave_routes = Router::new()
        .route("/", post(leave::submit_leave))
        .route("/pending", get(leave::pending_queue))
        .route("/:id", delete(leave::cancel_leave))
        .route("/:id/approve", post(leave::approve_leave))
        .route("/:id/reject", post(leave::reject_leave));

    let month_routes = Router::new()
        .route("/:department/:year/:month", get(months::month_status))
        .route("/:department/:year/:month/confirm", post(months::confirm_month))
        .route("/:department/:year/:month/unlock", post(months::unlock_month))
        .route("/:department/:year/:month/export", get(months::export_month));

    let employee_routes = Router::new()
        .route("/:id/summary", get(views::balance_summary))
        .route("/:id/reconcile", post(views::reconcile_balances));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/leave", leave_routes)
        .nest("/months", month_routes)
        .nest("/employees", employee_routes)
        .route("/roster", post(roster::assign_roster))
        .route("/flex", post(roster::adjust_flex))
        .route("/grants", post(grants::grant_supplemental).get(grants::grant_history))
        .route("/calendar", get(views::calendar))
        .route("/departments", get(views::departments))
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
