//! Vehicle service shop backend.
//!
//! Tracks customer vehicles, the service requests raised against them, and
//! the invoices and line items produced when the work is billed. Exposes a
//! REST surface under `/api/v1` plus `/auth` for registration and login.

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{extract::State, routing::get, Extension, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::events::EventSender;

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: Arc<EventSender>,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DbPool>,
        config: config::AppConfig,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(auth::AuthConfig::new(
            config.jwt_secret.clone(),
            config.jwt_expiration,
        )));
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), auth.clone());
        Self {
            db,
            config,
            event_sender,
            auth,
            services,
        }
    }
}

/// The versioned API surface.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", handlers::users::routes())
        .nest("/vehicles", handlers::vehicles::routes())
        .nest("/service-requests", handlers::service_requests::routes())
        .nest("/invoices", handlers::invoices::routes())
        .nest("/service-items", handlers::service_items::routes())
        .route("/status", get(api_status))
        .route("/health", get(health_check))
}

/// Builds the full application router over the given state.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/auth", handlers::auth::routes())
        .nest("/api/v1", api_v1_routes())
        .layer(Extension(state.auth.clone()))
        .with_state(state)
}

async fn api_status() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(json!({
        "status": if db_status == "healthy" { "ok" } else { "degraded" },
        "database": db_status,
    }))
}
