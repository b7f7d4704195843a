//! HTTP + WebSocket surface.

pub mod rest;
pub mod ws;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::admission::Admission;
use crate::notify::Broadcaster;
use crate::queue::TaskQueue;
use crate::worker::Dispatcher;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub admission: Admission,
    pub queue: Arc<dyn TaskQueue>,
    pub broadcaster: Arc<Broadcaster>,
    pub dispatcher: Arc<Dispatcher>,
}

/// Build the Axum router with REST and WebSocket routes.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(rest::health))
        .route("/process", post(rest::submit))
        .route("/api/tasks/{id}", get(rest::get_task))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
