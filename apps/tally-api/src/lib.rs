//! # Tally API
//!
//! JSON over HTTP for the ledger engine. Callers identify themselves with
//! `X-Actor-Id` and `X-Actor-Role`; authentication happens upstream.

pub mod actor;
pub mod config;
pub mod error;
pub mod routes;

use axum::Router;
use tally_ledger::Engine;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        AppState { engine }
    }
}

/// The full application: routes plus request tracing and CORS.
pub fn app(state: AppState) -> Router {
    routes::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}
