//! HTTP wiring: route table for the user-facing and worker-facing APIs.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;
pub mod worker_handlers;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/api/v1/register", post(handlers::register))
        .route("/api/v1/login", post(handlers::login))
        .route("/api/v1/calculate", post(handlers::calculate))
        .route("/api/v1/expressions", get(handlers::list_expressions))
        .route("/api/v1/expressions/{id}", get(handlers::get_expression));

    let worker_routes = Router::new()
        .route("/internal/task", get(worker_handlers::next_task))
        .route(
            "/internal/task/{id}",
            get(worker_handlers::get_task).post(worker_handlers::submit_result),
        );

    Router::new()
        .merge(user_routes)
        .merge(worker_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
