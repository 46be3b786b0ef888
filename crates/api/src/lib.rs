//! HTTP API server with observability for the gift exchange service.
//!
//! Provides REST endpoints for the group lifecycle, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{GroupRepository, GroupService, MemberDirectory, UuidIdentitySource};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::groups::{self, AppState};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R, D>(state: Arc<AppState<R, D>>, metrics_handle: PrometheusHandle) -> Router
where
    R: GroupRepository + 'static,
    D: MemberDirectory + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/groups",
            post(groups::create::<R, D>).get(groups::list::<R, D>),
        )
        .route("/groups/{id}", get(groups::get::<R, D>))
        .route("/groups/{id}/members", post(groups::add_member::<R, D>))
        .route(
            "/groups/{id}/members/{member_id}",
            axum::routing::delete(groups::remove_member::<R, D>),
        )
        .route("/groups/{id}/matches", post(groups::generate_matches::<R, D>))
        .route("/groups/{id}/matches/me", get(groups::my_match::<R, D>))
        .route("/groups/{id}/reopen", post(groups::reopen::<R, D>))
        .route("/groups/{id}/archive", post(groups::archive::<R, D>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around the given adapters.
pub fn create_state<R, D>(repository: R, directory: D) -> Arc<AppState<R, D>>
where
    R: GroupRepository,
    D: MemberDirectory,
{
    Arc::new(AppState {
        group_service: GroupService::new(repository, directory, UuidIdentitySource),
    })
}
