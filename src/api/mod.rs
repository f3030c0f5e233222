//! API 模块
//!
//! 提供 REST API 支持。

pub mod app_state;
pub mod dto;
pub mod handlers;
pub mod routes;

use axum::{Router, middleware};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::app_state::AppState;
use crate::observability::metrics_middleware;
use crate::security::middleware::security_headers_middleware;

pub fn create_router(app_state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::user_routes::create_user_router())
        .merge(routes::persona_routes::create_persona_router())
        .merge(routes::chat_routes::create_chat_router());

    let metrics = app_state.metrics.clone();

    Router::new()
        .nest("/api/v1", api)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn_with_state(metrics, metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
