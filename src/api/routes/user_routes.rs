//! User Routes

use axum::{Router, routing::post};

use crate::api::app_state::AppState;
use crate::api::handlers::user_handler::*;

/// 创建用户路由器
pub fn create_user_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}
