//! Chat Routes

use axum::{
    Router,
    routing::{get, post},
};

use crate::api::app_state::AppState;
use crate::api::handlers::chat_handler::*;

/// 创建对话路由器
pub fn create_chat_router() -> Router<AppState> {
    Router::new()
        .route("/agent/respond", post(respond))
        .route("/messages/full/:persona_id", get(get_full_history))
        .route("/messages/:persona_id", get(get_messages))
}
