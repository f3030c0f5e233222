//! Persona Routes
//!
//! 角色的创建、列表与删除。

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::api::app_state::AppState;
use crate::api::handlers::persona_handler::*;

/// 创建角色路由器
pub fn create_persona_router() -> Router<AppState> {
    Router::new()
        .route("/personas", post(create_persona))
        .route("/personas/list/:user_id", get(list_personas))
        .route("/personas/:persona_id", delete(delete_persona))
}
