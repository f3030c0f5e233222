use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{
        app_state::AppState,
        dto::{chat_dto::*, persona_dto::OwnerQuery},
    },
    error::AppError,
};

pub async fn respond(
    State(state): State<AppState>,
    Json(request): Json<RespondRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!(
        "Chat turn: user={}, persona={}",
        request.user_id, request.persona_id
    );

    let turn = state
        .chat_service
        .respond(&request.user_id, &request.persona_id, &request.user_input)
        .await?;

    Ok(Json(RespondResponse { reply: turn.reply }))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(persona_id): Path<String>,
    Query(owner): Query<OwnerQuery>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Getting messages for persona {}", persona_id);

    let messages: Vec<MessageResponse> = state
        .chat_service
        .messages(&persona_id, &owner.user_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(messages))
}

pub async fn get_full_history(
    State(state): State<AppState>,
    Path(persona_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Getting full history for persona {}", persona_id);

    let messages: Vec<MessageResponse> = state
        .chat_service
        .full_history(&persona_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(messages))
}
