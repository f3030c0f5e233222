use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::persona_dto::*},
    error::AppError,
};

pub async fn create_persona(
    State(state): State<AppState>,
    Json(request): Json<CreatePersonaRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!(
        "Creating persona '{}' for user {}",
        request.character_name, request.user_id
    );

    let persona = state.persona_service.create(request.into()).await?;
    Ok((StatusCode::CREATED, Json(PersonaResponse::from(persona))))
}

pub async fn list_personas(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Listing personas for user {}", user_id);

    let personas: Vec<PersonaListItem> = state
        .persona_service
        .list(&user_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(personas))
}

pub async fn delete_persona(
    State(state): State<AppState>,
    Path(persona_id): Path<String>,
    Query(owner): Query<OwnerQuery>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Deleting persona {} for user {}", persona_id, owner.user_id);

    let removed = state
        .persona_service
        .delete(&persona_id, &owner.user_id)
        .await?;

    Ok(Json(DeletePersonaResponse {
        msg: "Persona deleted".to_string(),
        id: persona_id,
        messages_removed: removed,
    }))
}
