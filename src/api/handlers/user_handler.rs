use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::user_dto::*},
    error::AppError,
};

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Registering user: {}", request.username);

    let user = state
        .user_service
        .register(&request.username, &request.password)
        .await?;

    let response = RegisterResponse {
        msg: "User created".to_string(),
        username: user.username,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Login attempt: {}", request.username);

    let user = state
        .user_service
        .login(&request.username, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        msg: "Login successful".to_string(),
        user_id: user.id,
        username: user.username,
    }))
}
