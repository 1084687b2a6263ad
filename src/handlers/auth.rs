use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    AppState,
    error::Result,
    models::{AuthResponse, LoginRequest, RegisterRequest, UserResponse},
    services::user_service,
};

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    // Validate input
    let payload = payload.normalized();
    payload.validate()?;

    let user = user_service::register(state.users.as_ref(), &state.config, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": UserResponse::from(user)
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    payload.validate()?;

    let response = user_service::login(state.users.as_ref(), &state.config, payload).await?;

    Ok(Json(response))
}
