use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::Result,
    models::{PostFilter, PostResponse, UpdateUserRequest, UserResponse},
    services::{post_service, user_service},
};

pub async fn get_current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserResponse>> {
    let user = user_service::get_user_by_id(state.users.as_ref(), auth_user.user_id).await?;

    Ok(Json(user.into()))
}

pub async fn update_current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    let payload = payload.normalized();
    payload.validate()?;

    let user = user_service::update_user(
        state.users.as_ref(),
        &state.config,
        auth_user.user_id,
        payload,
    )
    .await?;

    Ok(Json(user.into()))
}

pub async fn get_user_posts(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
    Query(mut filter): Query<PostFilter>,
) -> Result<Json<Vec<PostResponse>>> {
    // Make sure the user exists so an unknown id is a 404, not an empty list
    user_service::get_user_by_id(state.users.as_ref(), user_id).await?;

    filter.user_id = Some(user_id);

    let posts = post_service::get_posts(
        state.posts.as_ref(),
        state.ledger.as_ref(),
        &filter,
        Some(auth_user.user_id),
    )
    .await?;

    Ok(Json(posts))
}
