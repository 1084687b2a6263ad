use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::Result,
    models::{CreatePostRequest, PostDetailResponse, PostFilter, PostResponse, VoteResponse},
    services::{post_service, vote_service},
};

pub async fn create_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    // Validate input
    payload.validate()?;

    let post = post_service::create_post(state.posts.as_ref(), auth_user.user_id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Post created successfully",
            "post": post
        })),
    ))
}

pub async fn get_posts(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filter): Query<PostFilter>,
) -> Result<Json<Vec<PostResponse>>> {
    let posts = post_service::get_posts(
        state.posts.as_ref(),
        state.ledger.as_ref(),
        &filter,
        Some(auth_user.user_id),
    )
    .await?;

    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<PostDetailResponse>> {
    let post = post_service::get_post_detail(
        state.posts.as_ref(),
        state.ledger.as_ref(),
        state.comments.as_ref(),
        post_id,
        Some(auth_user.user_id),
    )
    .await?;

    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<Value>> {
    post_service::delete_post(state.posts.as_ref(), post_id, auth_user.user_id).await?;

    Ok(Json(json!({
        "message": "Post deleted successfully"
    })))
}

pub async fn up_vote(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<VoteResponse>> {
    let response = vote_service::cast_up_vote(
        state.posts.as_ref(),
        state.ledger.as_ref(),
        post_id,
        auth_user.user_id,
    )
    .await?;

    Ok(Json(response))
}

pub async fn down_vote(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<VoteResponse>> {
    let response = vote_service::cast_down_vote(
        state.posts.as_ref(),
        state.ledger.as_ref(),
        post_id,
        auth_user.user_id,
    )
    .await?;

    Ok(Json(response))
}

pub async fn remove_vote(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<VoteResponse>> {
    let response = vote_service::remove_vote(
        state.posts.as_ref(),
        state.ledger.as_ref(),
        post_id,
        auth_user.user_id,
    )
    .await?;

    Ok(Json(response))
}
