use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::Result,
    models::{CommentResponse, CreateCommentRequest},
    services::comment_service,
};

pub async fn create_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    payload.validate()?;

    let comment = comment_service::create_comment(
        state.posts.as_ref(),
        state.comments.as_ref(),
        post_id,
        auth_user.user_id,
        payload,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Comment created successfully",
            "comment": comment
        })),
    ))
}

pub async fn get_comments(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<CommentResponse>>> {
    let comments =
        comment_service::get_comments(state.posts.as_ref(), state.comments.as_ref(), post_id)
            .await?;

    Ok(Json(comments))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<i64>,
) -> Result<Json<Value>> {
    comment_service::delete_comment(state.comments.as_ref(), comment_id, auth_user.user_id)
        .await?;

    Ok(Json(json!({
        "message": "Comment deleted successfully"
    })))
}
