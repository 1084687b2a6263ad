use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{Comment, CommentResponse, CreateCommentRequest, NewComment},
    store::{CommentStore, PostStore},
};

pub async fn create_comment(
    posts: &dyn PostStore,
    comments: &dyn CommentStore,
    post_id: i64,
    user_id: Uuid,
    payload: CreateCommentRequest,
) -> Result<Comment> {
    if payload.comment.trim().is_empty() {
        return Err(AppError::BadRequest("Comment must not be blank".to_string()));
    }

    if !posts.post_exists(post_id).await? {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    comments
        .create_comment(NewComment {
            post_id,
            user_id,
            comment: payload.comment,
        })
        .await
}

pub async fn get_comments(
    posts: &dyn PostStore,
    comments: &dyn CommentStore,
    post_id: i64,
) -> Result<Vec<CommentResponse>> {
    if !posts.post_exists(post_id).await? {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    comments.list_comments(post_id).await
}

pub async fn delete_comment(
    comments: &dyn CommentStore,
    comment_id: i64,
    user_id: Uuid,
) -> Result<()> {
    let comment = comments
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    if comment.user_id != user_id {
        return Err(AppError::Authorization(
            "Can only delete your own comments".to_string(),
        ));
    }

    comments.delete_comment(comment_id).await?;

    Ok(())
}
