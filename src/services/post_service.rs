use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        CreatePostRequest, NewPost, Post, PostDetailResponse, PostFilter, PostRecord,
        PostResponse,
    },
    store::{CommentStore, PostStore, VoteLedger},
};

pub async fn create_post(
    posts: &dyn PostStore,
    user_id: Uuid,
    payload: CreatePostRequest,
) -> Result<Post> {
    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Title and content must not be blank".to_string(),
        ));
    }

    let post = posts
        .create_post(NewPost {
            user_id,
            title: payload.title,
            content: payload.content,
            image: payload.image.filter(|image| !image.is_empty()),
        })
        .await?;

    tracing::info!(post_id = post.id, %user_id, "post created");

    Ok(post)
}

/// Attaches ledger-derived `up_vote`/`down_vote` and the viewer's own vote.
/// Counts are read from the ledger on every call; nothing is cached on the post.
pub async fn aggregate_post(
    ledger: &dyn VoteLedger,
    record: PostRecord,
    viewer_id: Option<Uuid>,
) -> Result<PostResponse> {
    let tally = ledger.tally(record.id).await?;

    let user_vote = match viewer_id {
        Some(viewer_id) => ledger
            .get_vote(record.id, viewer_id)
            .await?
            .map(|vote| vote.direction),
        None => None,
    };

    Ok(PostResponse::new(record, tally, user_vote))
}

pub async fn get_post_by_id(
    posts: &dyn PostStore,
    ledger: &dyn VoteLedger,
    post_id: i64,
    viewer_id: Option<Uuid>,
) -> Result<Option<PostResponse>> {
    let Some(record) = posts.get_post_by_id(post_id).await? else {
        return Ok(None);
    };

    aggregate_post(ledger, record, viewer_id).await.map(Some)
}

pub async fn get_post_detail(
    posts: &dyn PostStore,
    ledger: &dyn VoteLedger,
    comments: &dyn CommentStore,
    post_id: i64,
    viewer_id: Option<Uuid>,
) -> Result<PostDetailResponse> {
    let post = get_post_by_id(posts, ledger, post_id, viewer_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let comments = comments.list_comments(post_id).await?;

    Ok(PostDetailResponse {
        post,
        total_comment: comments.len() as i64,
        comments,
    })
}

pub async fn get_posts(
    posts: &dyn PostStore,
    ledger: &dyn VoteLedger,
    filter: &PostFilter,
    viewer_id: Option<Uuid>,
) -> Result<Vec<PostResponse>> {
    let records = posts.list_posts(filter).await?;

    let mut responses = Vec::with_capacity(records.len());
    for record in records {
        responses.push(aggregate_post(ledger, record, viewer_id).await?);
    }

    Ok(responses)
}

/// Only the author may delete. Votes and comments are removed with the post.
pub async fn delete_post(posts: &dyn PostStore, post_id: i64, user_id: Uuid) -> Result<()> {
    let post = posts
        .get_post_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if post.user_id != user_id {
        return Err(AppError::Authorization(
            "Can only delete your own posts".to_string(),
        ));
    }

    if !posts.delete_post(post_id).await? {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    tracing::info!(post_id, %user_id, "post deleted");

    Ok(())
}
