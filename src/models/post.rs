use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::{CommentResponse, VoteDirection, VoteTally};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: Uuid,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post joined with its author, as read from the post store.
#[derive(Debug, Clone, FromRow)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: Uuid,
    pub image: Option<String>,
    pub user_name: String,
    pub user_photo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostFilter {
    pub keyword: Option<String>,
    #[serde(skip)]
    pub user_id: Option<Uuid>,
}

impl PostFilter {
    /// Keyword matches are case-insensitive substring matches on the post
    /// content; the keyword is taken literally.
    pub fn matches(&self, post: &Post) -> bool {
        let keyword_ok = match self.keyword.as_deref() {
            Some(keyword) if !keyword.is_empty() => post
                .content
                .to_lowercase()
                .contains(&keyword.to_lowercase()),
            _ => true,
        };
        let user_ok = self.user_id.is_none_or(|user_id| user_id == post.user_id);

        keyword_ok && user_ok
    }
}

// Create post request
#[derive(Debug, Validate, Deserialize)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 300, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[validate(url)]
    pub image: Option<String>,
}

// Post response with aggregated vote counts
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_photo: Option<String>,
    pub image: Option<String>,
    pub up_vote: i64,
    pub down_vote: i64,
    pub user_vote: Option<VoteDirection>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostResponse {
    pub fn new(record: PostRecord, tally: VoteTally, user_vote: Option<VoteDirection>) -> Self {
        Self {
            id: record.id,
            title: record.title,
            content: record.content,
            user_id: record.user_id,
            user_name: record.user_name,
            user_photo: record.user_photo,
            image: record.image,
            up_vote: tally.up_vote,
            down_vote: tally.down_vote,
            user_vote,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    #[serde(flatten)]
    pub post: PostResponse,
    pub total_comment: i64,
    pub comments: Vec<CommentResponse>,
}
