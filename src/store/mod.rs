//! Storage ports and their adapters.
//!
//! Services only see these traits, so the Postgres adapter and the in-memory
//! adapter are interchangeable behind an `Arc<dyn ...>`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        Comment, CommentResponse, NewComment, NewPost, NewUser, Post, PostFilter, PostRecord,
        User, Vote, VoteDirection, VoteRow, VoteTally,
    },
};

pub use memory::MemoryStore;
pub use postgres::{PgCommentStore, PgPostStore, PgUserStore, PgVoteLedger};

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(&self, post: NewPost) -> Result<Post>;

    async fn get_post_by_id(&self, post_id: i64) -> Result<Option<PostRecord>>;

    /// Newest first.
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<PostRecord>>;

    async fn post_exists(&self, post_id: i64) -> Result<bool>;

    /// Returns `false` when no post was deleted. Votes and comments go with it.
    async fn delete_post(&self, post_id: i64) -> Result<bool>;

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Current vote direction per (post, user). At most one row per pair.
#[async_trait]
pub trait VoteLedger: Send + Sync {
    /// Insert or overwrite the pair's row in one atomic storage operation and
    /// return the post's totals as seen by that write. Fails with `NotFound` if
    /// the post or the user does not exist at write time; nothing is written
    /// on any error.
    async fn upsert_vote(
        &self,
        post_id: i64,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> Result<VoteTally>;

    /// Idempotent; a missing row is not an error. Returns the post's totals
    /// without the pair's vote.
    async fn remove_vote(&self, post_id: i64, user_id: Uuid) -> Result<VoteTally>;

    async fn count_votes(&self, post_id: i64, direction: VoteDirection) -> Result<i64>;

    /// Fails with `InvariantViolation` if storage holds more than one row for the pair.
    async fn get_vote(&self, post_id: i64, user_id: Uuid) -> Result<Option<Vote>>;

    async fn list_votes(&self, post_id: i64) -> Result<Vec<Vote>>;

    async fn tally(&self, post_id: i64) -> Result<VoteTally> {
        Ok(VoteTally {
            up_vote: self.count_votes(post_id, VoteDirection::Up).await?,
            down_vote: self.count_votes(post_id, VoteDirection::Down).await?,
        })
    }
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create_comment(&self, comment: NewComment) -> Result<Comment>;

    async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>>;

    /// Oldest first.
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentResponse>>;

    async fn delete_comment(&self, comment_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn update_user(&self, user: &User) -> Result<User>;
}

/// Collapses the ledger rows read for one (post, user) pair.
///
/// More than one row, or a direction outside ±1, is a broken ledger and
/// surfaces as `InvariantViolation`.
pub fn vote_from_rows(
    mut rows: Vec<VoteRow>,
    post_id: i64,
    user_id: Uuid,
) -> Result<Option<Vote>> {
    if rows.len() > 1 {
        return Err(AppError::InvariantViolation(format!(
            "{} ledger rows for post {} and user {}",
            rows.len(),
            post_id,
            user_id
        )));
    }

    rows.pop()
        .map(Vote::try_from)
        .transpose()
        .map_err(AppError::InvariantViolation)
}
