use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{VoteDirection, VoteResponse, VoteState, VoteTally},
    store::{PostStore, VoteLedger},
};

pub async fn cast_up_vote(
    posts: &dyn PostStore,
    ledger: &dyn VoteLedger,
    post_id: i64,
    user_id: Uuid,
) -> Result<VoteResponse> {
    cast_vote(posts, ledger, post_id, user_id, VoteDirection::Up).await
}

pub async fn cast_down_vote(
    posts: &dyn PostStore,
    ledger: &dyn VoteLedger,
    post_id: i64,
    user_id: Uuid,
) -> Result<VoteResponse> {
    cast_vote(posts, ledger, post_id, user_id, VoteDirection::Down).await
}

/// Records `direction` as the user's current vote on the post.
///
/// Insert-versus-update is decided by the ledger in a single upsert, so
/// repeating a call is harmless and concurrent casts for the same pair leave
/// one row. The response is built from what the upsert returned; nothing is
/// read after the write, so an error always means nothing was written. Not
/// retried here.
pub async fn cast_vote(
    posts: &dyn PostStore,
    ledger: &dyn VoteLedger,
    post_id: i64,
    user_id: Uuid,
    direction: VoteDirection,
) -> Result<VoteResponse> {
    ensure_post_exists(posts, post_id).await?;

    // The ledger re-checks the post at write time (FK or lock), closing the
    // gap with a concurrent delete.
    let tally = ledger.upsert_vote(post_id, user_id, direction).await?;

    tracing::debug!(post_id, %user_id, ?direction, "vote cast");

    Ok(vote_response(post_id, Some(direction), tally))
}

/// Returns the pair to `NoVote`. Removing an absent vote is not an error.
pub async fn remove_vote(
    posts: &dyn PostStore,
    ledger: &dyn VoteLedger,
    post_id: i64,
    user_id: Uuid,
) -> Result<VoteResponse> {
    ensure_post_exists(posts, post_id).await?;

    let tally = ledger.remove_vote(post_id, user_id).await?;
    tracing::debug!(post_id, %user_id, "vote removed");

    Ok(vote_response(post_id, None, tally))
}

pub async fn get_vote_state(
    ledger: &dyn VoteLedger,
    post_id: i64,
    user_id: Uuid,
) -> Result<VoteState> {
    let vote = ledger.get_vote(post_id, user_id).await?;
    Ok(VoteState::from_direction(vote.map(|vote| vote.direction)))
}

async fn ensure_post_exists(posts: &dyn PostStore, post_id: i64) -> Result<()> {
    if !posts.post_exists(post_id).await? {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    Ok(())
}

fn vote_response(
    post_id: i64,
    user_vote: Option<VoteDirection>,
    tally: VoteTally,
) -> VoteResponse {
    VoteResponse {
        post_id,
        user_vote,
        up_vote: tally.up_vote,
        down_vote: tally.down_vote,
    }
}
