use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        Comment, CommentResponse, NewComment, NewPost, NewUser, Post, PostFilter, PostRecord,
        User, Vote, VoteDirection, VoteTally,
    },
    store::{CommentStore, PostStore, UserStore, VoteLedger},
};

const VOTE_SHARDS: usize = 16;

type Users = HashMap<Uuid, User>;
type VoteShard = HashMap<(i64, Uuid), Vote>;

#[derive(Default)]
struct PostTable {
    rows: BTreeMap<i64, Post>,
    next_id: i64,
}

#[derive(Default)]
struct CommentTable {
    rows: BTreeMap<i64, Comment>,
    next_id: i64,
}

fn post_record(users: &Users, post: &Post) -> PostRecord {
    let author = users.get(&post.user_id);

    PostRecord {
        id: post.id,
        title: post.title.clone(),
        content: post.content.clone(),
        user_id: post.user_id,
        image: post.image.clone(),
        user_name: author.map(|user| user.name.clone()).unwrap_or_default(),
        user_photo: author.and_then(|user| user.photo.clone()),
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

fn email_taken(users: &Users, email: &str, except: Option<Uuid>) -> bool {
    users
        .values()
        .any(|user| user.email == email && Some(user.id) != except)
}

fn shard_index(post_id: i64, user_id: Uuid) -> usize {
    let key = (post_id as u64) ^ (user_id.as_u128() as u64);
    (key % VOTE_SHARDS as u64) as usize
}

/// In-process implementation of every store port.
///
/// Every table has its own lock, and votes are spread over shards keyed by
/// (post, user) so casts for different pairs do not queue behind each other.
/// Locks are taken in the order users, posts, comments, vote shards
/// (ascending). A vote upsert holds the posts read lock across its write, so
/// a post delete (which takes the posts write lock before cascading) never
/// interleaves with it.
pub struct MemoryStore {
    users: RwLock<Users>,
    posts: RwLock<PostTable>,
    comments: RwLock<CommentTable>,
    votes: Vec<Mutex<VoteShard>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            users: RwLock::default(),
            posts: RwLock::default(),
            comments: RwLock::default(),
            votes: (0..VOTE_SHARDS).map(|_| Mutex::default()).collect(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn vote_shard(&self, post_id: i64, user_id: Uuid) -> &Mutex<VoteShard> {
        &self.votes[shard_index(post_id, user_id)]
    }

    // Shards are visited one at a time, so a concurrent cast on another
    // shard may or may not be included.
    async fn collect_votes(&self, post_id: i64) -> Vec<Vote> {
        let mut votes = Vec::new();
        for shard in &self.votes {
            let shard = shard.lock().await;
            votes.extend(
                shard
                    .values()
                    .filter(|vote| vote.post_id == post_id)
                    .cloned(),
            );
        }

        votes
    }

    async fn tally_votes(&self, post_id: i64) -> VoteTally {
        let mut tally = VoteTally::default();
        for vote in self.collect_votes(post_id).await {
            match vote.direction {
                VoteDirection::Up => tally.up_vote += 1,
                VoteDirection::Down => tally.down_vote += 1,
            }
        }

        tally
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn create_post(&self, post: NewPost) -> Result<Post> {
        if !self.users.read().await.contains_key(&post.user_id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let mut posts = self.posts.write().await;
        posts.next_id += 1;
        let now = Utc::now();
        let post = Post {
            id: posts.next_id,
            title: post.title,
            content: post.content,
            user_id: post.user_id,
            image: post.image,
            created_at: now,
            updated_at: now,
        };
        posts.rows.insert(post.id, post.clone());

        Ok(post)
    }

    async fn get_post_by_id(&self, post_id: i64) -> Result<Option<PostRecord>> {
        let users = self.users.read().await;
        let posts = self.posts.read().await;
        Ok(posts.rows.get(&post_id).map(|post| post_record(&users, post)))
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<PostRecord>> {
        let users = self.users.read().await;
        let posts = self.posts.read().await;
        // ids grow with creation time, so reverse id order is newest first
        Ok(posts
            .rows
            .values()
            .rev()
            .filter(|post| filter.matches(post))
            .map(|post| post_record(&users, post))
            .collect())
    }

    async fn post_exists(&self, post_id: i64) -> Result<bool> {
        Ok(self.posts.read().await.rows.contains_key(&post_id))
    }

    async fn delete_post(&self, post_id: i64) -> Result<bool> {
        let mut posts = self.posts.write().await;
        if posts.rows.remove(&post_id).is_none() {
            return Ok(false);
        }

        self.comments
            .write()
            .await
            .rows
            .retain(|_, comment| comment.post_id != post_id);
        for shard in &self.votes {
            shard
                .lock()
                .await
                .retain(|(vote_post_id, _), _| *vote_post_id != post_id);
        }

        Ok(true)
    }
}

#[async_trait]
impl VoteLedger for MemoryStore {
    async fn upsert_vote(
        &self,
        post_id: i64,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> Result<VoteTally> {
        // users are never deleted, so this check does not need to be held
        if !self.users.read().await.contains_key(&user_id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let posts = self.posts.read().await;
        if !posts.rows.contains_key(&post_id) {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let now = Utc::now();
        self.vote_shard(post_id, user_id)
            .lock()
            .await
            .entry((post_id, user_id))
            .and_modify(|vote| {
                vote.direction = direction;
                vote.updated_at = now;
            })
            .or_insert(Vote {
                post_id,
                user_id,
                direction,
                created_at: now,
                updated_at: now,
            });

        let tally = self.tally_votes(post_id).await;
        drop(posts);

        Ok(tally)
    }

    async fn remove_vote(&self, post_id: i64, user_id: Uuid) -> Result<VoteTally> {
        self.vote_shard(post_id, user_id)
            .lock()
            .await
            .remove(&(post_id, user_id));

        Ok(self.tally_votes(post_id).await)
    }

    async fn count_votes(&self, post_id: i64, direction: VoteDirection) -> Result<i64> {
        let tally = self.tally_votes(post_id).await;
        Ok(match direction {
            VoteDirection::Up => tally.up_vote,
            VoteDirection::Down => tally.down_vote,
        })
    }

    async fn get_vote(&self, post_id: i64, user_id: Uuid) -> Result<Option<Vote>> {
        let shard = self.vote_shard(post_id, user_id).lock().await;
        Ok(shard.get(&(post_id, user_id)).cloned())
    }

    async fn list_votes(&self, post_id: i64) -> Result<Vec<Vote>> {
        let mut votes = self.collect_votes(post_id).await;
        votes.sort_by_key(|vote| vote.created_at);

        Ok(votes)
    }

    async fn tally(&self, post_id: i64) -> Result<VoteTally> {
        Ok(self.tally_votes(post_id).await)
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let posts = self.posts.read().await;
        if !posts.rows.contains_key(&comment.post_id) {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let mut comments = self.comments.write().await;
        comments.next_id += 1;
        let comment = Comment {
            id: comments.next_id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            comment: comment.comment,
            created_at: Utc::now(),
        };
        comments.rows.insert(comment.id, comment.clone());

        Ok(comment)
    }

    async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>> {
        Ok(self.comments.read().await.rows.get(&comment_id).cloned())
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentResponse>> {
        let users = self.users.read().await;
        let comments = self.comments.read().await;
        Ok(comments
            .rows
            .values()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| {
                let author = users.get(&comment.user_id);
                CommentResponse {
                    id: comment.id,
                    post_id: comment.post_id,
                    user_id: comment.user_id,
                    user_name: author.map(|user| user.name.clone()).unwrap_or_default(),
                    user_photo: author.and_then(|user| user.photo.clone()),
                    comment: comment.comment.clone(),
                    created_at: comment.created_at,
                }
            })
            .collect())
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<bool> {
        let mut comments = self.comments.write().await;
        Ok(comments.rows.remove(&comment_id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        if email_taken(&users, &user.email, None) {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            photo: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let mut users = self.users.write().await;
        if email_taken(&users, &user.email, Some(user.id)) {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let stored = users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        *stored = User {
            updated_at: Utc::now(),
            ..user.clone()
        };

        Ok(stored.clone())
    }
}
