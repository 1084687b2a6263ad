use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        Comment, CommentResponse, NewComment, NewPost, NewUser, Post, PostFilter, PostRecord,
        User, Vote, VoteDirection, VoteRow, VoteTally,
    },
    store::{CommentStore, PostStore, UserStore, VoteLedger, vote_from_rows},
};

const POST_RECORD_COLUMNS: &str = r#"
    SELECT
        p.id, p.title, p.content, p.user_id, p.image,
        u.name AS user_name, u.photo AS user_photo,
        p.created_at, p.updated_at
    FROM posts p
    JOIN users u ON u.id = p.user_id
"#;

fn is_constraint_violation(error: &sqlx::Error, constraint: &str) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.constraint() == Some(constraint),
        _ => false,
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.is_unique_violation(),
        _ => false,
    }
}

// A missing post means it was deleted after the service checked it; a missing
// user means the token outlived its account.
fn map_vote_write_error(error: sqlx::Error) -> AppError {
    if is_constraint_violation(&error, "votes_post_id_fkey") {
        AppError::NotFound("Post not found".to_string())
    } else if is_constraint_violation(&error, "votes_user_id_fkey") {
        AppError::NotFound("User not found".to_string())
    } else {
        error.into()
    }
}

/// `ILIKE` pattern matching `keyword` literally anywhere in the text.
fn contains_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[derive(Clone)]
pub struct PgPostStore {
    db: PgPool,
}

impl PgPostStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (user_id, title, content, image, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(post.user_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.image)
        .fetch_one(&self.db)
        .await?;

        Ok(post)
    }

    async fn get_post_by_id(&self, post_id: i64) -> Result<Option<PostRecord>> {
        let query = format!("{} WHERE p.id = $1", POST_RECORD_COLUMNS);
        let post = sqlx::query_as::<_, PostRecord>(&query)
            .bind(post_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(post)
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<PostRecord>> {
        let mut query = format!("{} WHERE TRUE", POST_RECORD_COLUMNS);
        let mut param_count = 0;

        let keyword = filter
            .keyword
            .as_deref()
            .filter(|keyword| !keyword.is_empty())
            .map(contains_pattern);

        if keyword.is_some() {
            param_count += 1;
            query.push_str(&format!(
                r" AND p.content ILIKE ${} ESCAPE '\'",
                param_count
            ));
        }

        if filter.user_id.is_some() {
            param_count += 1;
            query.push_str(&format!(" AND p.user_id = ${}", param_count));
        }

        query.push_str(" ORDER BY p.created_at DESC, p.id DESC");

        let mut query_builder = sqlx::query_as::<_, PostRecord>(&query);

        if let Some(keyword) = keyword {
            query_builder = query_builder.bind(keyword);
        }

        if let Some(user_id) = filter.user_id {
            query_builder = query_builder.bind(user_id);
        }

        Ok(query_builder.fetch_all(&self.db).await?)
    }

    async fn post_exists(&self, post_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(&self.db)
            .await?;

        Ok(exists)
    }

    async fn delete_post(&self, post_id: i64) -> Result<bool> {
        // votes and comments are removed by ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgVoteLedger {
    db: PgPool,
}

impl PgVoteLedger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VoteLedger for PgVoteLedger {
    async fn upsert_vote(
        &self,
        post_id: i64,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> Result<VoteTally> {
        // Single statement: the primary key on (post_id, user_id) serialises
        // concurrent casts for the same pair, last writer wins. Totals come
        // from the same statement: other voters' rows from its snapshot, the
        // pair's row from RETURNING.
        sqlx::query_as::<_, VoteTally>(
            r#"
            WITH cast_vote AS (
                INSERT INTO votes (post_id, user_id, direction, created_at, updated_at)
                VALUES ($1, $2, $3, NOW(), NOW())
                ON CONFLICT (post_id, user_id)
                DO UPDATE SET direction = EXCLUDED.direction, updated_at = EXCLUDED.updated_at
                RETURNING direction
            ),
            ballots AS (
                SELECT direction FROM votes WHERE post_id = $1 AND user_id <> $2
                UNION ALL
                SELECT direction FROM cast_vote
            )
            SELECT
                COUNT(*) FILTER (WHERE direction = 1) AS up_vote,
                COUNT(*) FILTER (WHERE direction = -1) AS down_vote
            FROM ballots
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(direction.value())
        .fetch_one(&self.db)
        .await
        .map_err(map_vote_write_error)
    }

    async fn remove_vote(&self, post_id: i64, user_id: Uuid) -> Result<VoteTally> {
        let tally = sqlx::query_as::<_, VoteTally>(
            r#"
            WITH removed AS (
                DELETE FROM votes WHERE post_id = $1 AND user_id = $2
            )
            SELECT
                COUNT(*) FILTER (WHERE direction = 1) AS up_vote,
                COUNT(*) FILTER (WHERE direction = -1) AS down_vote
            FROM votes
            WHERE post_id = $1 AND user_id <> $2
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(tally)
    }

    async fn count_votes(&self, post_id: i64, direction: VoteDirection) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE post_id = $1 AND direction = $2")
                .bind(post_id)
                .bind(direction.value())
                .fetch_one(&self.db)
                .await?;

        Ok(count)
    }

    async fn get_vote(&self, post_id: i64, user_id: Uuid) -> Result<Option<Vote>> {
        let rows = sqlx::query_as::<_, VoteRow>(
            "SELECT * FROM votes WHERE post_id = $1 AND user_id = $2",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        vote_from_rows(rows, post_id, user_id)
    }

    async fn list_votes(&self, post_id: i64) -> Result<Vec<Vote>> {
        let rows = sqlx::query_as::<_, VoteRow>(
            "SELECT * FROM votes WHERE post_id = $1 ORDER BY created_at",
        )
        .bind(post_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| Vote::try_from(row).map_err(AppError::InvariantViolation))
            .collect()
    }

    async fn tally(&self, post_id: i64) -> Result<VoteTally> {
        let tally = sqlx::query_as::<_, VoteTally>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE direction = 1) AS up_vote,
                COUNT(*) FILTER (WHERE direction = -1) AS down_vote
            FROM votes
            WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .fetch_one(&self.db)
        .await?;

        Ok(tally)
    }
}

#[derive(Clone)]
pub struct PgCommentStore {
    db: PgPool,
}

impl PgCommentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let result = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, user_id, comment, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING *
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(&comment.comment)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(comment) => Ok(comment),
            Err(e) if is_constraint_violation(&e, "comments_post_id_fkey") => {
                Err(AppError::NotFound("Post not found".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(comment_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(comment)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentResponse>> {
        let comments = sqlx::query_as::<_, CommentResponse>(
            r#"
            SELECT
                c.id, c.post_id, c.user_id,
                u.name AS user_name, u.photo AS user_photo,
                c.comment, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.post_id = $1
            ORDER BY c.created_at, c.id
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.db)
        .await?;

        Ok(comments)
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => {
                Err(AppError::Conflict("Email already exists".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let result = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $1, email = $2, password_hash = $3, photo = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.photo)
        .bind(user.id)
        .fetch_optional(&self.db)
        .await;

        match result {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(AppError::NotFound("User not found".to_string())),
            Err(e) if is_unique_violation(&e) => {
                Err(AppError::Conflict("Email already exists".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("rust"), "%rust%");
        assert_eq!(contains_pattern("100%"), r"%100\%%");
        assert_eq!(contains_pattern("snake_case"), r"%snake\_case%");
        assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
    }
}
