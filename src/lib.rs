pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    store::{
        CommentStore, MemoryStore, PgCommentStore, PgPostStore, PgUserStore, PgVoteLedger,
        PostStore, UserStore, VoteLedger,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub ledger: Arc<dyn VoteLedger>,
    pub comments: Arc<dyn CommentStore>,
}

impl AppState {
    pub fn postgres(db: PgPool, config: Config) -> Self {
        Self {
            config: Arc::new(config),
            users: Arc::new(PgUserStore::new(db.clone())),
            posts: Arc::new(PgPostStore::new(db.clone())),
            ledger: Arc::new(PgVoteLedger::new(db.clone())),
            comments: Arc::new(PgCommentStore::new(db)),
        }
    }

    /// All four ports share one store, so cascades and existence checks see
    /// the same data.
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());

        Self {
            config: Arc::new(config),
            users: store.clone(),
            posts: store.clone(),
            ledger: store.clone(),
            comments: store,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health-check", get(handlers::health::health_check))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login));

    // Protected routes
    let protected_routes = Router::new()
        // User routes
        .route(
            "/api/users/me",
            get(handlers::users::get_current_user).put(handlers::users::update_current_user),
        )
        .route(
            "/api/users/{user_id}/posts",
            get(handlers::users::get_user_posts),
        )
        // Post routes
        .route(
            "/api/posts",
            post(handlers::posts::create_post).get(handlers::posts::get_posts),
        )
        .route(
            "/api/posts/{post_id}",
            get(handlers::posts::get_post).delete(handlers::posts::delete_post),
        )
        // Vote routes
        .route(
            "/api/posts/{post_id}/up-vote",
            post(handlers::posts::up_vote),
        )
        .route(
            "/api/posts/{post_id}/down-vote",
            post(handlers::posts::down_vote),
        )
        .route(
            "/api/posts/{post_id}/vote",
            delete(handlers::posts::remove_vote),
        )
        // Comment routes
        .route(
            "/api/posts/{post_id}/comments",
            post(handlers::comments::create_comment).get(handlers::comments::get_comments),
        )
        .route(
            "/api/comments/{comment_id}",
            delete(handlers::comments::delete_comment),
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
