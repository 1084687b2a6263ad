//! HTTP-level tests: the full router over in-memory stores.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use socialize::config::Config;
use socialize::{AppState, create_app};
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "test-secret".to_string(),
        jwt_expiration_hours: 1,
        bcrypt_cost: 4,
        host: "127.0.0.1".to_string(),
        port: 0,
        allowed_origins: vec!["http://localhost:3000".to_string()],
    }
}

fn test_app() -> Router {
    create_app(AppState::in_memory(test_config()))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

/// Registers and logs in; returns the bearer token.
async fn sign_up(app: &Router, name: &str) -> String {
    let email = format!("{}@example.com", name);
    let (status, _) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": name,
            "email": email,
            "password": "password123",
            "confirm_password": "password123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    body["token"].as_str().expect("token in body").to_string()
}

async fn create_post(app: &Router, token: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/posts",
        Some(token),
        Some(json!({ "title": "Hello", "content": "First post" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    body["post"]["id"].as_i64().expect("post id")
}

#[tokio::test]
async fn health_check_is_public() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/health-check", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = test_app();

    let (status, body) = send(&app, "POST", "/api/posts/1/up-vote", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let (status, _) = send(&app, "GET", "/api/posts", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_invalid_payloads() {
    let app = test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "alice",
            "email": "alice@example.com",
            "password": "password123",
            "confirm_password": "password124"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    sign_up(&app, "alice").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "alice again",
            "email": "alice@example.com",
            "password": "password123",
            "confirm_password": "password123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = test_app();
    sign_up(&app, "alice").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn voting_scenario_over_http() {
    let app = test_app();
    let author = sign_up(&app, "author").await;
    let user_a = sign_up(&app, "user_a").await;
    let user_b = sign_up(&app, "user_b").await;
    let post_id = create_post(&app, &author).await;
    let post_uri = format!("/api/posts/{}", post_id);

    let (status, body) = send(&app, "GET", &post_uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!((body["up_vote"].as_i64(), body["down_vote"].as_i64()), (Some(0), Some(0)));

    let (status, body) = send(
        &app,
        "POST",
        &format!("{}/up-vote", post_uri),
        Some(&user_a),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_vote"], "up");
    assert_eq!((body["up_vote"].as_i64(), body["down_vote"].as_i64()), (Some(1), Some(0)));

    send(
        &app,
        "POST",
        &format!("{}/down-vote", post_uri),
        Some(&user_b),
        None,
    )
    .await;
    let (_, body) = send(&app, "GET", &post_uri, Some(&author), None).await;
    assert_eq!((body["up_vote"].as_i64(), body["down_vote"].as_i64()), (Some(1), Some(1)));

    send(
        &app,
        "POST",
        &format!("{}/down-vote", post_uri),
        Some(&user_a),
        None,
    )
    .await;
    let (_, body) = send(&app, "GET", &post_uri, Some(&user_a), None).await;
    assert_eq!((body["up_vote"].as_i64(), body["down_vote"].as_i64()), (Some(0), Some(2)));
    assert_eq!(body["user_vote"], "down");

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("{}/vote", post_uri),
        Some(&user_a),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_vote"], Value::Null);
    assert_eq!(body["down_vote"].as_i64(), Some(1));
}

#[tokio::test]
async fn voting_on_missing_post_is_404() {
    let app = test_app();
    let token = sign_up(&app, "alice").await;

    let (status, body) = send(&app, "POST", "/api/posts/777/up-vote", Some(&token), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");
}

#[tokio::test]
async fn post_detail_includes_comments() {
    let app = test_app();
    let token = sign_up(&app, "alice").await;
    let post_id = create_post(&app, &token).await;

    for text in ["first!", "second"] {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/posts/{}/comments", post_id),
            Some(&token),
            Some(json!({ "comment": text })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, "GET", &format!("/api/posts/{}", post_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_comment"].as_i64(), Some(2));
    assert_eq!(body["comments"][0]["comment"], "first!");
    assert_eq!(body["comments"][0]["user_name"], "alice");
    assert_eq!(body["user_name"], "alice");
}

#[tokio::test]
async fn only_the_author_can_delete_a_post() {
    let app = test_app();
    let author = sign_up(&app, "author").await;
    let other = sign_up(&app, "other").await;
    let post_id = create_post(&app, &author).await;
    let post_uri = format!("/api/posts/{}", post_id);

    send(&app, "POST", &format!("{}/up-vote", post_uri), Some(&other), None).await;

    let (status, _) = send(&app, "DELETE", &post_uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &post_uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &post_uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", &format!("{}/up-vote", post_uri), Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_posts_filters_by_keyword_and_author() {
    let app = test_app();
    let alice = sign_up(&app, "alice").await;
    let bob = sign_up(&app, "bob").await;

    send(
        &app,
        "POST",
        "/api/posts",
        Some(&alice),
        Some(json!({ "title": "Rust", "content": "ownership and borrowing" })),
    )
    .await;
    send(
        &app,
        "POST",
        "/api/posts",
        Some(&bob),
        Some(json!({ "title": "Go", "content": "goroutines" })),
    )
    .await;

    let (status, body) = send(&app, "GET", "/api/posts", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (_, body) = send(&app, "GET", "/api/posts?keyword=borrow", Some(&alice), None).await;
    let posts = body.as_array().expect("array");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], "Rust");

    let (_, me) = send(&app, "GET", "/api/users/me", Some(&bob), None).await;
    let bob_id = me["id"].as_str().expect("user id").to_string();
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/users/{}/posts", bob_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let posts = body.as_array().expect("array");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], "Go");
}

#[tokio::test]
async fn create_post_requires_title_and_content() {
    let app = test_app();
    let token = sign_up(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/posts",
        Some(&token),
        Some(json!({ "title": "", "content": "body" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn update_current_user_changes_name() {
    let app = test_app();
    let token = sign_up(&app, "alice").await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/users/me",
        Some(&token),
        Some(json!({ "name": "Alice Liddell" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alice Liddell");
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn only_the_author_can_delete_a_comment() {
    let app = test_app();
    let alice = sign_up(&app, "alice").await;
    let bob = sign_up(&app, "bob").await;
    let post_id = create_post(&app, &alice).await;

    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/posts/{}/comments", post_id),
        Some(&alice),
        Some(json!({ "comment": "mine" })),
    )
    .await;
    let comment_id = body["comment"]["id"].as_i64().expect("comment id");
    let comment_uri = format!("/api/comments/{}", comment_id);

    let (status, _) = send(&app, "DELETE", &comment_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &comment_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &comment_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_names_are_rejected_after_trimming() {
    let app = test_app();
    let token = sign_up(&app, "alice").await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/me",
        Some(&token),
        Some(json!({ "name": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, me) = send(&app, "GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(me["name"], "alice");

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "  ",
            "email": "blank@example.com",
            "password": "password123",
            "confirm_password": "password123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
