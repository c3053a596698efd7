//! End-to-end tests for the JSON API, driven through the full router.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use veridis::config::Config;
use veridis::db;
use veridis::routes;
use veridis::state::AppState;

struct TestApp {
    app: Router,
    _temp: TempDir,
}

fn test_app() -> TestApp {
    let temp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.auth.bcrypt_cost = 4;
    config.storage.max_upload_bytes = 1024;
    config.resolve_paths(temp.path());

    let pool = db::create_pool(&config.db_path()).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");

    TestApp {
        app: routes::app(AppState::new(pool, config)),
        _temp: temp,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn call(
        &self,
        method: Method,
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
        self.send(request).await
    }

    /// Register and log in; returns (token, user id).
    async fn sign_up(&self, username: &str) -> (String, String) {
        let email = format!("{}@example.com", username);
        let (status, _) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "username": username, "email": email, "password": "secret" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": "secret" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn create_post(&self, token: &str, content: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/posts",
                Some(token),
                Some(json!({ "content": content })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
        body
    }
}

#[tokio::test]
async fn health_probe_responds() {
    let app = test_app();
    let (status, body) = app.call(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Backend is running!");
}

#[tokio::test]
async fn new_post_is_neutral_for_everyone() {
    let app = test_app();
    let (token_a, user_a) = app.sign_up("alice").await;

    let created = app.create_post(&token_a, "  hello  ").await;
    assert_eq!(created["content"], "hello");
    assert_eq!(created["author"]["id"], user_a);
    assert_eq!(created["author"]["username"], "alice");
    assert_eq!(created["likeCount"], 0);
    assert_eq!(created["dislikeCount"], 0);
    assert_eq!(created["viewerReaction"], "neutral");

    let (status, feed) = app.call(Method::GET, "/api/posts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["id"], created["id"]);
    assert_eq!(feed[0]["viewerReaction"], "neutral");
}

#[tokio::test]
async fn like_is_personalized_per_viewer() {
    let app = test_app();
    let (token_a, _) = app.sign_up("alice").await;
    let (token_b, _) = app.sign_up("bob").await;

    let post = app.create_post(&token_a, "hello").await;
    let post_id = post["id"].as_str().unwrap();

    let (status, outcome) = app
        .call(
            Method::POST,
            &format!("/api/posts/{}/like", post_id),
            Some(&token_b),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["postId"], post_id);
    assert_eq!(outcome["viewerReaction"], "liked");
    assert_eq!(outcome["likeCount"], 1);
    assert_eq!(outcome["dislikeCount"], 0);

    let (_, feed_b) = app.call(Method::GET, "/api/posts", Some(&token_b), None).await;
    assert_eq!(feed_b[0]["viewerReaction"], "liked");
    assert_eq!(feed_b[0]["likeCount"], 1);

    let (_, feed_a) = app.call(Method::GET, "/api/posts", Some(&token_a), None).await;
    assert_eq!(feed_a[0]["viewerReaction"], "neutral");
    assert_eq!(feed_a[0]["likeCount"], 1);

    let (_, anonymous) = app.call(Method::GET, "/api/posts", None, None).await;
    assert_eq!(anonymous[0]["viewerReaction"], "neutral");
}

#[tokio::test]
async fn toggles_walk_the_state_machine() {
    let app = test_app();
    let (token_a, _) = app.sign_up("alice").await;
    let post = app.create_post(&token_a, "hello").await;
    let like = format!("/api/posts/{}/like", post["id"].as_str().unwrap());
    let dislike = format!("/api/posts/{}/dislike", post["id"].as_str().unwrap());

    let (_, first) = app.call(Method::POST, &like, Some(&token_a), None).await;
    assert_eq!(first["viewerReaction"], "liked");

    let (_, switched) = app.call(Method::POST, &dislike, Some(&token_a), None).await;
    assert_eq!(switched["viewerReaction"], "disliked");
    assert_eq!(switched["likeCount"], 0);
    assert_eq!(switched["dislikeCount"], 1);

    let (_, undone) = app.call(Method::POST, &dislike, Some(&token_a), None).await;
    assert_eq!(undone["viewerReaction"], "neutral");
    assert_eq!(undone["likeCount"], 0);
    assert_eq!(undone["dislikeCount"], 0);

    app.call(Method::POST, &like, Some(&token_a), None).await;
    let (_, twice) = app.call(Method::POST, &like, Some(&token_a), None).await;
    assert_eq!(twice["viewerReaction"], "neutral");
    assert_eq!(twice["likeCount"], 0);
}

#[tokio::test]
async fn reacting_requires_authentication() {
    let app = test_app();
    let (token_a, _) = app.sign_up("alice").await;
    let post = app.create_post(&token_a, "hello").await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/posts/{}/like", post["id"].as_str().unwrap()),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/posts/{}/like", post["id"].as_str().unwrap()),
            Some("not-a-real-token"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_post_or_user_is_not_found() {
    let app = test_app();
    let (token_a, _) = app.sign_up("alice").await;

    let (status, body) = app
        .call(Method::POST, "/api/posts/nope/dislike", Some(&token_a), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");

    let (status, body) = app
        .call(Method::GET, "/api/profile/nobody", Some(&token_a), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn blank_or_oversized_posts_are_rejected() {
    let app = test_app();
    let (token_a, _) = app.sign_up("alice").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/posts",
            Some(&token_a),
            Some(json!({ "content": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Post content cannot be empty");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/posts",
            Some(&token_a),
            Some(json!({ "content": "x".repeat(2001) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, feed) = app.call(Method::GET, "/api/posts", None, None).await;
    assert!(feed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn only_the_author_can_delete() {
    let app = test_app();
    let (token_a, _) = app.sign_up("alice").await;
    let (token_b, _) = app.sign_up("bob").await;
    let post = app.create_post(&token_a, "hello").await;
    let uri = format!("/api/posts/{}", post["id"].as_str().unwrap());

    app.call(Method::POST, &format!("{}/like", uri), Some(&token_b), None)
        .await;

    let (status, _) = app.call(Method::DELETE, &uri, Some(&token_b), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, feed) = app.call(Method::GET, "/api/posts", Some(&token_b), None).await;
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["likeCount"], 1);

    let (status, body) = app.call(Method::DELETE, &uri, Some(&token_a), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Post deleted successfully");

    let (_, feed) = app.call(Method::GET, "/api/posts", Some(&token_b), None).await;
    assert!(feed.as_array().unwrap().is_empty());

    let (status, _) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(Method::DELETE, &uri, Some(&token_a), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn author_feeds_are_scoped() {
    let app = test_app();
    let (token_a, user_a) = app.sign_up("alice").await;
    let (token_b, _) = app.sign_up("bob").await;

    app.create_post(&token_a, "first").await;
    app.create_post(&token_b, "from bob").await;
    app.create_post(&token_a, "second").await;

    let (status, mine) = app.call(Method::GET, "/api/my-posts", Some(&token_a), None).await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = mine
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["second", "first"]);

    let (status, by_alice) = app
        .call(
            Method::GET,
            &format!("/api/posts/user/{}", user_a),
            Some(&token_b),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_alice.as_array().unwrap().len(), 2);

    let (status, _) = app.call(Method::GET, "/api/my-posts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, global) = app.call(Method::GET, "/api/posts", None, None).await;
    assert_eq!(global.as_array().unwrap().len(), 3);
    assert_eq!(global[0]["content"], "second");
}

#[tokio::test]
async fn register_rejects_duplicates_and_missing_fields() {
    let app = test_app();
    app.sign_up("alice").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "alice2", "email": "alice@example.com", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already in use");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "alice", "email": "new@example.com", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already taken");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "carol", "email": "", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "dave", "email": "dave@example.com", "password": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password is required");

    // Nothing was created, so the same username and email still register
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "dave", "email": "dave@example.com", "password": " pw " })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // The password is kept as typed, surrounding spaces included
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "dave@example.com", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "dave@example.com", "password": " pw " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_me_and_logout() {
    let app = test_app();
    let (token, user_id) = app.sign_up("alice").await;
    assert_eq!(token.len(), 64);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, me) = app.call(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user_id);
    assert_eq!(me["email"], "alice@example.com");
    assert_eq!(me["avatarUrl"], Value::Null);

    let (status, _) = app.call(Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profiles_and_search() {
    let app = test_app();
    let (token_a, user_a) = app.sign_up("alice").await;
    let (token_b, _) = app.sign_up("bob").await;
    app.create_post(&token_a, "hello").await;

    let (status, own) = app
        .call(Method::GET, "/api/profile/alice", Some(&token_a), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own["id"], user_a);
    assert_eq!(own["email"], "alice@example.com");
    assert_eq!(own["posts"].as_array().unwrap().len(), 1);

    let (_, other) = app
        .call(Method::GET, "/api/profile/alice", Some(&token_b), None)
        .await;
    assert!(other.get("email").is_none());
    assert_eq!(other["posts"][0]["viewerReaction"], "neutral");

    let (status, _) = app
        .call(Method::GET, "/api/profile/nobody", Some(&token_b), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, results) = app
        .call(Method::GET, "/api/profile/search/LI", Some(&token_b), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results.as_array().unwrap().len(), 1);
    assert_eq!(results[0]["username"], "alice");

    let (_, short) = app
        .call(Method::GET, "/api/profile/search/a", Some(&token_b), None)
        .await;
    assert!(short.as_array().unwrap().is_empty());

    let (status, user) = app
        .call(Method::GET, &format!("/api/users/{}", user_a), Some(&token_b), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "alice");

    let (status, _) = app
        .call(Method::GET, &format!("/api/users/{}", user_a), None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

fn multipart_request(token: &str, field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    let boundary = "veridis-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"{n}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            b = boundary,
            f = field,
            n = file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/auth/upload-profile-picture")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn avatar_upload_replaces_and_serves_the_image() {
    let app = test_app();
    let (token, _) = app.sign_up("alice").await;

    let (status, first) = app
        .send(multipart_request(&token, "image", "me.png", b"first-image"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let first_url = first["imageUrl"].as_str().unwrap().to_string();
    assert!(first_url.starts_with("/uploads/"));
    assert!(first_url.ends_with(".png"));

    let response = app
        .app
        .clone()
        .oneshot(Request::get(&first_url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"first-image");

    let (status, second) = app
        .send(multipart_request(&token, "image", "me.gif", b"second"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, me) = app.call(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(me["avatarUrl"], second["imageUrl"]);

    // The replaced file is gone
    let (status, _) = app.call(Method::GET, &first_url, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn avatar_upload_rejects_bad_files() {
    let app = test_app();
    let (token, _) = app.sign_up("alice").await;

    let (status, body) = app
        .send(multipart_request(&token, "image", "notes.txt", b"text"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only image files are allowed!");

    let (status, body) = app
        .send(multipart_request(&token, "avatar", "me.png", b"data"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");

    let (status, _) = app
        .send(multipart_request(&token, "image", "big.png", &[7u8; 2048]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
