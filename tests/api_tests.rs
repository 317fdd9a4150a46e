// tests/api_tests.rs

mod common;

use club_board::{routes, state::AppState};
use common::{TestApp, test_config, test_pool, text_doc};
use serde_json::json;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let state = AppState {
        pool: test_pool().await,
        config: test_config(),
    };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn writing_a_comment_requires_a_token() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(format!("{}/api/posts/1/comments", address))
        .json(&json!({ "content": text_doc("hello") }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["errors"].is_string());
}

#[tokio::test]
async fn forged_token_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let forged = club_board::utils::jwt::sign_jwt(1, "admin", "not-the-secret", 600).unwrap();

    let response = client
        .delete(format!("{}/api/comments/1", address))
        .bearer_auth(forged)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn malformed_post_id_is_a_bad_request() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/api/posts/not-a-number/comments", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_post_is_not_found() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/posts/424242/comments", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn rejects_bad_input_before_writing() {
    let app = TestApp::new().await;
    let member = app.member("user").await;
    let post_id = app.create_post(&member).await;
    let uri = format!("/api/posts/{}/comments", post_id);

    // Empty document
    let (status, body) = app
        .send(
            "POST",
            &uri,
            Some(&member.token),
            None,
            Some(json!({ "content": { "type": "doc", "content": [] } })),
        )
        .await;
    assert_eq!(status.as_u16(), 400);
    assert_eq!(body["success"], false);

    // Not JSON at all
    let (status, _) = app
        .send("POST", &uri, Some(&member.token), None, Some(json!("just a string")))
        .await;
    assert_eq!(status.as_u16(), 400);

    // Script-scheme image
    let (status, _) = app
        .send(
            "POST",
            &uri,
            Some(&member.token),
            None,
            Some(json!({ "content": {
                "type": "doc",
                "content": [{ "type": "image", "attrs": { "src": "javascript:alert(1)" } }]
            }})),
        )
        .await;
    assert_eq!(status.as_u16(), 400);

    // Malformed subtree path
    let (status, _) = app
        .send("GET", &format!("{}?path=a1..b2", uri), None, None, None)
        .await;
    assert_eq!(status.as_u16(), 400);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn posts_are_listed_newest_first_and_sanitized() {
    let app = TestApp::new().await;
    let member = app.member("user").await;

    for title in ["First", "Second"] {
        let (status, _) = app
            .send(
                "POST",
                "/api/posts",
                Some(&member.token),
                None,
                Some(json!({
                    "title": title,
                    "content": "<p>Training</p><script>alert(1)</script>"
                })),
            )
            .await;
        assert_eq!(status.as_u16(), 201);
    }

    let (status, posts) = app.send("GET", "/api/posts?limit=10", None, None, None).await;
    assert_eq!(status.as_u16(), 200);

    let titles: Vec<&str> = posts
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Second", "First"]);
    assert_eq!(posts[0]["content"], "<p>Training</p>");
}

#[tokio::test]
async fn post_delete_is_owner_only() {
    let app = TestApp::new().await;
    let owner = app.member("user").await;
    let other = app.member("user").await;
    let post_id = app.create_post(&owner).await;
    let uri = format!("/api/posts/{}", post_id);

    let (status, _) = app.send("DELETE", &uri, Some(&other.token), None, None).await;
    assert_eq!(status.as_u16(), 403);

    let (status, _) = app.send("DELETE", &uri, Some(&owner.token), None, None).await;
    assert_eq!(status.as_u16(), 204);

    let (status, _) = app.send("GET", &uri, None, None, None).await;
    assert_eq!(status.as_u16(), 404);
}

#[tokio::test]
async fn paging_does_not_skip_posts_sharing_a_timestamp() {
    // Arrange: three posts written in the same instant, one older
    let app = TestApp::new().await;
    let member = app.member("user").await;
    let instant = chrono::DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let older = instant - chrono::Duration::hours(1);

    let mut inserted = Vec::new();
    for (title, created_at) in [("a", instant), ("b", instant), ("c", instant), ("d", older)] {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts (user_id, title, content, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(member.id)
        .bind(title)
        .bind("<p>Kick-off</p>")
        .bind(created_at)
        .fetch_one(&app.pool)
        .await
        .unwrap();
        inserted.push(id);
    }

    // Act: walk the list two at a time
    let mut seen = Vec::new();
    let mut uri = "/api/posts?limit=2".to_string();
    for _ in 0..3 {
        let (status, page) = app.send("GET", &uri, None, None, None).await;
        assert_eq!(status.as_u16(), 200);
        let page = page.as_array().unwrap().clone();
        let Some(last) = page.last() else { break };
        seen.extend(page.iter().map(|p| p["id"].as_i64().unwrap()));
        uri = format!(
            "/api/posts?limit=2&cursor={}&cursor_id={}",
            last["created_at"].as_str().unwrap().replace("+00:00", "Z"),
            last["id"].as_i64().unwrap()
        );
    }

    // Assert: every post exactly once, newest first, ties by id
    assert_eq!(seen, vec![inserted[2], inserted[1], inserted[0], inserted[3]]);
}
