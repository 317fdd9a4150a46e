// tests/common/mod.rs

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use std::path::PathBuf;

use club_board::{config::Config, db, routes, state::AppState, utils::jwt::sign_jwt};
use serde_json::{Value, json};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test_secret_for_integration_tests";

pub const MOBILE_UA: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        mobile_comment_depth: 3,
        desktop_comment_depth: 5,
    }
}

/// In-memory database with migrations applied.
/// A single connection that never expires keeps the database alive.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

/// A database file under the temp dir, removed with its WAL files on drop.
pub struct TempDb {
    pub path: PathBuf,
}

impl TempDb {
    pub fn new() -> Self {
        let name = format!("club-board-test-{}.db", uuid::Uuid::new_v4());
        TempDb {
            path: std::env::temp_dir().join(name),
        }
    }

    /// File-backed pool with several connections, configured like production.
    pub async fn pool(&self, connections: u32) -> SqlitePool {
        let url = format!("sqlite://{}", self.path.display());
        let options = db::connect_options(&url).expect("Invalid database url");
        let pool = SqlitePoolOptions::new()
            .max_connections(connections)
            .connect_with(options)
            .await
            .expect("Failed to open database file");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to migrate database");

        pool
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

#[derive(Clone)]
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
}

pub struct Member {
    pub id: i64,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_pool(test_pool().await)
    }

    pub fn with_pool(pool: SqlitePool) -> Self {
        let state = AppState {
            pool: pool.clone(),
            config: test_config(),
        };
        TestApp {
            router: routes::create_router(state),
            pool,
        }
    }

    /// Inserts a member the way the identity service would and signs a token for them.
    pub async fn member(&self, role: &str) -> Member {
        let username = format!("m_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (username, role) VALUES (?, ?) RETURNING id",
        )
        .bind(&username)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .unwrap();

        Member {
            id,
            token: sign_jwt(id, role, TEST_SECRET, 600).unwrap(),
        }
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        user_agent: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(ua) = user_agent {
            builder = builder.header(header::USER_AGENT, ua);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn create_post(&self, member: &Member) -> i64 {
        let (status, body) = self
            .send(
                "POST",
                "/api/posts",
                Some(&member.token),
                None,
                Some(json!({ "title": "Sunday league", "content": "<p>Who is in?</p>" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    /// Creates a comment and returns the created row.
    pub async fn comment(
        &self,
        member: &Member,
        post_id: i64,
        parent_id: Option<i64>,
        text: &str,
    ) -> Value {
        let (status, body) = self
            .send(
                "POST",
                &format!("/api/posts/{}/comments", post_id),
                Some(&member.token),
                None,
                Some(json!({ "parentId": parent_id, "content": text_doc(text) })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["success"], true);
        body["comment"].clone()
    }

    pub async fn thread(
        &self,
        post_id: i64,
        path: Option<&str>,
        token: Option<&str>,
        user_agent: Option<&str>,
    ) -> Value {
        let uri = match path {
            Some(path) => format!("/api/posts/{}/comments?path={}", post_id, path),
            None => format!("/api/posts/{}/comments", post_id),
        };
        let (status, body) = self.send("GET", &uri, token, user_agent, None).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["success"], true);
        body
    }
}

pub fn text_doc(text: &str) -> Value {
    json!({
        "type": "doc",
        "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": text }] }]
    })
}

/// Ids of the given nodes, in order.
pub fn ids(nodes: &Value) -> Vec<i64> {
    nodes
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_i64().unwrap())
        .collect()
}

/// Total number of nodes in a forest.
pub fn count_nodes(nodes: &Value) -> usize {
    nodes
        .as_array()
        .unwrap()
        .iter()
        .map(|n| 1 + count_nodes(&n["children"]))
        .sum()
}

/// Greatest depth value found in a forest.
pub fn max_depth(nodes: &Value) -> i64 {
    nodes
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["depth"].as_i64().unwrap().max(max_depth(&n["children"])))
        .max()
        .unwrap_or(-1)
}
