// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Depth cap for comment threads on mobile clients.
pub const DEFAULT_MOBILE_DEPTH: i64 = 3;
/// Depth cap for comment threads everywhere else.
pub const DEFAULT_DESKTOP_DEPTH: i64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub mobile_comment_depth: i64,
    pub desktop_comment_depth: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://club-board.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            mobile_comment_depth: depth_from_env("COMMENT_DEPTH_MOBILE", DEFAULT_MOBILE_DEPTH),
            desktop_comment_depth: depth_from_env("COMMENT_DEPTH_DESKTOP", DEFAULT_DESKTOP_DEPTH),
        }
    }

    /// How many levels below the window start a thread read returns.
    pub fn comment_depth(&self, is_mobile: bool) -> i64 {
        if is_mobile {
            self.mobile_comment_depth
        } else {
            self.desktop_comment_depth
        }
    }
}

fn depth_from_env(key: &str, default: i64) -> i64 {
    match env::var(key) {
        Ok(raw) => match raw.parse::<i64>() {
            Ok(depth) if depth >= 0 => depth,
            _ => {
                tracing::warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
