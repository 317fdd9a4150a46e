// src/routes.rs

use axum::{
    Router,
    handler::Handler,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{comments, community, interaction},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Public reads: posts and comment threads.
/// * Writes sit behind the JWT middleware.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let post_routes = Router::new()
        .route(
            "/",
            get(community::list_posts).post(community::create_post.layer(auth.clone())),
        )
        .route(
            "/{id}",
            get(community::get_post).delete(community::delete_post.layer(auth.clone())),
        )
        .route(
            "/{id}/comments",
            get(comments::list_comments).post(comments::create_comment.layer(auth.clone())),
        );

    // Every comment route mutates, so the whole group is protected.
    let comment_routes = Router::new()
        .route(
            "/{id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/{id}/vote", post(interaction::vote_comment))
        .route_layer(auth);

    Router::new()
        .nest("/api/posts", post_routes)
        .nest("/api/comments", comment_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
