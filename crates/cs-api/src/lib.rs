//! # cs-api
//!
//! HTTP surface of a stage: the state the screen renders, moderator cues
//! and settings, and the submission moderation actions that drive the feed.

pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;

pub use error::ApiError;
pub use handlers::{AppState, StageView};

/// Builds the router for one hosted stage.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/stage", get(handlers::stage_view))
        .route("/stage/cues", post(handlers::apply_cue))
        .route("/stage/notices", post(handlers::report_notice))
        .route("/stage/emojis", post(handlers::push_emoji))
        .route("/stage/settings", put(handlers::update_settings))
        .route("/submissions", post(handlers::submit))
        .route("/submissions/{id}/approve", post(handlers::approve))
        .route("/submissions/{id}/retract", post(handlers::retract))
        .route("/submissions/{id}", delete(handlers::delete_submission))
        .layer(middleware::trace_layer())
        .layer(middleware::cors_policy())
        .with_state(state)
}
