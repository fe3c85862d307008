pub mod home;
pub mod media;
pub mod prompts;
pub mod users;
pub mod votes;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

// Room for the non-file multipart fields next to the largest allowed image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Full application router
pub fn app(state: AppState) -> Router {
    let body_limit = state.media.max_bytes() + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(home::index))
        .route("/health", get(home::health))
        .route("/media/{*path}", get(media::serve))
        .merge(prompts::router())
        .merge(users::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
