pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws    WebSocket upgrade (token-authenticated)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws::ws_handler))
}

/// Assemble the full application router (health at root, API under
/// `/api/v1`) without the binary's middleware stack. Integration tests
/// serve this directly.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/v1", api_routes())
        .with_state(state)
}
