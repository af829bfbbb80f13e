use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Room for the other form fields and percent-encoding overhead on top of
/// the payload limit. The exact payload size is checked by the service.
const FORM_OVERHEAD: usize = 64 * 1024;

/// Build the axum router with all wpaste endpoints.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .service
        .config()
        .max_payload_bytes
        .saturating_mul(3)
        .saturating_add(FORM_OVERHEAD);

    Router::new()
        .route("/", get(handler::help_handler).post(handler::create_handler))
        .route("/-/health", get(handler::health_handler))
        .route(
            "/:name",
            get(handler::read_handler)
                .put(handler::edit_handler)
                .delete(handler::remove_handler),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
