//! REST route handlers
//!
//! One module per resource. Handlers validate, call storage or the
//! evaluation protocol, and serialize results; everything interesting
//! happens in `crate::eval`.

pub mod assets;
pub mod attributes;
pub mod logs;
pub mod measurements;
pub mod metrics;
pub mod serviceviews;
pub mod triggers;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/serviceviews", post(serviceviews::create))
        .route(
            "/serviceviews/:id",
            get(serviceviews::fetch).delete(serviceviews::remove),
        )
        .route("/assets", post(assets::create))
        .route("/assets/:id", get(assets::fetch).delete(assets::remove))
        .route("/attributes", post(attributes::create))
        .route(
            "/attributes/:id",
            get(attributes::fetch).delete(attributes::remove),
        )
        .route("/metrics", post(metrics::create))
        .route("/metrics/:id", get(metrics::fetch).delete(metrics::remove))
        .route("/measurements", post(measurements::create))
        .route(
            "/measurements/:id",
            get(measurements::fetch)
                .put(measurements::update)
                .delete(measurements::remove),
        )
        .route("/triggers", post(triggers::create))
        .route(
            "/triggers/:id",
            get(triggers::fetch).delete(triggers::remove),
        )
        .route("/logs/:id", get(logs::fetch))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
