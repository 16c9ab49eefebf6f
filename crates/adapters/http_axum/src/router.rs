//! Axum router assembly.

use std::any::Any;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use huehub_app::ports::EventPublisher;

use crate::draining::reject_when_closing;
use crate::error::ErrorBody;
use crate::state::AppState;

/// Build the router of one hub.
///
/// Merges the v1 API at `/api`, the v2 resources under `/clip/v2/resource`,
/// the v2 event stream and the discovery descriptor. Requests are refused
/// with `503` once the hub is closing, panics are turned into `500`, and a
/// [`TraceLayer`] logs each request/response at the `DEBUG` level.
pub fn build<P>(state: AppState<P>) -> Router
where
    P: EventPublisher + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/description.xml", get(crate::descriptor::description::<P>))
        .merge(crate::v1::routes())
        .nest("/clip/v2/resource", crate::v2::routes())
        .route("/eventstream/clip/v2", get(crate::sse::stream::<P>))
        .layer(from_fn_with_state(state.hub.clone(), reject_when_closing))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "internal server error".to_string(),
        }),
    )
        .into_response()
}
