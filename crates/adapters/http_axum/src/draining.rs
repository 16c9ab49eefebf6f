//! Draining guard — refuse new requests while a hub is being torn down.

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use huehub_app::ports::HubRecord;

use crate::error::ErrorBody;

/// Answer `503` with `Connection: close` once the hub is flagged as closing.
pub async fn reject_when_closing(State(hub): State<HubRecord>, request: Request, next: Next) -> Response {
    if hub.is_closing() {
        tracing::debug!(hub = hub.index, uri = %request.uri(), "rejecting request on closing hub");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONNECTION, "close")],
            Json(ErrorBody {
                error: format!("hub {} is shutting down", hub.index),
            }),
        )
            .into_response();
    }
    next.run(request).await
}
