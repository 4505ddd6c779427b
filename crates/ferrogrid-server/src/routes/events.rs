use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt as _;

use crate::state::AppState;

/// GET /api/events: SSE stream that emits `update` with the full grid
/// snapshot on connect and whenever an actuator changes state.
pub async fn sse_events(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let stream = WatchStream::new(app.controller.snapshots.clone()).filter_map(|snapshot| {
        Event::default()
            .event("update")
            .json_data(&snapshot)
            .ok()
            .map(Ok::<Event, Infallible>)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
