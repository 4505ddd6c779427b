//! The two entry points the control page talks to: the legacy toggle
//! endpoint and the page itself.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use ferrogrid_core::command::{Command, ToggleParams};
use ferrogrid_core::FerroError;

use crate::controller::ControlError;
use crate::embed;
use crate::error::AppError;
use crate::state::AppState;

/// GET /magnet?num=N: toggle actuator N. A malformed request gets the page.
pub async fn legacy_toggle(
    State(app): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<ToggleParams>, QueryRejection>,
) -> Response {
    let command = params
        .map_err(|e| FerroError::Decode(e.body_text()))
        .and_then(|Query(params)| params.command());

    match command {
        Ok(command) => toggle(&app, command).await,
        Err(e) => {
            tracing::warn!("{e}; serving control page");
            embed::index_page(&headers, &app.config.server)
        }
    }
}

async fn toggle(app: &AppState, command: Command) -> Response {
    match app.controller.commands.submit(command).await {
        Ok(applied) => Html(format!("Enabling: {}", applied.applied)).into_response(),
        Err(ControlError::Rejected(FerroError::Addressing { index, .. })) => {
            (StatusCode::NOT_FOUND, Html(format!("Rejected: {index}"))).into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Fallback: embedded assets by path, the control page for everything else.
pub async fn page(State(app): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    embed::static_asset(uri.path(), &headers, &app.config.server)
}
