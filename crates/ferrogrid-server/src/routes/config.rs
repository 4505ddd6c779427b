use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/config: the configuration the grid was started with.
///
/// Read-only: timing, drive and layout are fixed for the life of the process.
pub async fn get_config(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let json = serde_json::to_value(app.config.as_ref())?;
    Ok(Json(json))
}
