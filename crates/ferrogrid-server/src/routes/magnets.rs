use axum::extract::{Path, State};
use axum::Json;
use ferrogrid_core::actuator::ActuatorSnapshot;
use ferrogrid_core::command::Command;
use ferrogrid_core::grid::GridSnapshot;
use ferrogrid_core::FerroError;

use crate::controller::Applied;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/magnets: latest published snapshot of every actuator.
pub async fn list_magnets(State(app): State<AppState>) -> Json<GridSnapshot> {
    Json(app.controller.snapshot())
}

/// GET /api/magnets/{index}: one actuator by 1-based index.
pub async fn get_magnet(
    State(app): State<AppState>,
    Path(index): Path<String>,
) -> Result<Json<ActuatorSnapshot>, AppError> {
    let command = Command::parse(&index)?;
    let snapshot = app.controller.snapshot();
    let actuator = snapshot
        .get(command.target_index)
        .cloned()
        .ok_or(FerroError::Addressing {
            index: command.target_index,
            count: snapshot.actuators.len(),
        })?;
    Ok(Json(actuator))
}

/// POST /api/magnets/{index}/toggle: toggle one actuator and turn the rest off.
pub async fn toggle_magnet(
    State(app): State<AppState>,
    Path(index): Path<String>,
) -> Result<Json<Applied>, AppError> {
    let command = Command::parse(&index)?;
    let applied = app.controller.commands.submit(command).await?;
    Ok(Json(applied))
}
