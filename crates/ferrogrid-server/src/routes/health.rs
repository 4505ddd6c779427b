use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /api/health: controller liveness and start time.
pub async fn get_health(State(app): State<AppState>) -> Json<serde_json::Value> {
    let fault = app.controller.halt_reason();
    Json(serde_json::json!({
        "status": if fault.is_some() { "halted" } else { "ok" },
        "fault": fault,
        "started_at": app.started_at,
        "actuators": app.config.layout.count(),
    }))
}
