use crate::controller::{Controller, ControllerHandle, RunningController};
use chrono::{DateTime, Utc};
use ferrogrid_core::config::Config;
use ferrogrid_core::grid::Grid;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state passed to all route handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub controller: ControllerHandle,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Spawn the grid controller and wrap its handle.
    ///
    /// Must be called inside a Tokio runtime. Keep the returned
    /// [`RunningController`] alive for as long as the server runs; dropping it
    /// powers the grid down.
    pub fn start(config: Config, grid: Grid) -> (Self, RunningController) {
        let tick_period = Duration::from_millis(config.timing.tick_period_ms);
        let (controller, running) = Controller::spawn(grid, tick_period);
        let state = Self {
            config: Arc::new(config),
            controller,
            started_at: Utc::now(),
        };
        (state, running)
    }

    /// Start with a simulated PWM backend for every actuator.
    pub fn start_simulated(config: Config) -> anyhow::Result<(Self, RunningController)> {
        let grid = Grid::simulated(&config)?;
        Ok(Self::start(config, grid))
    }
}
