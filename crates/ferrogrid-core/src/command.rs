//! Toggle commands and the legacy `/magnet?num=N` request shape.

use crate::error::{FerroError, Result};
use serde::{Deserialize, Serialize};

/// Path of the toggle endpoint used by the control page.
pub const TOGGLE_PATH: &str = "/magnet";

/// Query parameter carrying the 1-based actuator index.
pub const INDEX_PARAM: &str = "num";

/// A request to toggle one actuator. Applied exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub target_index: usize,
}

impl Command {
    pub fn toggle(target_index: usize) -> Self {
        Self { target_index }
    }

    /// Parse a decimal actuator index. Range checking is left to the grid.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(FerroError::Decode("missing actuator index".to_string()));
        }
        trimmed
            .parse::<usize>()
            .map(Self::toggle)
            .map_err(|_| FerroError::Decode(format!("invalid actuator index '{trimmed}'")))
    }
}

/// Query parameters of the legacy toggle endpoint, `/magnet?num=N`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ToggleParams {
    pub num: Option<String>,
}

impl ToggleParams {
    /// The command these parameters ask for. A missing or malformed index
    /// is a decode error.
    pub fn command(&self) -> Result<Command> {
        let raw = self.num.as_deref().ok_or_else(|| {
            FerroError::Decode(format!("'{TOGGLE_PATH}' without '{INDEX_PARAM}' parameter"))
        })?;
        Command::parse(raw)
    }
}
