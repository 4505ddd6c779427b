use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic milliseconds since the controller started.
pub type Millis = u64;

// ---------------------------------------------------------------------------
// ActuatorState
// ---------------------------------------------------------------------------

/// Drive state of one actuator. Timestamps exist only while energized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActuatorState {
    #[default]
    Off,
    OnArmed {
        turned_on_at: Millis,
    },
    OnPendingOff {
        turned_on_at: Millis,
        pending_off_at: Millis,
    },
}

impl ActuatorState {
    pub fn status(self) -> ActuatorStatus {
        match self {
            ActuatorState::Off => ActuatorStatus::Off,
            ActuatorState::OnArmed { .. } => ActuatorStatus::OnArmed,
            ActuatorState::OnPendingOff { .. } => ActuatorStatus::OnPendingOff,
        }
    }

    pub fn is_energized(self) -> bool {
        !matches!(self, ActuatorState::Off)
    }

    pub fn turned_on_at(self) -> Option<Millis> {
        match self {
            ActuatorState::Off => None,
            ActuatorState::OnArmed { turned_on_at }
            | ActuatorState::OnPendingOff { turned_on_at, .. } => Some(turned_on_at),
        }
    }

    pub fn pending_off_at(self) -> Option<Millis> {
        match self {
            ActuatorState::OnPendingOff { pending_off_at, .. } => Some(pending_off_at),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ActuatorStatus
// ---------------------------------------------------------------------------

/// Flat, serializable view of [`ActuatorState`] without its timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorStatus {
    Off,
    OnArmed,
    OnPendingOff,
}

impl ActuatorStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ActuatorStatus::Off => "off",
            ActuatorStatus::OnArmed => "on_armed",
            ActuatorStatus::OnPendingOff => "on_pending_off",
        }
    }
}

impl fmt::Display for ActuatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActuatorStatus {
    type Err = crate::error::FerroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(ActuatorStatus::Off),
            "on_armed" => Ok(ActuatorStatus::OnArmed),
            "on_pending_off" => Ok(ActuatorStatus::OnPendingOff),
            _ => Err(crate::error::FerroError::Decode(format!(
                "unknown actuator status '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// OffReason
// ---------------------------------------------------------------------------

/// Which timer forced an actuator off during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffReason {
    OffDelay,
    MaxOnTime,
}

impl OffReason {
    pub fn as_str(self) -> &'static str {
        match self {
            OffReason::OffDelay => "off_delay",
            OffReason::MaxOnTime => "max_on_time",
        }
    }
}

impl fmt::Display for OffReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One actuator forced off by `Grid::tick_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedOff {
    pub id: usize,
    pub reason: OffReason,
}
