use crate::error::Result;
use crate::pwm::{duty_from_percent, PwmChannel};
use crate::types::{ActuatorState, ActuatorStatus, Millis, OffReason};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_OFF_DELAY_MS: Millis = 400;
pub const DEFAULT_MAX_ON_TIME_MS: Millis = 10_000;

// ---------------------------------------------------------------------------
// ActuatorParams
// ---------------------------------------------------------------------------

/// Construction-time parameters of one actuator. Never change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorParams {
    pub id: usize,
    pub pin: u8,
    pub row: usize,
    pub column: usize,
    pub frequency_hz: u32,
    pub duty_cycle_percent: f32,
    pub off_delay_ms: Millis,
    pub max_on_time_ms: Millis,
}

// ---------------------------------------------------------------------------
// ActuatorSnapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorSnapshot {
    pub id: usize,
    pub row: usize,
    pub column: usize,
    pub pin: u8,
    pub state: ActuatorStatus,
    pub duty: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turned_on_at: Option<Millis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_off_at: Option<Millis>,
}

// ---------------------------------------------------------------------------
// Actuator
// ---------------------------------------------------------------------------

/// One magnet channel and its off-delay / max-on-time state machine.
///
/// ```text
///            turn_on                     turn_off
///   Off ───────────────► OnArmed ───────────────────► OnPendingOff
///    ▲                      │  ▲                           │
///    │     tick: max-on     │  └────── turn_on ────────────┤
///    ├──────────────────────┘                              │
///    └──────── turn_off, or tick: off-delay / max-on ──────┘
/// ```
pub struct Actuator {
    id: usize,
    pin: u8,
    row: usize,
    column: usize,
    frequency_hz: u32,
    on_duty: u16,
    off_delay_ms: Millis,
    max_on_time_ms: Millis,
    state: ActuatorState,
    channel: Box<dyn PwmChannel>,
}

impl Actuator {
    /// Configure the channel frequency and drive it to zero duty.
    pub fn new(params: ActuatorParams, mut channel: Box<dyn PwmChannel>) -> Result<Self> {
        channel.set_frequency(params.frequency_hz)?;
        channel.set_duty(0)?;
        Ok(Self {
            id: params.id,
            pin: params.pin,
            row: params.row,
            column: params.column,
            frequency_hz: params.frequency_hz,
            on_duty: duty_from_percent(params.duty_cycle_percent),
            off_delay_ms: params.off_delay_ms,
            max_on_time_ms: params.max_on_time_ms,
            state: ActuatorState::Off,
            channel,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    pub fn is_energized(&self) -> bool {
        self.state.is_energized()
    }

    /// Current value of the hardware duty register.
    pub fn duty(&self) -> u16 {
        self.channel.duty()
    }

    /// Energize and (re)start the max-on-time window. Valid from any state.
    pub fn turn_on(&mut self, now: Millis) -> Result<()> {
        self.channel.set_duty(self.on_duty)?;
        self.state = ActuatorState::OnArmed { turned_on_at: now };
        tracing::debug!(id = self.id, pin = self.pin, now, "actuator armed");
        Ok(())
    }

    /// First call on an armed actuator starts the off-delay; a second call
    /// while the delay is pending cuts power.
    pub fn turn_off(&mut self, now: Millis) -> Result<()> {
        match self.state {
            ActuatorState::Off => Ok(()),
            ActuatorState::OnArmed { turned_on_at } => {
                self.state = ActuatorState::OnPendingOff {
                    turned_on_at,
                    pending_off_at: now,
                };
                tracing::debug!(id = self.id, now, "actuator off-delay started");
                Ok(())
            }
            ActuatorState::OnPendingOff { .. } => self.force_off(),
        }
    }

    pub fn toggle(&mut self, now: Millis) -> Result<()> {
        match self.state {
            ActuatorState::Off => self.turn_on(now),
            _ => self.turn_off(now),
        }
    }

    /// Enforce the off-delay and max-on-time deadlines.
    ///
    /// Returns the bound that fired, if any. Max-on-time wins when both have
    /// elapsed.
    pub fn tick(&mut self, now: Millis) -> Result<Option<OffReason>> {
        let reason = match self.state {
            ActuatorState::Off => None,
            ActuatorState::OnArmed { turned_on_at } => {
                (now.saturating_sub(turned_on_at) >= self.max_on_time_ms)
                    .then_some(OffReason::MaxOnTime)
            }
            ActuatorState::OnPendingOff {
                turned_on_at,
                pending_off_at,
            } => {
                if now.saturating_sub(turned_on_at) >= self.max_on_time_ms {
                    Some(OffReason::MaxOnTime)
                } else if now.saturating_sub(pending_off_at) >= self.off_delay_ms {
                    Some(OffReason::OffDelay)
                } else {
                    None
                }
            }
        };

        if let Some(reason) = reason {
            self.force_off()?;
            tracing::debug!(id = self.id, now, %reason, "actuator forced off");
        }
        Ok(reason)
    }

    /// Cut power immediately, bypassing the off-delay.
    pub(crate) fn force_off(&mut self) -> Result<()> {
        self.channel.set_duty(0)?;
        self.state = ActuatorState::Off;
        Ok(())
    }

    pub fn snapshot(&self) -> ActuatorSnapshot {
        ActuatorSnapshot {
            id: self.id,
            row: self.row,
            column: self.column,
            pin: self.pin,
            state: self.state.status(),
            duty: self.duty(),
            turned_on_at: self.state.turned_on_at(),
            pending_off_at: self.state.pending_off_at(),
        }
    }
}

impl fmt::Debug for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actuator")
            .field("id", &self.id)
            .field("pin", &self.pin)
            .field("state", &self.state)
            .field("duty", &self.duty())
            .finish()
    }
}
