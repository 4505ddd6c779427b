use crate::actuator::{Actuator, ActuatorParams, ActuatorSnapshot};
use crate::config::Config;
use crate::error::{FerroError, Result};
use crate::pwm::{PwmChannel, SimulatedPwm};
use crate::types::{ActuatorState, ForcedOff, Millis};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GridSnapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of every actuator, for readers that must not touch
/// the grid itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub now_ms: Millis,
    pub rows: Vec<usize>,
    pub actuators: Vec<ActuatorSnapshot>,
}

impl GridSnapshot {
    pub fn get(&self, index: usize) -> Option<&ActuatorSnapshot> {
        index.checked_sub(1).and_then(|i| self.actuators.get(i))
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// Actuators in row-major order, addressed by 1-based flattened index.
///
/// Only one actuator is meant to pull ferrofluid at a time: selecting one
/// starts shutting down all the others through their own off-delay.
#[derive(Debug)]
pub struct Grid {
    rows: Vec<usize>,
    actuators: Vec<Actuator>,
}

impl Grid {
    /// Build a grid from `config`, asking `make_channel` for each output.
    pub fn from_config<F>(config: &Config, mut make_channel: F) -> Result<Self>
    where
        F: FnMut(&ActuatorParams) -> Box<dyn PwmChannel>,
    {
        config.ensure_valid()?;
        let actuators = config
            .actuator_params()
            .into_iter()
            .map(|params| {
                let channel = make_channel(&params);
                Actuator::new(params, channel)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            rows: config.layout.row_lengths(),
            actuators,
        })
    }

    /// Grid backed by [`SimulatedPwm`] channels.
    pub fn simulated(config: &Config) -> Result<Self> {
        Self::from_config(config, |p| Box::new(SimulatedPwm::new(p.pin)))
    }

    pub fn len(&self) -> usize {
        self.actuators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actuators.is_empty()
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Actuator> {
        index.checked_sub(1).and_then(|i| self.actuators.get(i))
    }

    /// Ids of every actuator currently energized.
    pub fn energized(&self) -> Vec<usize> {
        self.actuators
            .iter()
            .filter(|a| a.is_energized())
            .map(Actuator::id)
            .collect()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index == 0 || index > self.actuators.len() {
            return Err(FerroError::Addressing {
                index,
                count: self.actuators.len(),
            });
        }
        Ok(())
    }

    /// Toggle actuator `index` and send every other actuator a turn-off.
    ///
    /// The index is validated before anything is touched, so an addressing
    /// error leaves the whole grid unchanged. Returns the target's new state.
    pub fn toggle(&mut self, index: usize, now: Millis) -> Result<ActuatorState> {
        self.check_index(index)?;
        for actuator in &mut self.actuators {
            if actuator.id() == index {
                actuator.toggle(now)?;
            } else {
                actuator.turn_off(now)?;
            }
        }
        Ok(self.actuators[index - 1].state())
    }

    /// Advance every actuator's timers; returns the ones forced off.
    pub fn tick_all(&mut self, now: Millis) -> Result<Vec<ForcedOff>> {
        let mut forced = Vec::new();
        for actuator in &mut self.actuators {
            if let Some(reason) = actuator.tick(now)? {
                forced.push(ForcedOff {
                    id: actuator.id(),
                    reason,
                });
            }
        }
        Ok(forced)
    }

    /// Cut power on every channel. Every actuator is attempted even when an
    /// earlier one fails; the first failure is returned.
    pub fn shutdown(&mut self) -> Result<()> {
        let mut first_err = None;
        for actuator in &mut self.actuators {
            if let Err(e) = actuator.force_off() {
                tracing::error!(
                    id = actuator.id(),
                    pin = actuator.pin(),
                    "shutdown write failed: {e}"
                );
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn snapshot(&self, now: Millis) -> GridSnapshot {
        GridSnapshot {
            now_ms: now,
            rows: self.rows.clone(),
            actuators: self.actuators.iter().map(Actuator::snapshot).collect(),
        }
    }
}
