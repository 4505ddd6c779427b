//! PWM output channels.
//!
//! [`PwmChannel`] is the seam between the actuator state machine and the
//! hardware duty register. [`SimulatedPwm`] stands in for real GPIO when the
//! grid runs off-target.

use crate::error::{FerroError, Result};

/// Full-scale value of the 16-bit duty register.
pub const PWM_MAX: u16 = u16::MAX;

/// Map a duty-cycle percentage onto the duty register range.
///
/// Values are clamped to `0.0..=100.0` and truncated, so `100.0` maps to
/// [`PWM_MAX`] and `50.0` to `32767`.
pub fn duty_from_percent(percent: f32) -> u16 {
    let fraction = (percent / 100.0).clamp(0.0, 1.0);
    (fraction * PWM_MAX as f32) as u16
}

/// One hardware PWM output driving a single magnet coil.
pub trait PwmChannel: Send {
    /// GPIO pin number, used for diagnostics.
    fn pin(&self) -> u8;

    fn set_frequency(&mut self, hz: u32) -> Result<()>;

    /// Write the raw duty register. `0` de-energizes the coil.
    fn set_duty(&mut self, duty: u16) -> Result<()>;

    fn duty(&self) -> u16;
}

// ---------------------------------------------------------------------------
// SimulatedPwm
// ---------------------------------------------------------------------------

/// In-memory PWM channel that records frequency and duty writes.
#[derive(Debug)]
pub struct SimulatedPwm {
    pin: u8,
    frequency_hz: u32,
    duty: u16,
    duty_writes: u64,
    fail_at_write: Option<u64>,
}

impl SimulatedPwm {
    pub fn new(pin: u8) -> Self {
        Self {
            pin,
            frequency_hz: 0,
            duty: 0,
            duty_writes: 0,
            fail_at_write: None,
        }
    }

    /// A channel whose `n`th duty write (1-based) and every write after it
    /// fails with a drive fault.
    pub fn failing_at_write(pin: u8, n: u64) -> Self {
        Self {
            fail_at_write: Some(n),
            ..Self::new(pin)
        }
    }
}

impl PwmChannel for SimulatedPwm {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn set_frequency(&mut self, hz: u32) -> Result<()> {
        if hz == 0 {
            return Err(FerroError::DriveFault {
                pin: self.pin,
                reason: "frequency must be nonzero".to_string(),
            });
        }
        self.frequency_hz = hz;
        Ok(())
    }

    fn set_duty(&mut self, duty: u16) -> Result<()> {
        self.duty_writes += 1;
        if let Some(n) = self.fail_at_write {
            if self.duty_writes >= n {
                return Err(FerroError::DriveFault {
                    pin: self.pin,
                    reason: format!("simulated write failure (write #{})", self.duty_writes),
                });
            }
        }
        tracing::trace!(pin = self.pin, hz = self.frequency_hz, duty, "pwm duty write");
        self.duty = duty;
        Ok(())
    }

    fn duty(&self) -> u16 {
        self.duty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_maps_onto_register_range() {
        assert_eq!(duty_from_percent(100.0), PWM_MAX);
        assert_eq!(duty_from_percent(0.0), 0);
        assert_eq!(duty_from_percent(50.0), 32767);
        assert_eq!(duty_from_percent(150.0), PWM_MAX);
        assert_eq!(duty_from_percent(-3.0), 0);
    }

    #[test]
    fn simulated_channel_records_writes() {
        let mut pwm = SimulatedPwm::new(26);
        assert_eq!(pwm.pin(), 26);
        assert_eq!(pwm.duty(), 0);

        pwm.set_frequency(1000).unwrap();
        pwm.set_duty(1234).unwrap();
        assert_eq!(pwm.frequency_hz, 1000);
        assert_eq!(pwm.duty(), 1234);
        assert_eq!(pwm.duty_writes, 1);
    }

    #[test]
    fn zero_frequency_is_a_drive_fault() {
        let mut pwm = SimulatedPwm::new(3);
        let err = pwm.set_frequency(0).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn failing_channel_keeps_last_good_duty() {
        let mut pwm = SimulatedPwm::failing_at_write(7, 2);
        pwm.set_duty(500).unwrap();
        let err = pwm.set_duty(0).unwrap_err();
        assert!(matches!(err, FerroError::DriveFault { pin: 7, .. }));
        assert_eq!(pwm.duty(), 500);
    }
}
