//! Bang-bang thermostat with a dead-band.
//!
//! Converts the state machine's active target temperature into a binary
//! heater command. One degree of hysteresis above the target prevents
//! rapid relay cycling: ON below target, OFF above target + band, hold
//! inside the band.
//!
//! This is the **sole** path allowed to decide heater actuation. It is a
//! plain struct with no port dependencies so it stays independently
//! testable; the application service applies the output to hardware and
//! only on change.

use crate::config::DryerConfig;
use crate::fsm::StateId;

/// Dead-band above the target temperature (Celsius).
pub const HYSTERESIS_C: f32 = 1.0;

/// The active heat target for a process state, if the state demands heat.
///
/// Pure function: Idle demands nothing; Drying and Heating run at the
/// drying temperature; Warming holds the warm temperature.
pub fn heat_target(state: StateId, config: &DryerConfig) -> Option<f32> {
    match state {
        StateId::Idle => None,
        StateId::Drying | StateId::Heating => Some(config.drying_temp_c),
        StateId::Warming => Some(config.warm_temp_c),
    }
}

/// Hysteretic heater regulator. Holds the previous output so the
/// dead-band has something to hold *to*.
pub struct Thermostat {
    hysteresis_c: f32,
    output_on: bool,
}

impl Thermostat {
    pub fn new() -> Self {
        Self {
            hysteresis_c: HYSTERESIS_C,
            output_on: false,
        }
    }

    /// Decide the heater output for this tick.
    ///
    /// `temperature` is `None` when the sensor read failed. With an active
    /// heat demand and no valid temperature the heater is forced OFF — an
    /// unknown chamber temperature must never keep the element energised.
    ///
    /// Returns the new output. Callers detect changes by comparing against
    /// the previous [`is_on`](Self::is_on) value before the call.
    pub fn decide(
        &mut self,
        state: StateId,
        config: &DryerConfig,
        temperature: Option<f32>,
    ) -> bool {
        let Some(target) = heat_target(state, config) else {
            // No state demands heat: force OFF regardless of temperature.
            self.output_on = false;
            return false;
        };

        let Some(temp) = temperature else {
            self.output_on = false;
            return false;
        };

        if temp < target {
            self.output_on = true;
        } else if temp > target + self.hysteresis_c {
            self.output_on = false;
        }
        // Inside the dead-band: hold the previous output.

        self.output_on
    }

    /// Current (most recently decided) output.
    pub fn is_on(&self) -> bool {
        self.output_on
    }
}

impl Default for Thermostat {
    fn default() -> Self {
        Self::new()
    }
}
