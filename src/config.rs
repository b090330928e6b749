//! System configuration parameters
//!
//! All tunable parameters for the DryBox dryer. The live instance is owned
//! by the FSM context; values can be overridden via NVS or by loading a
//! preset at runtime.

use serde::{Deserialize, Serialize};

/// User-selectable operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DryerMode {
    /// Dry to a humidity target, then hold warm.
    Dry = 0,
    /// Timed heat at the drying temperature, regardless of humidity.
    Heat = 1,
    /// Hold at the warm temperature indefinitely.
    Warm = 2,
}

impl DryerMode {
    /// Decode the wire representation (0/1/2) used by the command surface
    /// and the persisted preset records.
    pub fn from_index(idx: u8) -> Option<Self> {
        match idx {
            0 => Some(Self::Dry),
            1 => Some(Self::Heat),
            2 => Some(Self::Warm),
            _ => None,
        }
    }
}

/// What happens when the timed heat phase expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum HeatCompletion {
    /// Disable the heater entirely and drop to Idle.
    Stop = 0,
    /// Fall back to holding the warm temperature.
    Warm = 1,
}

impl HeatCompletion {
    pub fn from_index(idx: u8) -> Option<Self> {
        match idx {
            0 => Some(Self::Stop),
            1 => Some(Self::Warm),
            _ => None,
        }
    }
}

/// Core dryer configuration.
///
/// Durations are stored in milliseconds internally; the command surface and
/// the persisted preset records use coarser units (minutes/hours) and
/// convert at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DryerConfig {
    // --- Temperatures ---
    /// Target chamber temperature while drying or timed-heating (Celsius).
    pub drying_temp_c: f32,
    /// Target chamber temperature while warming/holding (Celsius).
    pub warm_temp_c: f32,

    // --- Humidity control ---
    /// Relative humidity (%RH) at which the drying phase completes.
    pub setpoint_humidity: f32,
    /// %RH the humidity may rise above the effective setpoint before
    /// drying re-engages from the warming hold.
    pub humidity_hysteresis: f32,

    // --- Stall detection ---
    /// Window (ms) over which drying progress is evaluated.
    pub stall_check_interval_ms: u64,
    /// Minimum %RH drop over the window to count as progress.
    pub stall_humidity_delta: f32,

    // --- Timed heat ---
    /// Duration (ms) of the fixed heat-only phase.
    pub heat_duration_ms: u64,
    /// Action when the heat duration elapses.
    pub heat_completion: HeatCompletion,

    // --- Logging ---
    /// Cadence (ms) for timed process-log emission.
    pub log_interval_ms: u64,

    // --- Mode ---
    /// User-chosen operating mode.
    pub mode: DryerMode,

    // --- Timing ---
    /// Control loop interval (milliseconds).
    pub control_interval_ms: u32,
    /// Sensor poll interval (milliseconds).
    pub sensor_poll_interval_ms: u32,
}

impl Default for DryerConfig {
    fn default() -> Self {
        Self {
            // Temperatures — PLA-safe out of the box
            drying_temp_c: 50.0,
            warm_temp_c: 40.0,

            // Humidity
            setpoint_humidity: 15.0,
            humidity_hysteresis: 2.0,

            // Stall detection
            stall_check_interval_ms: 30 * 60 * 1000, // 30 min window
            stall_humidity_delta: 0.5,

            // Timed heat
            heat_duration_ms: 4 * 60 * 60 * 1000, // 4 h
            heat_completion: HeatCompletion::Warm,

            // Logging
            log_interval_ms: 60 * 1000, // 1 min

            mode: DryerMode::Dry,

            // Timing
            control_interval_ms: 1000,     // 1 Hz
            sensor_poll_interval_ms: 2000, // 0.5 Hz
        }
    }
}
