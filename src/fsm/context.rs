//! Shared mutable context threaded through every FSM handler.
//!
//! `DryerContext` is the single struct that state handlers read from and
//! write to. It holds the latest climate sample, the wall clock, the live
//! configuration, and the run-scoped bookkeeping for stall detection, the
//! timed heat phase, and the warming re-dry condition. Think of it as the
//! "blackboard" in a blackboard architecture.

use crate::config::DryerConfig;

// ---------------------------------------------------------------------------
// Climate sample (read-only to state handlers; written by the sensor poll)
// ---------------------------------------------------------------------------

/// A point-in-time reading from the climate sensor.
///
/// The absence of a sample (`Option::None` in [`DryerContext::sample`]) is
/// the explicit invalid-reading marker — no silent zero or garbage values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSample {
    /// Chamber temperature (Celsius).
    pub temperature_c: f32,
    /// Relative humidity (%RH).
    pub humidity_pct: f32,
}

// ---------------------------------------------------------------------------
// DryerContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct DryerContext {
    // -- Timing --
    /// Wall-clock time of the current tick (milliseconds, monotonic).
    pub now_ms: u64,

    // -- Sensor data --
    /// Latest climate reading, or `None` when the last poll failed.
    pub sample: Option<ClimateSample>,

    // -- Configuration --
    /// Live configuration (tunable parameters, shared with the web layer).
    pub config: DryerConfig,

    // -- Runtime state --
    /// Master enable switch. When false the FSM is forced to Idle within
    /// one tick.
    pub enabled: bool,
    /// Working humidity target for the current drying run. Initialized
    /// from `config.setpoint_humidity` when a run starts; overridden by
    /// stall detection. Meaningful only while `dry_run_active`.
    pub effective_setpoint: f32,
    /// Start of the current stall-evaluation window.
    pub last_stall_check_ms: u64,
    /// Humidity snapshot at the start of the window, or `None` while no
    /// valid reading has armed it yet. Stall judgment waits until armed.
    pub humidity_at_stall_check: Option<f32>,
    /// Instant the timed heat phase started.
    pub heat_start_ms: u64,
    /// True from the first Drying entry of a run until the run ends
    /// (Idle). Gates effective-setpoint re-initialization so a stall
    /// override survives a hysteresis re-dry.
    pub dry_run_active: bool,
    /// True only when the current Warming state was entered from Drying in
    /// this run. A Warming state reached from Heat-mode expiry or manual
    /// Warm selection never re-arms into Drying.
    pub warming_can_redry: bool,
}

impl DryerContext {
    /// Create a new context with the given configuration.
    pub fn new(config: DryerConfig) -> Self {
        Self {
            now_ms: 0,
            sample: None,
            config,
            enabled: false,
            effective_setpoint: 0.0,
            last_stall_check_ms: 0,
            humidity_at_stall_check: None,
            heat_start_ms: 0,
            dry_run_active: false,
            warming_can_redry: false,
        }
    }

    /// Current humidity, if the last poll produced a valid sample.
    pub fn humidity(&self) -> Option<f32> {
        self.sample.map(|s| s.humidity_pct)
    }

    /// Current temperature, if the last poll produced a valid sample.
    pub fn temperature(&self) -> Option<f32> {
        self.sample.map(|s| s.temperature_c)
    }

    /// Milliseconds elapsed since the stall window was armed.
    pub fn stall_window_elapsed_ms(&self) -> u64 {
        self.now_ms.saturating_sub(self.last_stall_check_ms)
    }

    /// Milliseconds elapsed since the timed heat phase started.
    pub fn heat_elapsed_ms(&self) -> u64 {
        self.now_ms.saturating_sub(self.heat_start_ms)
    }
}
