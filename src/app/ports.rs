//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (climate sensor, heater relay, event sinks, storage)
//! implement these traits. The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

use crate::config::DryerConfig;
use crate::error::{PersistenceError, Result};
use crate::fsm::context::ClimateSample;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain climate data.
pub trait SensorPort {
    /// Read the climate sensor. `None` on a failed or implausible read —
    /// never a zeroed or stale sample.
    fn read_climate(&mut self) -> Option<ClimateSample>;
}

// ───────────────────────────────────────────────────────────────
// Heater port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain commands the heater relay through this.
pub trait HeaterPort {
    fn set_heater(&mut self, on: bool);

    /// Query the last commanded relay state.
    fn is_heater_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, the web
/// layer's status push, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the live configuration.
///
/// Implementations MUST validate before persisting. Out-of-range values
/// are rejected, not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`DryerConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<DryerConfig>;

    /// Validate and persist configuration.
    fn save(&self, config: &DryerConfig) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for preset blobs and similar records.
///
/// Keys are namespaced to prevent collisions between subsystems. Write
/// operations MUST be atomic — no partial writes on power loss. The
/// ESP-IDF NVS API guarantees this natively; in-memory simulation
/// achieves it trivially.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8])
        -> core::result::Result<usize, PersistenceError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8])
        -> core::result::Result<(), PersistenceError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str)
        -> core::result::Result<(), PersistenceError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}
