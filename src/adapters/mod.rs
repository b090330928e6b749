//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements       | Connects to              |
//! |------------|------------------|--------------------------|
//! | `hardware` | SensorPort       | SHT31 over I2C           |
//! |            | HeaterPort       | Heater SSR GPIO          |
//! | `log_sink` | EventSink        | Serial log output        |
//! |            | LogListener      | Serial process log       |
//! | `nvs`      | ConfigPort       | NVS / in-memory store    |
//! |            | StoragePort      |                          |
//! | `time`     | —                | ESP32 system timer       |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
