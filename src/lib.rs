//! DryBox firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod eventlog;
pub mod events;
pub mod fsm;
pub mod messages;
pub mod presets;

mod pins;

// ESPidf-only implementations are guarded by cfg attributes inside.
pub mod adapters;
