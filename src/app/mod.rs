//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules for the dryer: FSM
//! orchestration, thermostat control, process logging, and preset
//! management. All interaction with hardware and storage happens through
//! **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
