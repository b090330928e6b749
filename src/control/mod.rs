//! Closed-loop heater regulation.

pub mod thermostat;
