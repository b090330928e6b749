//! GPIO / peripheral pin assignments for the DryBox controller board.
//!
//! Single source of truth — every adapter references this module rather
//! than hard-coding pin numbers. Change a pin here and it propagates
//! everywhere.

// ---------------------------------------------------------------------------
// Heater (solid-state relay, active HIGH)
// ---------------------------------------------------------------------------

/// Digital output driving the heater SSR gate.
pub const HEATER_RELAY_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Climate sensor (SHT31, I2C)
// ---------------------------------------------------------------------------

/// I2C SDA line to the SHT31.
pub const SHT31_SDA_GPIO: i32 = 8;
/// I2C SCL line to the SHT31.
pub const SHT31_SCL_GPIO: i32 = 9;
/// SHT31 7-bit I2C address (ADDR pin low).
pub const SHT31_I2C_ADDR: u8 = 0x44;
