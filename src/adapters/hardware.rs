//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the SHT31 climate sensor and the heater SSR, exposing them
//! through [`SensorPort`] and [`HeaterPort`]. This is the only module in
//! the system that touches actual hardware. The SHT31 transaction is
//! generic over `embedded-hal`'s I2C and delay traits so the protocol
//! logic is testable without a bus. On non-espidf targets the sensor
//! reads from static atomics for injection and the relay is a plain
//! flag, so the full control loop runs on the host.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::warn;

use crate::app::ports::{HeaterPort, SensorPort};
use crate::fsm::context::ClimateSample;
#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
#[cfg(target_os = "espidf")]
use esp_idf_hal::i2c::I2cDriver;

// Plausibility window for the SHT31; readings outside are treated as a
// failed read rather than fed to the control loop.
const TEMP_MIN_C: f32 = -20.0;
const TEMP_MAX_C: f32 = 120.0;

// ── SHT31 protocol ────────────────────────────────────────────

/// Single-shot measurement, high repeatability, clock stretching
/// disabled.
const SHT31_MEASURE_HIGHREP: [u8; 2] = [0x24, 0x00];

/// Run one single-shot SHT31 measurement over any I2C bus. Both data
/// words carry a CRC-8 checksum; a mismatch counts as a failed read.
pub fn sht31_measure<B: I2c, D: DelayNs>(
    bus: &mut B,
    delay: &mut D,
    addr: u8,
) -> Option<ClimateSample> {
    if bus.write(addr, &SHT31_MEASURE_HIGHREP).is_err() {
        return None;
    }
    // 15 ms max measurement duration at high repeatability.
    delay.delay_ms(16);

    let mut buf = [0u8; 6];
    if bus.read(addr, &mut buf).is_err() {
        return None;
    }
    if crc8(&buf[0..2]) != buf[2] || crc8(&buf[3..5]) != buf[5] {
        warn!("SHT31: CRC mismatch");
        return None;
    }

    let raw_t = u16::from_be_bytes([buf[0], buf[1]]) as f32;
    let raw_h = u16::from_be_bytes([buf[3], buf[4]]) as f32;
    Some(ClimateSample {
        temperature_c: -45.0 + 175.0 * raw_t / 65535.0,
        humidity_pct: 100.0 * raw_h / 65535.0,
    })
}

/// CRC-8 as specified in the SHT3x datasheet (poly 0x31, init 0xFF).
fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

// ── Host simulation hooks ─────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_TEMP_BITS: AtomicU32 = AtomicU32::new(0x41C8_0000); // 25.0 °C
#[cfg(not(target_os = "espidf"))]
static SIM_HUM_BITS: AtomicU32 = AtomicU32::new(0x4248_0000); // 50.0 %RH
#[cfg(not(target_os = "espidf"))]
static SIM_SENSOR_FAIL: AtomicBool = AtomicBool::new(false);

/// Inject a climate reading for host-side runs.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_climate(temperature_c: f32, humidity_pct: f32) {
    SIM_TEMP_BITS.store(temperature_c.to_bits(), Ordering::Relaxed);
    SIM_HUM_BITS.store(humidity_pct.to_bits(), Ordering::Relaxed);
}

/// Force subsequent host-side reads to fail.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_sensor_fail(fail: bool) {
    SIM_SENSOR_FAIL.store(fail, Ordering::Relaxed);
}

// ── Adapter ───────────────────────────────────────────────────

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    #[cfg(target_os = "espidf")]
    i2c: I2cDriver<'static>,
    #[cfg(target_os = "espidf")]
    relay: PinDriver<'static, AnyOutputPin, Output>,
    heater_on: bool,
}

impl HardwareAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        i2c: I2cDriver<'static>,
        relay: PinDriver<'static, AnyOutputPin, Output>,
    ) -> Self {
        Self {
            i2c,
            relay,
            heater_on: false,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self { heater_on: false }
    }

    #[cfg(target_os = "espidf")]
    fn read_sht31(&mut self) -> Option<ClimateSample> {
        sht31_measure(
            &mut self.i2c,
            &mut esp_idf_hal::delay::FreeRtos,
            pins::SHT31_I2C_ADDR,
        )
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_sht31(&mut self) -> Option<ClimateSample> {
        if SIM_SENSOR_FAIL.load(Ordering::Relaxed) {
            return None;
        }
        Some(ClimateSample {
            temperature_c: f32::from_bits(SIM_TEMP_BITS.load(Ordering::Relaxed)),
            humidity_pct: f32::from_bits(SIM_HUM_BITS.load(Ordering::Relaxed)),
        })
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_climate(&mut self) -> Option<ClimateSample> {
        let sample = self.read_sht31()?;
        // Implausible values count as a failed read, never a zeroed sample.
        if !sample.temperature_c.is_finite()
            || !sample.humidity_pct.is_finite()
            || !(TEMP_MIN_C..=TEMP_MAX_C).contains(&sample.temperature_c)
            || !(0.0..=100.0).contains(&sample.humidity_pct)
        {
            warn!(
                "climate reading out of range: {:.1}C {:.1}%RH",
                sample.temperature_c, sample.humidity_pct
            );
            return None;
        }
        Some(sample)
    }
}

// ── HeaterPort implementation ─────────────────────────────────

impl HeaterPort for HardwareAdapter {
    fn set_heater(&mut self, on: bool) {
        self.heater_on = on;
        #[cfg(target_os = "espidf")]
        {
            let result = if on {
                self.relay.set_high()
            } else {
                self.relay.set_low()
            };
            if let Err(e) = result {
                warn!("heater relay write failed: {e}");
            }
        }
    }

    fn is_heater_on(&self) -> bool {
        self.heater_on
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorType, Operation};

    /// Canned I2C slave that answers every read with the same frame.
    struct FakeBus {
        frame: [u8; 6],
        written: Vec<u8>,
    }

    impl ErrorType for FakeBus {
        type Error = core::convert::Infallible;
    }

    impl I2c for FakeBus {
        fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            for op in operations {
                match op {
                    Operation::Write(bytes) => self.written.extend_from_slice(bytes),
                    Operation::Read(buf) => {
                        let n = buf.len().min(self.frame.len());
                        buf[..n].copy_from_slice(&self.frame[..n]);
                    }
                }
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn sht31_frame_decodes_and_checks_crc() {
        // raw_t = 0x6666 -> 25.0 C, raw_h = 0x8000 -> 50.0 %RH
        let mut bus = FakeBus {
            frame: [0x66, 0x66, 0x93, 0x80, 0x00, 0xA2],
            written: Vec::new(),
        };
        let sample = sht31_measure(&mut bus, &mut NoDelay, 0x44).unwrap();
        assert!((sample.temperature_c - 25.0).abs() < 0.01);
        assert!((sample.humidity_pct - 50.0).abs() < 0.01);
        assert_eq!(bus.written, SHT31_MEASURE_HIGHREP);
    }

    #[test]
    fn sht31_crc_mismatch_is_a_failed_read() {
        let mut bus = FakeBus {
            frame: [0x66, 0x66, 0x00, 0x80, 0x00, 0xA2],
            written: Vec::new(),
        };
        assert!(sht31_measure(&mut bus, &mut NoDelay, 0x44).is_none());
    }

    #[test]
    fn out_of_range_reading_is_rejected() {
        let mut hw = HardwareAdapter::new();
        sim_set_sensor_fail(false);
        sim_set_climate(25.0, 55.0);
        assert!(hw.read_climate().is_some());

        sim_set_climate(25.0, 140.0);
        assert!(hw.read_climate().is_none());

        sim_set_climate(f32::NAN, 50.0);
        assert!(hw.read_climate().is_none());
    }

    #[test]
    fn heater_state_tracks_commands() {
        let mut hw = HardwareAdapter::new();
        assert!(!hw.is_heater_on());
        hw.set_heater(true);
        assert!(hw.is_heater_on());
        hw.set_heater(false);
        assert!(!hw.is_heater_on());
    }
}
