//! DryBox Firmware — Main Entry Point
//!
//! Hexagonal architecture with cooperative event-driven execution.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                  │
//! │                                                          │
//! │  HardwareAdapter    LogEventSink    NvsAdapter           │
//! │  (Sensor+Heater)    (EventSink)     (Config+Storage)     │
//! │                                                          │
//! │  ────────────── Port Trait Boundary ──────────────       │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │            AppService (pure logic)             │      │
//! │  │  FSM · Thermostat · Process Log · Presets      │      │
//! │  └────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod app;
pub mod config;
mod control;
mod error;
mod eventlog;
mod events;
pub mod fsm;
mod messages;
mod pins;
mod presets;

mod adapters;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use adapters::hardware::HardwareAdapter;
use adapters::log_sink::{LogEventSink, SerialLogListener};
use adapters::nvs::NvsAdapter;
use adapters::time::Esp32TimeAdapter;
use app::ports::ConfigPort;
use app::service::AppService;
use config::DryerConfig;
use events::{push_event, Event};

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    info!("DryBox v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let mut nvs = NvsAdapter::new()?;
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({e}), using defaults");
            DryerConfig::default()
        }
    };

    // ── 3. Construct adapters ─────────────────────────────────
    #[cfg(target_os = "espidf")]
    let mut hw = {
        use esp_idf_hal::gpio::PinDriver;
        use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
        use esp_idf_hal::peripherals::Peripherals;
        use esp_idf_hal::prelude::*;

        let p = Peripherals::take()?;
        let i2c = I2cDriver::new(
            p.i2c0,
            p.pins.gpio8,
            p.pins.gpio9,
            &I2cConfig::new().baudrate(100.kHz().into()),
        )?;
        let relay = PinDriver::output(p.pins.gpio4.downgrade_output())?;
        HardwareAdapter::new(i2c, relay)
    };
    #[cfg(not(target_os = "espidf"))]
    let mut hw = HardwareAdapter::new();

    let mut log_sink = LogEventSink::new();
    let time_adapter = Esp32TimeAdapter::new();

    // ── 4. Construct app service ──────────────────────────────
    let mut app = AppService::new(config.clone());
    app.subscribe_log(Box::new(SerialLogListener::new()));
    app.init_presets(&mut nvs, &mut log_sink);
    app.start(&mut log_sink);

    info!("System ready. Entering event loop.");

    // ── 5. Event loop ─────────────────────────────────────────
    //
    // The control tick and the slower sensor poll run on independent
    // fixed-period schedules, interleaved on this one thread. External
    // command sources (the web layer) call `AppService::handle_command`
    // between ticks and signal activity with `Event::CommandReceived`.
    let control_interval_ms = u64::from(config.control_interval_ms);
    let poll_every_ticks =
        u64::from(config.sensor_poll_interval_ms / config.control_interval_ms).max(1);
    let mut tick_counter: u64 = 0;

    loop {
        // Pace the loop on the FreeRTOS tick; on the host this stands in
        // for the hardware timer.
        std::thread::sleep(std::time::Duration::from_millis(control_interval_ms));
        tick_counter += 1;
        if tick_counter % poll_every_ticks == 0 {
            push_event(Event::SensorPoll);
        }
        push_event(Event::ControlTick);

        let now_ms = time_adapter.uptime_ms();
        events::drain_events(|event| match event {
            Event::SensorPoll => {
                app.poll_sensors(&mut hw, &mut log_sink);
            }
            Event::ControlTick => {
                app.tick(now_ms, &mut hw, &mut log_sink);
            }
            Event::CommandReceived => {
                // Commands mutate state synchronously in handle_command;
                // this event only wakes the loop so effects apply promptly.
            }
        });

        // Flush runtime configuration changes once per cycle.
        if app.config_dirty() {
            match nvs.save(&app.current_config()) {
                Ok(()) => app.mark_config_persisted(),
                Err(e) => warn!("config persist failed: {e}"),
            }
        }
    }
}
