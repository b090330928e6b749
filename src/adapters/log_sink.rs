//! Log-based sink adapters.
//!
//! [`LogEventSink`] implements [`EventSink`] by writing structured
//! application events to the ESP-IDF logger (UART / USB-CDC in
//! production). [`SerialLogListener`] does the same for process log
//! records. The web layer registers its own implementations of the same
//! traits.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::eventlog::{LogListener, LogRecord};

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged {
                from,
                to,
                reason,
                status,
            } => {
                info!("STATE | {:?} -> {:?} ({:?}) \"{}\"", from, to, reason, status);
            }
            AppEvent::HeaterChanged(on) => {
                info!("HEATER | {}", if *on { "ON" } else { "OFF" });
            }
            AppEvent::SensorFault => {
                info!("SENSOR | fault: no valid reading");
            }
            AppEvent::SensorRecovered => {
                info!("SENSOR | recovered");
            }
            AppEvent::PersistenceFailed(what) => {
                info!("STORE | operation failed: {}", what);
            }
        }
    }
}

/// Process-log listener that prints each record in its wire format.
pub struct SerialLogListener;

impl SerialLogListener {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SerialLogListener {
    fn default() -> Self {
        Self::new()
    }
}

impl LogListener for SerialLogListener {
    fn on_record(&mut self, record: &LogRecord) -> Result<(), &'static str> {
        info!("LOG | {}", record.render());
        Ok(())
    }
}
