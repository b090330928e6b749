//! Process log emitter.
//!
//! Emits structured records on state transitions, heater changes, and a
//! timed cadence — but only while logging has been explicitly started by
//! the user. Delivery is push-based fan-out to subscribed listeners (the
//! serial console in the base build; the web layer streams them over
//! WebSocket). One failing listener neither blocks the others nor stops
//! the emitter.

use log::warn;

use crate::config::DryerConfig;
use crate::fsm::context::ClimateSample;

/// What a log record is about.
#[derive(Debug, Clone, PartialEq)]
pub enum LogTag {
    /// A state-machine transition; carries the derived status text.
    Status(&'static str),
    /// Heater relay energised.
    HeatOn,
    /// Heater relay de-energised.
    HeatOff,
    /// Periodic emission on the configured cadence.
    Timed,
    /// One-shot configuration summary emitted when logging starts.
    Header(String),
}

impl LogTag {
    /// Wire text for the record's tag column.
    pub fn text(&self) -> String {
        match self {
            Self::Status(status) => format!("STATUS_{status}"),
            Self::HeatOn => String::from("HEAT_ON"),
            Self::HeatOff => String::from("HEAT_OFF"),
            Self::Timed => String::from("TIMED"),
            Self::Header(summary) => format!("CONFIG {summary}"),
        }
    }
}

/// One process log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Milliseconds since logging started.
    pub elapsed_ms: u64,
    pub tag: LogTag,
    /// Climate reading at emission time; `None` when the sensor was out.
    pub sample: Option<ClimateSample>,
}

impl LogRecord {
    /// Render the record in the wire format consumed by the web layer:
    /// `H:MM:SS,TAG,temp,humidity` with one decimal on both readings and
    /// `--.-` for an invalid sample.
    pub fn render(&self) -> String {
        let secs = self.elapsed_ms / 1000;
        let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
        let (temp, hum) = match self.sample {
            Some(sample) => (
                format!("{:.1}", sample.temperature_c),
                format!("{:.1}", sample.humidity_pct),
            ),
            None => (String::from("--.-"), String::from("--.-")),
        };
        format!("{h}:{m:02}:{s:02},{},{temp},{hum}", self.tag.text())
    }
}

/// Receives records pushed by the [`EventLog`].
pub trait LogListener {
    /// Deliver one record. Errors are logged and ignored — delivery is
    /// best-effort.
    fn on_record(&mut self, record: &LogRecord) -> Result<(), &'static str>;
}

/// The gated process log emitter.
pub struct EventLog {
    enabled: bool,
    start_ms: u64,
    /// Instant of the last timed emission.
    last_timed_ms: u64,
    listeners: Vec<Box<dyn LogListener>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            enabled: false,
            start_ms: 0,
            last_timed_ms: 0,
            listeners: Vec::new(),
        }
    }

    /// Register a listener. Listeners persist across start/stop cycles.
    pub fn subscribe(&mut self, listener: Box<dyn LogListener>) {
        self.listeners.push(listener);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start logging: capture the start instant, reset the timed-emission
    /// clock, and emit a header record summarizing the live configuration.
    pub fn start(&mut self, now_ms: u64, config: &DryerConfig, sample: Option<ClimateSample>) {
        self.enabled = true;
        self.start_ms = now_ms;
        self.last_timed_ms = now_ms;

        let summary = format!(
            "dry={:.1}C warm={:.1}C set={:.1}%RH hyst={:.1}%RH stall={}ms/{:.1}%RH heat={}ms mode={:?}",
            config.drying_temp_c,
            config.warm_temp_c,
            config.setpoint_humidity,
            config.humidity_hysteresis,
            config.stall_check_interval_ms,
            config.stall_humidity_delta,
            config.heat_duration_ms,
            config.mode,
        );
        self.emit(now_ms, LogTag::Header(summary), sample);
    }

    /// Stop logging. Subsequent events emit nothing until restarted.
    pub fn stop(&mut self) {
        self.enabled = false;
    }

    /// Record a state-machine transition.
    pub fn transition(
        &mut self,
        now_ms: u64,
        status: &'static str,
        sample: Option<ClimateSample>,
    ) {
        self.emit(now_ms, LogTag::Status(status), sample);
    }

    /// Record a heater output change.
    pub fn heater(&mut self, now_ms: u64, on: bool, sample: Option<ClimateSample>) {
        let tag = if on { LogTag::HeatOn } else { LogTag::HeatOff };
        self.emit(now_ms, tag, sample);
    }

    /// Timed emission: fires whenever the configured interval has elapsed
    /// since the last timed record, then re-arms from now.
    pub fn tick(&mut self, now_ms: u64, interval_ms: u64, sample: Option<ClimateSample>) {
        if !self.enabled {
            return;
        }
        if now_ms.saturating_sub(self.last_timed_ms) >= interval_ms {
            self.last_timed_ms = now_ms;
            self.emit(now_ms, LogTag::Timed, sample);
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn emit(&mut self, now_ms: u64, tag: LogTag, sample: Option<ClimateSample>) {
        if !self.enabled {
            return;
        }
        let record = LogRecord {
            elapsed_ms: now_ms.saturating_sub(self.start_ms),
            tag,
            sample,
        };
        for listener in &mut self.listeners {
            if let Err(e) = listener.on_record(&record) {
                warn!("log listener delivery failed: {e}");
            }
        }
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        records: Rc<RefCell<Vec<LogRecord>>>,
    }

    impl LogListener for Recorder {
        fn on_record(&mut self, record: &LogRecord) -> Result<(), &'static str> {
            self.records.borrow_mut().push(record.clone());
            Ok(())
        }
    }

    struct FailingListener;

    impl LogListener for FailingListener {
        fn on_record(&mut self, _record: &LogRecord) -> Result<(), &'static str> {
            Err("listener down")
        }
    }

    fn sample(t: f32, h: f32) -> Option<ClimateSample> {
        Some(ClimateSample {
            temperature_c: t,
            humidity_pct: h,
        })
    }

    fn logger_with_recorder() -> (EventLog, Rc<RefCell<Vec<LogRecord>>>) {
        let records = Rc::new(RefCell::new(Vec::new()));
        let mut log = EventLog::new();
        log.subscribe(Box::new(Recorder {
            records: Rc::clone(&records),
        }));
        (log, records)
    }

    #[test]
    fn emits_nothing_before_start() {
        let (mut log, records) = logger_with_recorder();
        log.transition(1000, "Dry / DRYING", sample(50.0, 40.0));
        log.heater(1000, true, sample(50.0, 40.0));
        log.tick(1000, 1, sample(50.0, 40.0));
        assert!(records.borrow().is_empty());
    }

    #[test]
    fn start_emits_header_record() {
        let (mut log, records) = logger_with_recorder();
        log.start(5000, &DryerConfig::default(), sample(25.0, 55.0));

        let records = records.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].elapsed_ms, 0);
        assert!(matches!(records[0].tag, LogTag::Header(_)));
        assert!(records[0].render().starts_with("0:00:00,CONFIG "));
    }

    #[test]
    fn timed_emission_follows_interval() {
        let (mut log, records) = logger_with_recorder();
        log.start(0, &DryerConfig::default(), sample(25.0, 55.0));

        log.tick(30_000, 60_000, sample(40.0, 50.0)); // not yet
        log.tick(60_000, 60_000, sample(45.0, 48.0)); // fires
        log.tick(90_000, 60_000, sample(48.0, 45.0)); // re-armed at 60s: not yet
        log.tick(120_000, 60_000, sample(50.0, 42.0)); // fires

        let timed: Vec<_> = records
            .borrow()
            .iter()
            .filter(|r| r.tag == LogTag::Timed)
            .cloned()
            .collect();
        assert_eq!(timed.len(), 2);
        assert_eq!(timed[0].elapsed_ms, 60_000);
        assert_eq!(timed[1].elapsed_ms, 120_000);
    }

    #[test]
    fn stop_gates_all_emission() {
        let (mut log, records) = logger_with_recorder();
        log.start(0, &DryerConfig::default(), None);
        log.stop();
        log.transition(1000, "IDLE", None);
        log.tick(120_000, 1000, None);
        assert_eq!(records.borrow().len(), 1); // header only
    }

    #[test]
    fn failing_listener_does_not_block_others() {
        let records = Rc::new(RefCell::new(Vec::new()));
        let mut log = EventLog::new();
        log.subscribe(Box::new(FailingListener));
        log.subscribe(Box::new(Recorder {
            records: Rc::clone(&records),
        }));

        log.start(0, &DryerConfig::default(), None);
        log.heater(500, true, sample(49.0, 30.0));
        assert_eq!(records.borrow().len(), 2);
    }

    #[test]
    fn record_render_format() {
        let record = LogRecord {
            elapsed_ms: 3_725_000, // 1h 2m 5s
            tag: LogTag::Timed,
            sample: sample(50.04, 29.96),
        };
        assert_eq!(record.render(), "1:02:05,TIMED,50.0,30.0");

        let heat = LogRecord {
            elapsed_ms: 65_000,
            tag: LogTag::HeatOn,
            sample: None,
        };
        assert_eq!(heat.render(), "0:01:05,HEAT_ON,--.-,--.-");

        let status = LogRecord {
            elapsed_ms: 0,
            tag: LogTag::Status("Dry / DRYING"),
            sample: sample(25.0, 60.0),
        };
        assert_eq!(status.render(), "0:00:00,STATUS_Dry / DRYING,25.0,60.0");
    }
}
