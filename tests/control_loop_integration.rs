//! Integration tests: AppService → FSM → thermostat → heater relay.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use drybox::app::commands::{AppCommand, CommandResponse};
use drybox::app::events::AppEvent;
use drybox::app::ports::{EventSink, HeaterPort, SensorPort, StoragePort};
use drybox::app::service::{AppService, PRESETS_KEY, STORAGE_NAMESPACE};
use drybox::config::DryerConfig;
use drybox::error::{CommandError, Error, PersistenceError};
use drybox::eventlog::{LogListener, LogRecord, LogTag};
use drybox::fsm::context::ClimateSample;
use drybox::fsm::{Reason, StateId};

// ── Mock implementations ──────────────────────────────────────

struct MockHw {
    sample: Option<ClimateSample>,
    heater_on: bool,
    heater_calls: Vec<bool>,
}

impl MockHw {
    fn new() -> Self {
        Self {
            sample: None,
            heater_on: false,
            heater_calls: Vec::new(),
        }
    }

    fn set_climate(&mut self, temperature_c: f32, humidity_pct: f32) {
        self.sample = Some(ClimateSample {
            temperature_c,
            humidity_pct,
        });
    }

    fn fail_sensor(&mut self) {
        self.sample = None;
    }
}

impl SensorPort for MockHw {
    fn read_climate(&mut self) -> Option<ClimateSample> {
        self.sample
    }
}

impl HeaterPort for MockHw {
    fn set_heater(&mut self, on: bool) {
        self.heater_on = on;
        self.heater_calls.push(on);
    }

    fn is_heater_on(&self) -> bool {
        self.heater_on
    }
}

#[derive(Default)]
struct MockStorage {
    map: HashMap<String, Vec<u8>>,
}

impl StoragePort for MockStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, PersistenceError> {
        match self.map.get(&format!("{namespace}::{key}")) {
            Some(data) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            None => Err(PersistenceError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), PersistenceError> {
        self.map.insert(format!("{namespace}::{key}"), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), PersistenceError> {
        self.map.remove(&format!("{namespace}::{key}"));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.map.contains_key(&format!("{namespace}::{key}"))
    }
}

struct RecordingSink {
    events: Vec<AppEvent>,
}

impl RecordingSink {
    fn new() -> Self {
        Self { events: Vec::new() }
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

struct RecordingListener {
    records: Rc<RefCell<Vec<LogRecord>>>,
}

impl LogListener for RecordingListener {
    fn on_record(&mut self, record: &LogRecord) -> Result<(), &'static str> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}

// ── Harness ───────────────────────────────────────────────────

struct Harness {
    app: AppService,
    hw: MockHw,
    storage: MockStorage,
    sink: RecordingSink,
    now_ms: u64,
}

impl Harness {
    fn new() -> Self {
        let mut h = Self {
            app: AppService::new(DryerConfig::default()),
            hw: MockHw::new(),
            storage: MockStorage::default(),
            sink: RecordingSink::new(),
            now_ms: 0,
        };
        h.app.init_presets(&mut h.storage, &mut h.sink);
        h.app.start(&mut h.sink);
        h
    }

    /// Advance one second, ingest the current mock sample, run a tick.
    fn step(&mut self) {
        self.now_ms += 1000;
        self.app.poll_sensors(&mut self.hw, &mut self.sink);
        self.app.tick(self.now_ms, &mut self.hw, &mut self.sink);
    }

    fn command(&mut self, cmd: AppCommand) -> Result<CommandResponse, Error> {
        self.app
            .handle_command(self.now_ms, cmd, &mut self.hw, &mut self.storage, &mut self.sink)
    }

    fn enable(&mut self) {
        self.command(AppCommand::ToggleEnable).unwrap();
    }
}

// ── Dry mode ──────────────────────────────────────────────────

#[test]
fn dry_cycle_reaches_target() {
    let mut h = Harness::new();
    h.command(AppCommand::SetSetpointHumidity(30.0)).unwrap();
    h.hw.set_climate(25.0, 45.0);
    h.enable();

    let mut states = vec![h.app.state()];
    for humidity in [45.0, 40.0, 35.0, 30.0] {
        h.hw.set_climate(45.0, humidity);
        h.step();
        states.push(h.app.state());
    }

    assert_eq!(
        states,
        [
            StateId::Idle,
            StateId::Drying,
            StateId::Drying,
            StateId::Drying,
            StateId::Warming,
        ]
    );
    assert_eq!(h.app.last_reason(), Reason::TargetMet);
    assert_eq!(h.app.status_text(), "Dry / WARMING (Setpoint Reached)");
    assert!(h.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::StateChanged {
            to: StateId::Warming,
            reason: Reason::TargetMet,
            ..
        }
    )));
}

#[test]
fn zero_humidity_never_completes() {
    let mut h = Harness::new();
    h.command(AppCommand::SetSetpointHumidity(30.0)).unwrap();
    h.hw.set_climate(25.0, 45.0);
    h.enable();
    h.step();
    assert_eq!(h.app.state(), StateId::Drying);

    h.hw.set_climate(45.0, 0.0);
    for _ in 0..5 {
        h.step();
    }
    assert_eq!(h.app.state(), StateId::Drying);
}

#[test]
fn stall_overrides_setpoint_and_hysteresis_preserves_it() {
    let mut h = Harness::new();
    // One-second stall window so the test runs in a handful of ticks.
    h.command(AppCommand::SetStallInterval(1.0 / 60.0)).unwrap();
    h.command(AppCommand::SetStallDelta(0.5)).unwrap();
    h.command(AppCommand::SetSetpointHumidity(15.0)).unwrap();
    h.command(AppCommand::SetHumidityHysteresis(2.0)).unwrap();

    h.hw.set_climate(45.0, 45.0);
    h.enable();
    h.step(); // Idle -> Drying, window armed at 45.0

    // Barely any progress over the window: stall.
    h.hw.set_climate(45.0, 44.8);
    h.step();
    h.step();
    assert_eq!(h.app.state(), StateId::Warming);
    assert_eq!(h.app.last_reason(), Reason::Stalled);
    assert_eq!(h.app.status_text(), "Dry / WARMING (Stalled)");

    // Humidity creeps past stalled level + hysteresis: re-dry.
    h.hw.set_climate(45.0, 47.0);
    h.step();
    assert_eq!(h.app.state(), StateId::Drying);
    assert_eq!(h.app.last_reason(), Reason::Hysteresis);
    assert_eq!(h.app.status_text(), "Dry / RE-DRYING (Maintaining)");

    // The stalled level (44.8), not the configured 15.0, remains the
    // target: dropping back to it completes the run again.
    h.hw.set_climate(45.0, 44.7);
    h.step();
    assert_eq!(h.app.state(), StateId::Warming);
    assert_eq!(h.app.last_reason(), Reason::TargetMet);
}

#[test]
fn enabling_during_sensor_fault_does_not_false_stall() {
    let mut h = Harness::new();
    h.command(AppCommand::SetStallInterval(1.0 / 60.0)).unwrap();
    h.command(AppCommand::SetStallDelta(0.5)).unwrap();

    // Sensor is out when the run starts: Drying is entered blind.
    h.hw.fail_sensor();
    h.enable();
    h.step();
    assert_eq!(h.app.state(), StateId::Drying);

    // Sensor recovers and humidity falls fast: clear progress. The run
    // must keep drying toward the configured setpoint rather than judge
    // the drop against a reading that never existed.
    h.hw.set_climate(45.0, 45.0);
    h.step();
    h.hw.set_climate(45.0, 43.0);
    h.step();
    h.step();
    assert_eq!(h.app.state(), StateId::Drying);
    assert_ne!(h.app.last_reason(), Reason::Stalled);
}

// ── Heat mode ─────────────────────────────────────────────────

#[test]
fn heat_timer_expiry_falls_back_to_warming() {
    let mut h = Harness::new();
    h.command(AppCommand::SetMode(1)).unwrap();
    h.command(AppCommand::SetHeatDuration(0.001)).unwrap(); // 3.6 s
    h.command(AppCommand::SetHeatCompletion(1)).unwrap();
    h.hw.set_climate(30.0, 40.0);
    h.enable();

    h.step();
    assert_eq!(h.app.state(), StateId::Heating);
    assert_eq!(h.app.status_text(), "Heat / HEATING");

    for _ in 0..5 {
        h.step();
    }
    assert_eq!(h.app.state(), StateId::Warming);
    assert_eq!(h.app.last_reason(), Reason::TimerExpired);
    assert_eq!(h.app.status_text(), "Heat / WARMING (Time Expired)");

    // A timer-expiry warming never re-arms into drying, no matter how
    // humid the chamber gets.
    h.hw.set_climate(30.0, 99.0);
    for _ in 0..3 {
        h.step();
    }
    assert_eq!(h.app.state(), StateId::Warming);
}

#[test]
fn heat_timer_expiry_with_stop_action_disables() {
    let mut h = Harness::new();
    h.command(AppCommand::SetMode(1)).unwrap();
    h.command(AppCommand::SetHeatDuration(0.001)).unwrap();
    h.command(AppCommand::SetHeatCompletion(0)).unwrap();
    h.hw.set_climate(30.0, 40.0);
    h.enable();

    for _ in 0..6 {
        h.step();
    }
    assert_eq!(h.app.state(), StateId::Idle);
    assert_eq!(h.app.last_reason(), Reason::TimerExpired);
    assert_eq!(h.app.status_text(), "IDLE (Heat Stopped)");
    assert!(!h.hw.is_heater_on());
    // Re-enabling is required to start again.
    h.step();
    assert_eq!(h.app.state(), StateId::Idle);
}

// ── Enable / thermostat ───────────────────────────────────────

#[test]
fn disable_forces_idle_and_heater_off() {
    let mut h = Harness::new();
    h.hw.set_climate(25.0, 60.0); // cold: heater will engage
    h.enable();
    h.step();
    assert_eq!(h.app.state(), StateId::Drying);
    assert!(h.hw.is_heater_on());

    h.command(AppCommand::ToggleEnable).unwrap();
    assert_eq!(h.app.state(), StateId::Idle);
    assert!(!h.hw.is_heater_on());
    assert_eq!(h.app.last_reason(), Reason::UserAction);
}

#[test]
fn heater_respects_dead_band_through_service() {
    let mut h = Harness::new();
    h.command(AppCommand::SetDryingTemp(50.0)).unwrap();
    h.hw.set_climate(49.0, 60.0);
    h.enable();
    h.step();
    assert!(h.hw.is_heater_on());

    // Inside the dead band while on: stay on.
    h.hw.set_climate(50.5, 60.0);
    h.step();
    assert!(h.hw.is_heater_on());

    // Above target + band: off.
    h.hw.set_climate(51.5, 60.0);
    h.step();
    assert!(!h.hw.is_heater_on());

    // Back inside the band while off: stay off.
    h.hw.set_climate(50.5, 60.0);
    h.step();
    assert!(!h.hw.is_heater_on());

    // Relay writes happen on change only, never every tick.
    assert_eq!(h.hw.heater_calls, vec![true, false]);
}

#[test]
fn sensor_failure_is_safe_and_deduplicated() {
    let mut h = Harness::new();
    h.hw.set_climate(30.0, 60.0);
    h.enable();
    h.step();
    assert!(h.hw.is_heater_on());

    h.hw.fail_sensor();
    for _ in 0..4 {
        h.step();
    }
    // No valid temperature: heater forced off, state unchanged.
    assert!(!h.hw.is_heater_on());
    assert_eq!(h.app.state(), StateId::Drying);

    // Repeated failures collapse to one queued error message.
    let first = h.command(AppCommand::DrainMessage).unwrap();
    let CommandResponse::Message(Some(msg)) = first else {
        panic!("expected a queued message");
    };
    assert_eq!(msg.text, "Sensor read failed");
    let second = h.command(AppCommand::DrainMessage).unwrap();
    assert!(matches!(second, CommandResponse::Message(None)));
}

// ── Commands / configuration ──────────────────────────────────

#[test]
fn invalid_command_values_are_rejected_without_mutation() {
    let mut h = Harness::new();
    let before = h.app.current_config();

    assert!(matches!(
        h.command(AppCommand::SetMode(7)),
        Err(Error::Command(CommandError::BadRequest(_)))
    ));
    assert!(h.command(AppCommand::SetLogInterval(0.0)).is_err());
    assert!(h.command(AppCommand::SetDryingTemp(f32::NAN)).is_err());
    assert!(h.command(AppCommand::SetHeatCompletion(9)).is_err());

    assert_eq!(h.app.current_config(), before);
}

#[test]
fn mode_change_while_running_takes_effect_immediately() {
    let mut h = Harness::new();
    h.hw.set_climate(30.0, 60.0);
    h.enable();
    h.step();
    assert_eq!(h.app.state(), StateId::Drying);

    h.command(AppCommand::SetMode(2)).unwrap();
    assert_eq!(h.app.state(), StateId::Warming);
    assert_eq!(h.app.status_text(), "Warm / WARMING");

    // While disabled a mode change must not start anything.
    h.command(AppCommand::ToggleEnable).unwrap();
    h.command(AppCommand::SetMode(0)).unwrap();
    assert_eq!(h.app.state(), StateId::Idle);
}

#[test]
fn readings_snapshot_reflects_live_state() {
    let mut h = Harness::new();
    h.hw.set_climate(42.0, 33.0);
    h.enable();
    h.step();

    let CommandResponse::Readings(snap) = h.command(AppCommand::GetReadings).unwrap() else {
        panic!("expected readings");
    };
    assert_eq!(snap.temperature_c, Some(42.0));
    assert_eq!(snap.humidity_pct, Some(33.0));
    assert!(snap.enabled);
    assert!(!snap.logging);
    assert_eq!(snap.status, "Dry / DRYING");
}

// ── Presets ───────────────────────────────────────────────────

#[test]
fn factory_presets_seed_and_default_loads() {
    let mut h = Harness::new();
    let CommandResponse::Presets(list) = h.command(AppCommand::ListPresets).unwrap() else {
        panic!("expected preset list");
    };
    assert_eq!(list.len(), 2);
    assert!(list.iter().any(|p| p.name == "PLA" && p.is_default));
    assert!(list.iter().any(|p| p.name == "PETG" && !p.is_default));

    // The default preset's parameters were loaded into the live config.
    assert_eq!(h.app.current_config().drying_temp_c, 50.0);
    // Seeding also persisted the collection.
    assert!(h.storage.exists(STORAGE_NAMESPACE, PRESETS_KEY));
}

#[test]
fn preset_save_persists_and_survives_restart() {
    let mut h = Harness::new();
    h.command(AppCommand::SetDryingTemp(62.0)).unwrap();
    h.command(AppCommand::SavePreset {
        name: "ABS".into(),
        notes: "hot box".into(),
    })
    .unwrap();

    // Simulate a reboot against the same storage.
    let mut app2 = AppService::new(DryerConfig::default());
    let mut sink = RecordingSink::new();
    app2.init_presets(&mut h.storage, &mut sink);
    let mut hw = MockHw::new();
    let resp = app2
        .handle_command(0, AppCommand::LoadPreset("ABS".into()), &mut hw, &mut h.storage, &mut sink)
        .unwrap();
    assert!(matches!(resp, CommandResponse::Ack));
    assert_eq!(app2.current_config().drying_temp_c, 62.0);
}

#[test]
fn preset_load_resets_run_state() {
    let mut h = Harness::new();
    h.command(AppCommand::SetStallInterval(1.0 / 60.0)).unwrap();
    h.hw.set_climate(45.0, 45.0);
    h.enable();
    h.step();

    // Stall into an overridden setpoint, then load a preset: the override
    // must not survive into the new run.
    h.hw.set_climate(45.0, 44.9);
    h.step();
    h.step();
    assert_eq!(h.app.last_reason(), Reason::Stalled);

    h.command(AppCommand::LoadPreset("PLA".into())).unwrap();
    assert_eq!(h.app.state(), StateId::Drying);
    h.hw.set_climate(45.0, 44.0);
    h.step();
    // 44.0 is far above the PLA setpoint (15.0): no completion.
    assert_eq!(h.app.state(), StateId::Drying);
}

#[test]
fn preset_not_found_and_rename_errors() {
    let mut h = Harness::new();
    assert!(matches!(
        h.command(AppCommand::LoadPreset("NYLON".into())),
        Err(Error::Command(CommandError::PresetNotFound))
    ));
    assert!(h
        .command(AppCommand::RenamePreset {
            old_name: "PLA".into(),
            new_name: "PETG".into(),
        })
        .is_err());
    assert!(h
        .command(AppCommand::SetDefaultPreset("PETG".into()))
        .is_ok());

    let CommandResponse::Presets(list) = h.command(AppCommand::ListPresets).unwrap() else {
        panic!("expected preset list");
    };
    let defaults: Vec<_> = list.iter().filter(|p| p.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].name, "PETG");
}

#[test]
fn preset_download_returns_full_records() {
    let mut h = Harness::new();
    let CommandResponse::PresetsJson(json) = h.command(AppCommand::DownloadPresets).unwrap()
    else {
        panic!("expected JSON");
    };
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);
    assert!(parsed[0]["dryingTemp"].is_number());
}

// ── Process log ───────────────────────────────────────────────

#[test]
fn process_log_is_gated_and_records_lifecycle() {
    let records = Rc::new(RefCell::new(Vec::new()));
    let mut h = Harness::new();
    h.app.subscribe_log(Box::new(RecordingListener {
        records: Rc::clone(&records),
    }));

    // Nothing before StartLogging.
    h.hw.set_climate(25.0, 60.0);
    h.enable();
    h.step();
    assert!(records.borrow().is_empty());

    h.command(AppCommand::StartLogging).unwrap();
    assert!(matches!(records.borrow()[0].tag, LogTag::Header(_)));

    // Disabling produces a transition record and a heater-off record.
    h.command(AppCommand::ToggleEnable).unwrap();
    let tags: Vec<LogTag> = records.borrow().iter().map(|r| r.tag.clone()).collect();
    assert!(tags.contains(&LogTag::Status("IDLE")));
    assert!(tags.contains(&LogTag::HeatOff));

    // After StopLogging the emitter is silent again.
    h.command(AppCommand::StopLogging).unwrap();
    let count = records.borrow().len();
    h.enable();
    h.step();
    assert_eq!(records.borrow().len(), count);
}
