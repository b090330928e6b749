//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the FSM, thermostat, process log, preset store,
//! and web message queue. It exposes a clean, hardware-agnostic API.
//! All I/O flows through port traits injected at call sites, making the
//! entire service testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │          AppService           │
//!  HeaterPort ◀── │  FSM · Thermostat · Presets   │ ◀─▶ StoragePort
//!                 └──────────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::{DryerConfig, DryerMode, HeatCompletion};
use crate::control::thermostat::Thermostat;
use crate::error::{CommandError, Error, Result};
use crate::eventlog::{EventLog, LogListener};
use crate::fsm::context::DryerContext;
use crate::fsm::states::{build_state_table, mode_start_state};
use crate::fsm::{Fsm, Reason, StateId};
use crate::messages::MessageQueue;
use crate::presets::PresetStore;

use super::commands::{AppCommand, CommandResponse, ReadingsSnapshot};
use super::events::AppEvent;
use super::ports::{EventSink, HeaterPort, SensorPort, StoragePort};

/// NVS namespace shared by all dryer records.
pub const STORAGE_NAMESPACE: &str = "drybox";
/// Key holding the serialized preset collection.
pub const PRESETS_KEY: &str = "presets";

const PRESET_BLOB_MAX: usize = 4096;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    fsm: Fsm,
    ctx: DryerContext,
    thermostat: Thermostat,
    event_log: EventLog,
    messages: MessageQueue,
    presets: PresetStore,
    tick_count: u64,
    config_dirty: bool,
    sensor_fault_active: bool,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM — call [`Self::start`] next.
    pub fn new(config: DryerConfig) -> Self {
        let ctx = DryerContext::new(config);
        let fsm = Fsm::new(build_state_table(), StateId::Idle);

        Self {
            fsm,
            ctx,
            thermostat: Thermostat::new(),
            event_log: EventLog::new(),
            messages: MessageQueue::new(),
            presets: PresetStore::new(),
            tick_count: 0,
            config_dirty: false,
            sensor_fault_active: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the FSM in Idle and emit the startup event.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("AppService started in {:?}", self.fsm.current_state());
    }

    /// Restore the preset collection from storage. With no persisted
    /// presets the factory set is seeded, persisted, and its default is
    /// loaded into the live configuration. A corrupt blob is reported and
    /// the in-memory collection (factory or previous) carries on.
    pub fn init_presets(&mut self, storage: &mut impl StoragePort, sink: &mut impl EventSink) {
        let mut buf = [0u8; PRESET_BLOB_MAX];
        if storage.exists(STORAGE_NAMESPACE, PRESETS_KEY) {
            match storage.read(STORAGE_NAMESPACE, PRESETS_KEY, &mut buf) {
                Ok(len) => {
                    if let Err(e) = self.presets.load_from_bytes(&buf[..len]) {
                        warn!("preset blob unreadable: {e}");
                        self.messages.error("Stored presets could not be parsed");
                        sink.emit(&AppEvent::PersistenceFailed("preset parse"));
                    }
                }
                Err(e) => {
                    warn!("preset blob read failed: {e}");
                    self.messages.error("Stored presets could not be read");
                    sink.emit(&AppEvent::PersistenceFailed("preset read"));
                }
            }
        }

        if self.presets.is_empty() {
            let default_name = self.presets.seed_factory();
            info!("seeded factory presets, default = {default_name}");
            self.persist_presets(storage, sink);
        }

        if let Some((name, config)) = self.presets.default_config() {
            info!("loading default preset '{name}'");
            self.ctx.config = config;
        }
    }

    /// Register a process log listener.
    pub fn subscribe_log(&mut self, listener: Box<dyn LogListener>) {
        self.event_log.subscribe(listener);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Ingest a climate sample on the sensor-poll cadence. A failed read
    /// surfaces as a deduplicated error message and clears the sample so
    /// downstream logic sees "no reading" rather than stale data.
    pub fn poll_sensors(&mut self, sensors: &mut impl SensorPort, sink: &mut impl EventSink) {
        match sensors.read_climate() {
            Some(sample) => {
                self.ctx.sample = Some(sample);
                if self.sensor_fault_active {
                    self.sensor_fault_active = false;
                    sink.emit(&AppEvent::SensorRecovered);
                }
            }
            None => {
                self.ctx.sample = None;
                self.messages.error("Sensor read failed");
                if !self.sensor_fault_active {
                    self.sensor_fault_active = true;
                    warn!("climate sensor returned no reading");
                    sink.emit(&AppEvent::SensorFault);
                }
            }
        }
    }

    /// Run one control cycle: FSM step, thermostat decision, heater
    /// actuation, and log emission. Side effects fire only on change.
    pub fn tick(&mut self, now_ms: u64, heater: &mut impl HeaterPort, sink: &mut impl EventSink) {
        self.tick_count += 1;
        self.ctx.now_ms = now_ms;
        let prev = self.fsm.current_state();

        // Master enable is the overriding input: off means Idle, always.
        let transition = if !self.ctx.enabled && prev != StateId::Idle {
            self.fsm
                .force_transition(StateId::Idle, Reason::UserAction, &mut self.ctx)
        } else {
            self.fsm.tick(&mut self.ctx)
        };

        if let Some(t) = transition {
            self.report_transition(prev, t.to, t.reason, sink);
        }

        self.apply_heater(heater, sink);
        self.event_log
            .tick(now_ms, self.ctx.config.log_interval_ms, self.ctx.sample);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (from the web layer or serial console).
    ///
    /// Validation failures reject the whole command with no partial
    /// mutation. Persistence failures are reported but never fatal.
    pub fn handle_command(
        &mut self,
        now_ms: u64,
        cmd: AppCommand,
        heater: &mut impl HeaterPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Result<CommandResponse> {
        self.ctx.now_ms = now_ms;

        match cmd {
            AppCommand::GetReadings => return Ok(CommandResponse::Readings(self.readings())),

            AppCommand::SetDryingTemp(v) => {
                self.ctx.config.drying_temp_c = validated(v, "drying temperature")?;
                self.config_dirty = true;
            }
            AppCommand::SetSetpointHumidity(v) => {
                self.ctx.config.setpoint_humidity = validated(v, "humidity setpoint")?;
                self.config_dirty = true;
            }
            AppCommand::SetWarmTemp(v) => {
                self.ctx.config.warm_temp_c = validated(v, "warm temperature")?;
                self.config_dirty = true;
            }
            AppCommand::SetHumidityHysteresis(v) => {
                self.ctx.config.humidity_hysteresis = validated(v, "humidity hysteresis")?;
                self.config_dirty = true;
            }
            AppCommand::SetStallInterval(minutes) => {
                let minutes = validated(minutes, "stall interval")?;
                self.ctx.config.stall_check_interval_ms = (minutes * 60_000.0) as u64;
                self.config_dirty = true;
            }
            AppCommand::SetStallDelta(v) => {
                self.ctx.config.stall_humidity_delta = validated(v, "stall delta")?;
                self.config_dirty = true;
            }
            AppCommand::SetHeatDuration(hours) => {
                let hours = validated(hours, "heat duration")?;
                self.ctx.config.heat_duration_ms = (hours * 3_600_000.0) as u64;
                self.config_dirty = true;
            }
            AppCommand::SetHeatCompletion(idx) => {
                self.ctx.config.heat_completion = HeatCompletion::from_index(idx).ok_or(
                    Error::Command(CommandError::BadRequest("heat action must be 0 or 1")),
                )?;
                self.config_dirty = true;
            }
            AppCommand::SetLogInterval(minutes) => {
                let minutes = validated(minutes, "log interval")?;
                if minutes <= 0.0 {
                    return Err(Error::Command(CommandError::BadRequest(
                        "log interval must be positive",
                    )));
                }
                self.ctx.config.log_interval_ms = (minutes * 60_000.0) as u64;
                self.config_dirty = true;
            }

            AppCommand::SetMode(idx) => {
                let mode = DryerMode::from_index(idx).ok_or(Error::Command(
                    CommandError::BadRequest("mode must be 0, 1, or 2"),
                ))?;
                self.ctx.config.mode = mode;
                self.config_dirty = true;
                // A mode change while running restarts the process in the
                // new mode's entry state right away.
                if self.ctx.enabled {
                    self.restart_in_mode(mode, heater, sink);
                }
            }

            AppCommand::ToggleEnable => {
                self.ctx.enabled = !self.ctx.enabled;
                info!("enable toggled -> {}", self.ctx.enabled);
                if !self.ctx.enabled {
                    let prev = self.fsm.current_state();
                    if let Some(t) =
                        self.fsm
                            .force_transition(StateId::Idle, Reason::UserAction, &mut self.ctx)
                    {
                        self.report_transition(prev, t.to, t.reason, sink);
                    }
                    self.apply_heater(heater, sink);
                }
                // Enabling takes effect on the next control tick.
            }

            AppCommand::StartLogging => {
                self.event_log
                    .start(now_ms, &self.ctx.config, self.ctx.sample);
            }
            AppCommand::StopLogging => self.event_log.stop(),

            AppCommand::ListPresets => return Ok(CommandResponse::Presets(self.presets.list())),
            AppCommand::LoadPreset(name) => {
                let config = self.presets.load(&name)?;
                self.ctx.config = config;
                self.config_dirty = true;
                // Derived run state belongs to the old parameters.
                self.ctx.dry_run_active = false;
                self.messages.info(format!("Preset '{name}' loaded"));
                if self.ctx.enabled {
                    self.restart_in_mode(self.ctx.config.mode, heater, sink);
                }
            }
            AppCommand::SavePreset { name, notes } => {
                if name.is_empty() {
                    return Err(Error::Command(CommandError::BadRequest(
                        "preset name must not be empty",
                    )));
                }
                self.presets.save(&name, &notes, &self.ctx.config);
                self.persist_presets(storage, sink);
            }
            AppCommand::DeletePreset(name) => {
                self.presets.delete(&name)?;
                self.persist_presets(storage, sink);
            }
            AppCommand::RenamePreset { old_name, new_name } => {
                self.presets.rename(&old_name, &new_name)?;
                self.persist_presets(storage, sink);
            }
            AppCommand::SetDefaultPreset(name) => {
                self.presets.set_default(&name)?;
                self.persist_presets(storage, sink);
            }
            AppCommand::DownloadPresets => {
                return Ok(CommandResponse::PresetsJson(self.presets.to_json()?));
            }

            AppCommand::DrainMessage => {
                return Ok(CommandResponse::Message(self.messages.pop()));
            }
        }

        Ok(CommandResponse::Ack)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Snapshot served to the web UI.
    pub fn readings(&self) -> ReadingsSnapshot {
        ReadingsSnapshot {
            temperature_c: self.ctx.temperature(),
            humidity_pct: self.ctx.humidity(),
            config: self.ctx.config.clone(),
            status: self.fsm.status_text(&self.ctx),
            heater_on: self.thermostat.is_on(),
            enabled: self.ctx.enabled,
            logging: self.event_log.is_enabled(),
        }
    }

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Reason for the most recent transition.
    pub fn last_reason(&self) -> Reason {
        self.fsm.last_reason()
    }

    /// Derived status text for the current state.
    pub fn status_text(&self) -> &'static str {
        self.fsm.status_text(&self.ctx)
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> DryerConfig {
        self.ctx.config.clone()
    }

    /// Queued web messages (for tests and diagnostics).
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// True while the configuration has unpersisted changes. Cleared by
    /// [`Self::mark_config_persisted`] once the main loop flushes it.
    pub fn config_dirty(&self) -> bool {
        self.config_dirty
    }

    pub fn mark_config_persisted(&mut self) {
        self.config_dirty = false;
    }

    // ── Internal ──────────────────────────────────────────────

    /// Force the FSM into `mode`'s entry state as a fresh run.
    fn restart_in_mode(
        &mut self,
        mode: DryerMode,
        heater: &mut impl HeaterPort,
        sink: &mut impl EventSink,
    ) {
        self.ctx.dry_run_active = false;
        self.ctx.warming_can_redry = false;
        let prev = self.fsm.current_state();
        let target = mode_start_state(mode);
        match self
            .fsm
            .force_transition(target, Reason::UserAction, &mut self.ctx)
        {
            Some(t) => self.report_transition(prev, t.to, t.reason, sink),
            // Already in the target state: restart it so entry bookkeeping
            // (stall window, effective setpoint, heat timer) starts fresh.
            None => self.fsm.reenter(Reason::UserAction, &mut self.ctx),
        }
        self.apply_heater(heater, sink);
    }

    /// Drive the relay from the thermostat decision; log only on change.
    fn apply_heater(&mut self, heater: &mut impl HeaterPort, sink: &mut impl EventSink) {
        let on = self.thermostat.decide(
            self.fsm.current_state(),
            &self.ctx.config,
            self.ctx.temperature(),
        );
        if on != heater.is_heater_on() {
            heater.set_heater(on);
            self.event_log.heater(self.ctx.now_ms, on, self.ctx.sample);
            sink.emit(&AppEvent::HeaterChanged(on));
        }
    }

    fn report_transition(
        &mut self,
        from: StateId,
        to: StateId,
        reason: Reason,
        sink: &mut impl EventSink,
    ) {
        let status = self.fsm.status_text(&self.ctx);
        info!("state {from:?} -> {to:?} ({reason:?}): {status}");
        self.event_log
            .transition(self.ctx.now_ms, status, self.ctx.sample);
        sink.emit(&AppEvent::StateChanged {
            from,
            to,
            reason,
            status,
        });
        if reason == Reason::TimerExpired {
            self.messages.info("Heat timer expired");
        } else if reason == Reason::Stalled {
            self.messages.warning("Drying stalled; holding at current humidity");
        }
    }

    fn persist_presets(&mut self, storage: &mut impl StoragePort, sink: &mut impl EventSink) {
        let blob = match self.presets.to_json() {
            Ok(blob) => blob,
            Err(e) => {
                warn!("preset serialization failed: {e}");
                sink.emit(&AppEvent::PersistenceFailed("preset serialize"));
                return;
            }
        };
        if let Err(e) = storage.write(STORAGE_NAMESPACE, PRESETS_KEY, blob.as_bytes()) {
            warn!("preset write failed: {e}");
            self.messages.error("Failed to save presets");
            sink.emit(&AppEvent::PersistenceFailed("preset write"));
        }
    }
}

/// Reject non-finite or negative parameter values before mutation.
fn validated(value: f32, what: &'static str) -> Result<f32> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::Command(CommandError::BadRequest(what)));
    }
    Ok(value)
}
