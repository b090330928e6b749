//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (web UI,
//! serial console) that the [`AppService`](super::service::AppService)
//! interprets and acts upon. Numeric fields arrive in the units the UI
//! edits them in; the service converts to milliseconds internally.

use crate::config::DryerConfig;
use crate::messages::Message;
use crate::presets::PresetSummary;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Snapshot of readings, configuration, and derived status.
    GetReadings,

    SetDryingTemp(f32),
    SetSetpointHumidity(f32),
    SetWarmTemp(f32),
    SetHumidityHysteresis(f32),
    /// Minutes.
    SetStallInterval(f32),
    SetStallDelta(f32),
    /// 0 = Dry, 1 = Heat, 2 = Warm. Takes effect immediately when enabled.
    SetMode(u8),
    /// Hours.
    SetHeatDuration(f32),
    /// 0 = stop, 1 = fall back to warming.
    SetHeatCompletion(u8),
    /// Minutes, strictly positive.
    SetLogInterval(f32),

    /// Flip the master enable.
    ToggleEnable,

    StartLogging,
    StopLogging,

    ListPresets,
    LoadPreset(String),
    SavePreset { name: String, notes: String },
    DeletePreset(String),
    RenamePreset { old_name: String, new_name: String },
    SetDefaultPreset(String),
    /// Full preset collection as JSON, for download.
    DownloadPresets,

    /// Pop one queued web message.
    DrainMessage,
}

/// What the service hands back to the command's originator.
#[derive(Debug, Clone)]
pub enum CommandResponse {
    /// Command applied; nothing to return.
    Ack,
    Readings(ReadingsSnapshot),
    Presets(Vec<PresetSummary>),
    PresetsJson(String),
    /// `None` maps to an empty-queue response (HTTP 204) upstream.
    Message(Option<Message>),
}

/// Point-in-time view served to the web UI.
#[derive(Debug, Clone)]
pub struct ReadingsSnapshot {
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
    pub config: DryerConfig,
    pub status: &'static str,
    pub heater_on: bool,
    pub enabled: bool,
    pub logging: bool,
}
