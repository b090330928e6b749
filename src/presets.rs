//! Named parameter bundles.
//!
//! A preset is a full snapshot of [`DryerConfig`] plus a unique name,
//! free-form notes, and a default flag. The store keeps the collection in
//! memory; persistence is a JSON blob the caller reads from and writes to
//! storage. On-disk records use the web layer's field names and units
//! (minutes and hours rather than milliseconds).

use serde::{Deserialize, Serialize};

use crate::config::{DryerConfig, DryerMode, HeatCompletion};
use crate::error::{CommandError, Error, PersistenceError, Result};

/// One stored preset, internal representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    pub notes: String,
    pub is_default: bool,
    pub config: DryerConfig,
}

/// What `list` exposes: identity only, not the full configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresetSummary {
    pub name: String,
    #[serde(rename = "isDefault")]
    pub is_default: bool,
    pub notes: String,
}

/// Wire form of a preset as persisted and as served for download.
/// Intervals travel in the units the UI edits them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PresetRecord {
    name: String,
    notes: String,
    #[serde(rename = "isDefault")]
    is_default: bool,
    #[serde(rename = "dryingTemp")]
    drying_temp: f32,
    #[serde(rename = "setpointHum")]
    setpoint_hum: f32,
    #[serde(rename = "warmTemp")]
    warm_temp: f32,
    #[serde(rename = "humHyst")]
    hum_hyst: f32,
    /// Minutes.
    #[serde(rename = "stallInterval")]
    stall_interval: f32,
    #[serde(rename = "stallDelta")]
    stall_delta: f32,
    /// Hours.
    #[serde(rename = "heatDur")]
    heat_dur: f32,
    #[serde(rename = "heatAction")]
    heat_action: u8,
    /// Minutes.
    #[serde(rename = "logInt")]
    log_int: f32,
    mode: u8,
}

const MS_PER_MINUTE: f32 = 60_000.0;
const MS_PER_HOUR: f32 = 3_600_000.0;

impl PresetRecord {
    fn from_preset(preset: &Preset) -> Self {
        let c = &preset.config;
        Self {
            name: preset.name.clone(),
            notes: preset.notes.clone(),
            is_default: preset.is_default,
            drying_temp: c.drying_temp_c,
            setpoint_hum: c.setpoint_humidity,
            warm_temp: c.warm_temp_c,
            hum_hyst: c.humidity_hysteresis,
            stall_interval: c.stall_check_interval_ms as f32 / MS_PER_MINUTE,
            stall_delta: c.stall_humidity_delta,
            heat_dur: c.heat_duration_ms as f32 / MS_PER_HOUR,
            heat_action: preset.config.heat_completion as u8,
            log_int: c.log_interval_ms as f32 / MS_PER_MINUTE,
            mode: preset.config.mode as u8,
        }
    }

    fn into_preset(self) -> Preset {
        let mut config = DryerConfig::default();
        config.drying_temp_c = self.drying_temp;
        config.setpoint_humidity = self.setpoint_hum;
        config.warm_temp_c = self.warm_temp;
        config.humidity_hysteresis = self.hum_hyst;
        config.stall_check_interval_ms = (self.stall_interval * MS_PER_MINUTE) as u64;
        config.stall_humidity_delta = self.stall_delta;
        config.heat_duration_ms = (self.heat_dur * MS_PER_HOUR) as u64;
        config.heat_completion =
            HeatCompletion::from_index(self.heat_action).unwrap_or(config.heat_completion);
        config.log_interval_ms = (self.log_int * MS_PER_MINUTE) as u64;
        config.mode = DryerMode::from_index(self.mode).unwrap_or(config.mode);
        Preset {
            name: self.name,
            notes: self.notes,
            is_default: self.is_default,
            config,
        }
    }
}

#[derive(Default)]
pub struct PresetStore {
    presets: Vec<Preset>,
}

impl PresetStore {
    pub fn new() -> Self {
        Self {
            presets: Vec::new(),
        }
    }

    /// Restore the collection from a persisted JSON blob. On parse failure
    /// the in-memory collection is left untouched and the error surfaces to
    /// the caller.
    pub fn load_from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let records: Vec<PresetRecord> = serde_json::from_slice(bytes)
            .map_err(|_| Error::Persistence(PersistenceError::Corrupted))?;
        self.presets = records.into_iter().map(PresetRecord::into_preset).collect();
        Ok(())
    }

    /// Serialize the collection for persistence or download.
    pub fn to_json(&self) -> Result<String> {
        let records: Vec<PresetRecord> =
            self.presets.iter().map(PresetRecord::from_preset).collect();
        serde_json::to_string(&records)
            .map_err(|_| Error::Persistence(PersistenceError::IoError))
    }

    /// Seed the factory presets into an empty store and return the name of
    /// the designated default.
    pub fn seed_factory(&mut self) -> &'static str {
        let mut pla = DryerConfig::default();
        pla.drying_temp_c = 50.0;
        pla.warm_temp_c = 40.0;
        self.presets.push(Preset {
            name: String::from("PLA"),
            notes: String::from("Factory default for PLA filament"),
            is_default: true,
            config: pla,
        });

        let mut petg = DryerConfig::default();
        petg.drying_temp_c = 65.0;
        petg.warm_temp_c = 50.0;
        self.presets.push(Preset {
            name: String::from("PETG"),
            notes: String::from("Factory default for PETG filament"),
            is_default: false,
            config: petg,
        });

        "PLA"
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// Identity listing only; full configurations stay private to `load`.
    pub fn list(&self) -> Vec<PresetSummary> {
        self.presets
            .iter()
            .map(|p| PresetSummary {
                name: p.name.clone(),
                is_default: p.is_default,
                notes: p.notes.clone(),
            })
            .collect()
    }

    /// Fetch a preset's configuration by name.
    pub fn load(&self, name: &str) -> Result<DryerConfig> {
        self.find(name)
            .map(|p| p.config.clone())
            .ok_or(Error::Command(CommandError::PresetNotFound))
    }

    /// Configuration of the default preset, if one exists.
    pub fn default_config(&self) -> Option<(String, DryerConfig)> {
        self.presets
            .iter()
            .find(|p| p.is_default)
            .map(|p| (p.name.clone(), p.config.clone()))
    }

    /// Update an existing preset in place, or insert a new one.
    pub fn save(&mut self, name: &str, notes: &str, config: &DryerConfig) {
        match self.find_mut(name) {
            Some(existing) => {
                existing.notes = String::from(notes);
                existing.config = config.clone();
            }
            None => self.presets.push(Preset {
                name: String::from(name),
                notes: String::from(notes),
                is_default: false,
                config: config.clone(),
            }),
        }
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        let before = self.presets.len();
        self.presets.retain(|p| p.name != name);
        if self.presets.len() == before {
            return Err(Error::Command(CommandError::PresetNotFound));
        }
        Ok(())
    }

    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if new_name.is_empty() {
            return Err(Error::Command(CommandError::BadRequest(
                "preset name must not be empty",
            )));
        }
        if old_name != new_name && self.find(new_name).is_some() {
            return Err(Error::Command(CommandError::BadRequest(
                "preset name already in use",
            )));
        }
        match self.find_mut(old_name) {
            Some(preset) => {
                preset.name = String::from(new_name);
                Ok(())
            }
            None => Err(Error::Command(CommandError::PresetNotFound)),
        }
    }

    /// Mark `name` as the default, clearing the flag everywhere else first.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if self.find(name).is_none() {
            return Err(Error::Command(CommandError::PresetNotFound));
        }
        for preset in &mut self.presets {
            preset.is_default = preset.name == name;
        }
        Ok(())
    }

    fn find(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name == name)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Preset> {
        self.presets.iter_mut().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> PresetStore {
        let mut store = PresetStore::new();
        store.seed_factory();
        store
    }

    #[test]
    fn factory_seed_has_single_default() {
        let store = seeded();
        assert_eq!(store.len(), 2);
        let defaults: Vec<_> = store.list().into_iter().filter(|s| s.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].name, "PLA");
    }

    #[test]
    fn save_then_load_round_trips_config() {
        let mut store = seeded();
        let mut config = DryerConfig::default();
        config.drying_temp_c = 55.5;
        config.setpoint_humidity = 12.0;
        config.stall_check_interval_ms = 900_000;
        config.mode = DryerMode::Heat;

        store.save("ABS", "hot box", &config);
        // Loading another preset must not disturb the saved one.
        let _ = store.load("PETG").unwrap();
        let restored = store.load("ABS").unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn save_existing_name_updates_in_place() {
        let mut store = seeded();
        let mut config = DryerConfig::default();
        config.warm_temp_c = 42.0;
        store.save("PLA", "tweaked", &config);

        assert_eq!(store.len(), 2);
        assert_eq!(store.load("PLA").unwrap().warm_temp_c, 42.0);
        let summary = store
            .list()
            .into_iter()
            .find(|s| s.name == "PLA")
            .unwrap();
        assert_eq!(summary.notes, "tweaked");
        // Updating must not clear the default flag.
        assert!(summary.is_default);
    }

    #[test]
    fn load_unknown_name_fails() {
        let store = seeded();
        assert!(matches!(
            store.load("NYLON"),
            Err(Error::Command(CommandError::PresetNotFound))
        ));
    }

    #[test]
    fn set_default_is_exclusive() {
        let mut store = seeded();
        store.save("ABS", "", &DryerConfig::default());
        store.set_default("ABS").unwrap();

        let defaults: Vec<_> = store.list().into_iter().filter(|s| s.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].name, "ABS");
    }

    #[test]
    fn rename_rejects_missing_and_colliding_names() {
        let mut store = seeded();
        assert!(store.rename("NYLON", "TPU").is_err());
        assert!(store.rename("PLA", "PETG").is_err());

        store.rename("PETG", "PETG-CF").unwrap();
        assert!(store.load("PETG").is_err());
        assert!(store.load("PETG-CF").is_ok());
    }

    #[test]
    fn delete_removes_only_the_named_preset() {
        let mut store = seeded();
        store.delete("PETG").unwrap();
        assert_eq!(store.len(), 1);
        assert!(matches!(
            store.delete("PETG"),
            Err(Error::Command(CommandError::PresetNotFound))
        ));
    }

    #[test]
    fn json_round_trip_preserves_collection() {
        let mut store = seeded();
        let mut config = DryerConfig::default();
        config.heat_duration_ms = 2 * 3_600_000;
        config.heat_completion = HeatCompletion::Stop;
        store.save("ABS", "overnight", &config);

        let blob = store.to_json().unwrap();
        let mut restored = PresetStore::new();
        restored.load_from_bytes(blob.as_bytes()).unwrap();

        assert_eq!(restored.len(), 3);
        assert_eq!(restored.load("ABS").unwrap(), config);
        assert_eq!(restored.default_config().unwrap().0, "PLA");
    }

    #[test]
    fn wire_records_use_ui_field_names_and_units() {
        let mut store = PresetStore::new();
        let mut config = DryerConfig::default();
        config.stall_check_interval_ms = 30 * 60_000;
        config.heat_duration_ms = 4 * 3_600_000;
        config.log_interval_ms = 60_000;
        config.mode = DryerMode::Warm;
        store.save("CHECK", "", &config);

        let blob = store.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&blob).unwrap();
        let record = &parsed[0];
        assert_eq!(record["stallInterval"], 30.0);
        assert_eq!(record["heatDur"], 4.0);
        assert_eq!(record["logInt"], 1.0);
        assert_eq!(record["mode"], 2);
        assert_eq!(record["isDefault"], false);
        assert!(record["dryingTemp"].is_number());
    }

    #[test]
    fn corrupted_blob_leaves_memory_untouched() {
        let mut store = seeded();
        let err = store.load_from_bytes(b"{not json").unwrap_err();
        assert!(matches!(
            err,
            Error::Persistence(PersistenceError::Corrupted)
        ));
        assert_eq!(store.len(), 2);
    }
}
