//! Saved engine state: wiring, automation, input modes, BPM and parameter
//! values, keyed so they survive a script reload.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use disting_types::{InputMode, Polarity, INPUT_COUNT};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedState {
    pub script_path: Option<PathBuf>,
    /// script input index -> physical input index
    pub input_assignments: BTreeMap<usize, usize>,
    /// script output index -> physical output index
    pub output_assignments: BTreeMap<usize, usize>,
    /// parameter index -> physical input index
    pub parameter_automation: BTreeMap<usize, usize>,
    pub input_modes: Vec<InputMode>,
    pub clock_bpm: f64,
    /// parameter name -> value (the base value for automated parameters)
    pub parameter_values: BTreeMap<String, f32>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            script_path: None,
            input_assignments: BTreeMap::new(),
            output_assignments: BTreeMap::new(),
            parameter_automation: BTreeMap::new(),
            input_modes: vec![InputMode::default(); INPUT_COUNT],
            clock_bpm: 110.0,
            parameter_values: BTreeMap::new(),
        }
    }
}

/// The persistence collaborator. `load` never fails: missing or corrupt
/// state is simply `None`.
pub trait StateStore {
    fn load(&self) -> Option<PersistedState>;
    fn save(&self, state: &PersistedState) -> io::Result<()>;
}

/// State kept as pretty-printed JSON on disk.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Option<PersistedState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    log::warn!(target: "state", "could not read {}: {}", self.path.display(), e);
                }
                return None;
            }
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(value) => parse_state(&value),
            Err(e) => {
                log::warn!(target: "state", "ignoring corrupt state {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save(&self, state: &PersistedState) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        log::debug!(target: "state", "saved state to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store, for tests and for running without a state file.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<PersistedState>>,
    saves: Mutex<usize>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            saves: Mutex::new(0),
        }
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Option<PersistedState> {
        self.state.lock().ok().and_then(|s| s.clone())
    }

    fn save(&self, state: &PersistedState) -> io::Result<()> {
        let mut slot = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "state lock poisoned"))?;
        *slot = Some(state.clone());
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}

/// Build a state from loosely-typed JSON. Each field is validated on its
/// own; anything missing or malformed falls back to its default.
pub fn parse_state(value: &Value) -> Option<PersistedState> {
    let obj = value.as_object()?;
    let defaults = PersistedState::default();

    let script_path = obj
        .get("script_path")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    let clock_bpm = obj
        .get("clock_bpm")
        .and_then(|v| v.as_f64())
        .filter(|v| v.is_finite())
        .unwrap_or(defaults.clock_bpm);

    let input_modes = match obj.get("input_modes").and_then(|v| v.as_array()) {
        Some(entries) => (0..INPUT_COUNT)
            .map(|i| entries.get(i).map(parse_input_mode).unwrap_or_default())
            .collect(),
        None => defaults.input_modes,
    };

    let parameter_values = obj
        .get("parameter_values")
        .and_then(|v| v.as_object())
        .map(|map| {
            map.iter()
                .filter_map(|(name, v)| {
                    v.as_f64()
                        .map(|f| f as f32)
                        .filter(|f| f.is_finite())
                        .map(|f| (name.clone(), f))
                })
                .collect()
        })
        .unwrap_or_default();

    Some(PersistedState {
        script_path,
        input_assignments: parse_index_map(obj.get("input_assignments")),
        output_assignments: parse_index_map(obj.get("output_assignments")),
        parameter_automation: parse_index_map(obj.get("parameter_automation")),
        input_modes,
        clock_bpm,
        parameter_values,
    })
}

fn parse_input_mode(value: &Value) -> InputMode {
    let clock_enabled = value
        .get("clock_enabled")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let polarity = value
        .get("polarity")
        .and_then(|v| v.as_str())
        .and_then(Polarity::parse)
        .unwrap_or_default();
    let scaling = value
        .get("scaling")
        .and_then(|v| v.as_f64())
        .map(|v| v as f32)
        .unwrap_or(1.0);
    InputMode::new(clock_enabled, polarity, scaling)
}

/// `{"1": 3, "2": 4}` -> {1: 3, 2: 4}. Entries with a non-numeric key or a
/// value below 1 are skipped; range checks against the jack counts happen
/// when the state is applied.
fn parse_index_map(value: Option<&Value>) -> BTreeMap<usize, usize> {
    let Some(map) = value.and_then(|v| v.as_object()) else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(key, v)| {
            let key = key.parse::<usize>().ok().filter(|k| *k >= 1)?;
            let target = v.as_u64().filter(|t| *t >= 1)? as usize;
            Some((key, target))
        })
        .collect()
}
