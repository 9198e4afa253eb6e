use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    clock: ClockConfig,
    #[serde(default)]
    trigger: TriggerConfig,
    #[serde(default)]
    script: ScriptConfig,
    #[serde(default)]
    osc: OscConfig,
    #[serde(default)]
    runtime: RuntimeConfig,
}

#[derive(Deserialize, Default)]
struct ClockConfig {
    default_bpm: Option<f64>,
    min_bpm: Option<f64>,
    max_bpm: Option<f64>,
}

#[derive(Deserialize, Default)]
struct TriggerConfig {
    pulse_ms: Option<u64>,
    fire_window_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct ScriptConfig {
    max_operations: Option<u64>,
    frame_budget_ms: Option<u64>,
    parameter_offset: Option<usize>,
}

#[derive(Deserialize, Default)]
struct OscConfig {
    enabled: Option<bool>,
    target: Option<String>,
    address: Option<String>,
}

#[derive(Deserialize, Default)]
struct RuntimeConfig {
    frame_rate: Option<u32>,
    notification_secs: Option<f64>,
}

/// Engine tuning derived from configuration. All values already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub default_bpm: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
    /// Seconds a trigger pulse stays high
    pub pulse_duration: f64,
    /// Seconds after a pulse during which `trigger()` may fire
    pub fire_window: f64,
    /// Rhai operation limit per callback (0 = unlimited)
    pub max_operations: u64,
    /// Wall-clock time a callback may take before a warning is raised
    pub frame_budget: Option<Duration>,
    /// Index correction for the script parameter API
    pub parameter_offset: usize,
    /// Seconds a notification stays visible
    pub notification_secs: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_bpm: 110.0,
            min_bpm: 20.0,
            max_bpm: 300.0,
            pulse_duration: 0.1,
            fire_window: 0.02,
            max_operations: 1_000_000,
            frame_budget: Some(Duration::from_millis(8)),
            parameter_offset: 0,
            notification_secs: 3.0,
        }
    }
}

/// Where and how output voltages are streamed over OSC.
#[derive(Debug, Clone, PartialEq)]
pub struct OscSettings {
    pub target: SocketAddr,
    pub address: String,
}

pub struct Config {
    file: ConfigFile,
}

impl Config {
    pub fn load() -> Self {
        let mut base = embedded();

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => merge(&mut base, user),
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config { file: base }
    }

    /// Built-in defaults overridden by a TOML document.
    pub fn from_overrides(contents: &str) -> Result<Self, toml::de::Error> {
        let mut base = embedded();
        merge(&mut base, toml::from_str(contents)?);
        Ok(Config { file: base })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let fallback = EngineSettings::default();
        let clock = &self.file.clock;

        let min_bpm = clock
            .min_bpm
            .filter(|v| v.is_finite())
            .unwrap_or(fallback.min_bpm)
            .clamp(1.0, 1000.0);
        let max_bpm = clock
            .max_bpm
            .filter(|v| v.is_finite())
            .unwrap_or(fallback.max_bpm)
            .clamp(min_bpm, 1000.0);
        let default_bpm = clock
            .default_bpm
            .filter(|v| v.is_finite())
            .unwrap_or(fallback.default_bpm)
            .clamp(min_bpm, max_bpm);

        let pulse_ms = self.file.trigger.pulse_ms.unwrap_or(100).clamp(1, 10_000);
        let window_ms = self
            .file
            .trigger
            .fire_window_ms
            .unwrap_or(20)
            .clamp(1, pulse_ms);

        let frame_budget = match self.file.script.frame_budget_ms {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => fallback.frame_budget,
        };

        EngineSettings {
            default_bpm,
            min_bpm,
            max_bpm,
            pulse_duration: pulse_ms as f64 / 1000.0,
            fire_window: window_ms as f64 / 1000.0,
            max_operations: self
                .file
                .script
                .max_operations
                .unwrap_or(fallback.max_operations),
            frame_budget,
            parameter_offset: self
                .file
                .script
                .parameter_offset
                .unwrap_or(fallback.parameter_offset),
            notification_secs: self
                .file
                .runtime
                .notification_secs
                .filter(|v| v.is_finite())
                .unwrap_or(fallback.notification_secs)
                .clamp(0.5, 60.0),
        }
    }

    /// OSC streaming target, or None when disabled or misconfigured.
    pub fn osc_settings(&self) -> Option<OscSettings> {
        let osc = &self.file.osc;
        if !osc.enabled.unwrap_or(false) {
            return None;
        }
        let target = osc.target.as_deref().unwrap_or("127.0.0.1:9000");
        let target = match target.parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(e) => {
                log::warn!(target: "config", "invalid osc target {:?}: {}", target, e);
                return None;
            }
        };
        let address = osc
            .address
            .clone()
            .filter(|a| a.starts_with('/'))
            .unwrap_or_else(|| "/disting/outputs".to_string());
        Some(OscSettings { target, address })
    }

    /// Frames per second the host loop should aim for (clamped to 1..240).
    pub fn frame_rate(&self) -> u32 {
        self.file.runtime.frame_rate.unwrap_or(60).clamp(1, 240)
    }
}

/// Directory for the emulator's config, state and log files.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("disting-emu")
}

/// Default location of the persisted engine state.
pub fn default_state_path() -> PathBuf {
    config_dir().join("state.json")
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("disting-emu").join("config.toml"))
}

fn embedded() -> ConfigFile {
    toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml")
}

fn merge(base: &mut ConfigFile, user: ConfigFile) {
    fn take<T>(base: &mut Option<T>, user: Option<T>) {
        if user.is_some() {
            *base = user;
        }
    }

    take(&mut base.clock.default_bpm, user.clock.default_bpm);
    take(&mut base.clock.min_bpm, user.clock.min_bpm);
    take(&mut base.clock.max_bpm, user.clock.max_bpm);
    take(&mut base.trigger.pulse_ms, user.trigger.pulse_ms);
    take(&mut base.trigger.fire_window_ms, user.trigger.fire_window_ms);
    take(&mut base.script.max_operations, user.script.max_operations);
    take(&mut base.script.frame_budget_ms, user.script.frame_budget_ms);
    take(&mut base.script.parameter_offset, user.script.parameter_offset);
    take(&mut base.osc.enabled, user.osc.enabled);
    take(&mut base.osc.target, user.osc.target);
    take(&mut base.osc.address, user.osc.address);
    take(&mut base.runtime.frame_rate, user.runtime.frame_rate);
    take(&mut base.runtime.notification_secs, user.runtime.notification_secs);
}
