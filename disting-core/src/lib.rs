//! # disting-core
//!
//! Signal routing and automation engine for the Disting NT emulator: the
//! twelve emulated inputs and eight outputs, the clock/gate/trigger
//! generator, script I/O mapping, CV parameter automation, the script
//! sandbox (with a Rhai host) and the frame loop tying them together.

pub mod config;
pub mod dispatch;
pub mod emulator;
pub mod notify;
pub mod output;
pub mod script;
pub mod signal;
pub mod state;

pub use config::{Config, EngineSettings, OscSettings};
pub use dispatch::{dispatch_action, ActionError};
pub use emulator::{Emulator, LoadError};
pub use notify::{Notification, NotificationLevel, Notifications};
pub use output::{NullSink, OscOutputSink, OutputSink, RecordingSink};
pub use script::{OutputFrame, Script, ScriptContext, ScriptError, ScriptResult};
pub use state::{JsonStateStore, MemoryStateStore, PersistedState, StateStore};
