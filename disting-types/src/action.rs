//! Actions a front-end sends to the engine.
//!
//! Indices are raw 1-based numbers as a UI produces them; the engine
//! validates them and rejects out-of-range values without touching state.

use crate::voltage::Polarity;

/// A hardware control gesture forwarded to the script.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    Button { index: u8, pressed: bool },
    /// Pot position in 0.0..=1.0
    Pot { index: u8, value: f32 },
    Encoder { index: u8, delta: i32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineAction {
    /// Wire a script input to a physical input (None = unassign)
    AssignInput { script: usize, physical: Option<usize> },
    /// Wire a script output to a physical output (None = unassign)
    AssignOutput { script: usize, physical: Option<usize> },
    /// Restore the 1:1 default mapping for the loaded script
    ResetMapping,
    ConnectParameter { param: usize, input: usize },
    DisconnectParameter { param: usize },
    SetParameter { param: usize, value: f32 },
    SetParameterNormalized { param: usize, value: f32 },
    SetBpm(f64),
    SetClockEnabled { input: usize, enabled: bool },
    SetPolarity { input: usize, polarity: Polarity },
    SetScaling { input: usize, scaling: f32 },
    TriggerPulse { input: usize },
    Control(ControlEvent),
}

impl EngineAction {
    /// Whether a successful dispatch of this action changes persisted state.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, EngineAction::TriggerPulse { .. } | EngineAction::Control(_))
    }
}

/// Side effects of a dispatched action for the caller to act on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchResult {
    /// State should be written to the persistence store
    pub persist: bool,
    /// Output voltages changed outside the frame loop
    pub outputs_changed: bool,
}

impl DispatchResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn persisted() -> Self {
        Self {
            persist: true,
            ..Self::default()
        }
    }
}
