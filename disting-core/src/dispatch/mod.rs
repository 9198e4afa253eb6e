mod inputs;
mod mapping;
mod params;

use std::fmt;

use disting_types::{DispatchResult, EngineAction};

use crate::emulator::Emulator;

/// An action referenced something that does not exist. Nothing was changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    InputOutOfRange(usize),
    OutputOutOfRange(usize),
    ScriptInputOutOfRange(usize),
    ScriptOutputOutOfRange(usize),
    ParameterOutOfRange(usize),
    NoScriptLoaded,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::InputOutOfRange(i) => write!(f, "no physical input {}", i),
            ActionError::OutputOutOfRange(i) => write!(f, "no physical output {}", i),
            ActionError::ScriptInputOutOfRange(i) => write!(f, "script has no input {}", i),
            ActionError::ScriptOutputOutOfRange(i) => write!(f, "script has no output {}", i),
            ActionError::ParameterOutOfRange(i) => write!(f, "script has no parameter {}", i),
            ActionError::NoScriptLoaded => write!(f, "no script loaded"),
        }
    }
}

impl std::error::Error for ActionError {}

/// Apply a UI action to the engine. Invalid indices are rejected before any
/// state is touched; out-of-range values (BPM, scaling, parameter values)
/// are clamped instead.
pub fn dispatch_action(
    action: &EngineAction,
    emulator: &mut Emulator,
) -> Result<DispatchResult, ActionError> {
    let result = match action {
        EngineAction::AssignInput { script, physical } => {
            mapping::assign_input(emulator.state_mut(), *script, *physical)?
        }
        EngineAction::AssignOutput { script, physical } => {
            mapping::assign_output(emulator.state_mut(), *script, *physical)?
        }
        EngineAction::ResetMapping => mapping::reset_mapping(emulator)?,
        EngineAction::ConnectParameter { param, input } => {
            params::connect(emulator.state_mut(), *param, *input)?
        }
        EngineAction::DisconnectParameter { param } => {
            params::disconnect(emulator.state_mut(), *param)?
        }
        EngineAction::SetParameter { param, value } => {
            params::set_value(emulator.state_mut(), *param, *value)?
        }
        EngineAction::SetParameterNormalized { param, value } => {
            params::set_normalized(emulator.state_mut(), *param, *value)?
        }
        EngineAction::SetBpm(bpm) => inputs::set_bpm(emulator.state_mut(), *bpm),
        EngineAction::SetClockEnabled { input, enabled } => {
            inputs::set_clock_enabled(emulator.state_mut(), *input, *enabled)?
        }
        EngineAction::SetPolarity { input, polarity } => {
            inputs::set_polarity(emulator.state_mut(), *input, *polarity)?
        }
        EngineAction::SetScaling { input, scaling } => {
            inputs::set_scaling(emulator.state_mut(), *input, *scaling)?
        }
        EngineAction::TriggerPulse { input } => inputs::trigger_pulse(emulator, *input)?,
        EngineAction::Control(event) => {
            if !emulator.has_script() {
                return Err(ActionError::NoScriptLoaded);
            }
            let changed = emulator.handle_control(*event);
            DispatchResult {
                persist: false,
                outputs_changed: changed,
            }
        }
    };
    log::debug!(target: "dispatch", "{:?} -> {:?}", action, result);
    Ok(result)
}
