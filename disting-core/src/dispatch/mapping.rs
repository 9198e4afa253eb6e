use disting_types::{DispatchResult, Jack, PhysicalInput, PhysicalOutput};

use super::ActionError;
use crate::emulator::Emulator;
use crate::state::routing::create_default_mapping;
use crate::state::EngineState;

/// Wire (or unwire) a script input. Several script inputs may share a jack.
pub(super) fn assign_input(
    state: &mut EngineState,
    script: usize,
    physical: Option<usize>,
) -> Result<DispatchResult, ActionError> {
    if !(1..=state.schema.input_count()).contains(&script) {
        return Err(ActionError::ScriptInputOutOfRange(script));
    }
    let jack = match physical {
        Some(p) => Some(PhysicalInput::new(p).ok_or(ActionError::InputOutOfRange(p))?),
        None => None,
    };
    state.routing.inputs.set(script, jack);
    Ok(DispatchResult::persisted())
}

pub(super) fn assign_output(
    state: &mut EngineState,
    script: usize,
    physical: Option<usize>,
) -> Result<DispatchResult, ActionError> {
    if !(1..=state.schema.output_count()).contains(&script) {
        return Err(ActionError::ScriptOutputOutOfRange(script));
    }
    let jack = match physical {
        Some(p) => Some(PhysicalOutput::new(p).ok_or(ActionError::OutputOutOfRange(p))?),
        None => None,
    };
    state.routing.outputs.set(script, jack);
    Ok(DispatchResult::persisted())
}

pub(super) fn reset_mapping(emulator: &mut Emulator) -> Result<DispatchResult, ActionError> {
    if !emulator.has_script() {
        return Err(ActionError::NoScriptLoaded);
    }
    let state = emulator.state_mut();
    state.routing = create_default_mapping(state.schema.input_count(), state.schema.output_count());
    Ok(DispatchResult::persisted())
}
