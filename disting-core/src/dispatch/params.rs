use disting_types::{DispatchResult, Jack, PhysicalInput};

use super::ActionError;
use crate::state::EngineState;

fn check_param(state: &EngineState, param: usize) -> Result<(), ActionError> {
    if state.params.contains(param) {
        Ok(())
    } else {
        Err(ActionError::ParameterOutOfRange(param))
    }
}

pub(super) fn connect(
    state: &mut EngineState,
    param: usize,
    input: usize,
) -> Result<DispatchResult, ActionError> {
    check_param(state, param)?;
    let jack = PhysicalInput::new(input).ok_or(ActionError::InputOutOfRange(input))?;
    state.automation.connect(&mut state.params, param, jack);
    log::debug!(target: "dispatch", "parameter {} follows {}", param, jack);
    Ok(DispatchResult::persisted())
}

pub(super) fn disconnect(state: &mut EngineState, param: usize) -> Result<DispatchResult, ActionError> {
    check_param(state, param)?;
    if state.automation.disconnect(&mut state.params, param) {
        Ok(DispatchResult::persisted())
    } else {
        Ok(DispatchResult::none())
    }
}

/// A knob edit. On an automated parameter it moves the base value the CV
/// swings around; otherwise it sets the value directly.
pub(super) fn set_value(
    state: &mut EngineState,
    param: usize,
    value: f32,
) -> Result<DispatchResult, ActionError> {
    check_param(state, param)?;
    if !state.automation.set_base(&mut state.params, param, value) {
        state.params.set_value(param, value);
    }
    Ok(DispatchResult::persisted())
}

pub(super) fn set_normalized(
    state: &mut EngineState,
    param: usize,
    normalized: f32,
) -> Result<DispatchResult, ActionError> {
    check_param(state, param)?;
    let value = state
        .params
        .get(param)
        .map(|p| p.denormalize(normalized))
        .ok_or(ActionError::ParameterOutOfRange(param))?;
    set_value(state, param, value)
}
