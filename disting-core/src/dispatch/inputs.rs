use disting_types::{DispatchResult, Jack, PhysicalInput, Polarity};

use super::ActionError;
use crate::emulator::Emulator;
use crate::state::EngineState;

fn jack(input: usize) -> Result<PhysicalInput, ActionError> {
    PhysicalInput::new(input).ok_or(ActionError::InputOutOfRange(input))
}

pub(super) fn set_bpm(state: &mut EngineState, bpm: f64) -> DispatchResult {
    let stored = state.clock.set_bpm(bpm);
    log::debug!(target: "dispatch", "bpm {} -> {}", bpm, stored);
    DispatchResult::persisted()
}

/// Switching clock mode off re-arms the input's edge detector so the next
/// enable starts with a fresh rising edge.
pub(super) fn set_clock_enabled(
    state: &mut EngineState,
    input: usize,
    enabled: bool,
) -> Result<DispatchResult, ActionError> {
    let jack = jack(input)?;
    state.channels.input_mut(jack).mode.clock_enabled = enabled;
    if !enabled {
        state.edges.rearm(jack);
    }
    Ok(DispatchResult::persisted())
}

pub(super) fn set_polarity(
    state: &mut EngineState,
    input: usize,
    polarity: Polarity,
) -> Result<DispatchResult, ActionError> {
    let jack = jack(input)?;
    let channel = state.channels.input_mut(jack);
    channel.mode.polarity = polarity;
    channel.voltage = polarity.clamp(channel.voltage);
    Ok(DispatchResult::persisted())
}

pub(super) fn set_scaling(
    state: &mut EngineState,
    input: usize,
    scaling: f32,
) -> Result<DispatchResult, ActionError> {
    let jack = jack(input)?;
    state.channels.input_mut(jack).mode.set_scaling(scaling);
    Ok(DispatchResult::persisted())
}

pub(super) fn trigger_pulse(emulator: &mut Emulator, input: usize) -> Result<DispatchResult, ActionError> {
    let jack = jack(input)?;
    emulator.trigger_pulse(jack);
    Ok(DispatchResult::none())
}
