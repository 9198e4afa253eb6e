//! Synthetic input voltages.
//!
//! Each physical input is driven, in order of precedence, by the shared
//! clock (clock mode), a trigger pulse (inputs feeding a Trigger-typed
//! script input) or a slow sine (everything else). The sine is offset by
//! the jack index so the twelve CV inputs are visibly distinct.

use disting_types::{InputMode, Polarity, INPUT_COUNT};

use super::clock::Clock;

/// Volts a trigger pulse carries, before scaling.
pub const TRIGGER_HIGH_VOLTS: f32 = 10.0;

/// Synthetic CV for a 1-based physical input.
pub fn cv_voltage(elapsed: f64, physical_index: usize, mode: &InputMode) -> f32 {
    let sine = (elapsed + physical_index as f64).sin() as f32;
    let scaling = mode.scaling();
    match mode.polarity {
        Polarity::Bipolar => (5.0 * scaling * sine).clamp(-5.0, 5.0),
        Polarity::Unipolar => (scaling * (5.0 * sine + 5.0)).clamp(0.0, 10.0),
    }
}

/// Voltage of every physical input for this frame.
///
/// `trigger_mapped` flags inputs wired to a Trigger-typed script input and
/// `pulse_active` the inputs with a live trigger pulse. Results are not yet
/// clamped to the input polarity; the channel store does that on write.
pub fn compute_inputs(
    elapsed: f64,
    clock: &Clock,
    modes: &[InputMode; INPUT_COUNT],
    trigger_mapped: &[bool; INPUT_COUNT],
    pulse_active: &[bool; INPUT_COUNT],
) -> [f32; INPUT_COUNT] {
    std::array::from_fn(|slot| {
        let mode = &modes[slot];
        if mode.clock_enabled {
            clock.voltage(elapsed, mode.scaling())
        } else if trigger_mapped[slot] {
            if pulse_active[slot] {
                TRIGGER_HIGH_VOLTS * mode.scaling()
            } else {
                0.0
            }
        } else {
            cv_voltage(elapsed, slot + 1, mode)
        }
    })
}

/// High/low state of the shared clock for each clock-mode input.
pub fn clock_states(
    elapsed: f64,
    clock: &Clock,
    modes: &[InputMode; INPUT_COUNT],
) -> ([bool; INPUT_COUNT], [bool; INPUT_COUNT]) {
    let high = clock.is_high(elapsed);
    let clocked: [bool; INPUT_COUNT] = std::array::from_fn(|i| modes[i].clock_enabled);
    let states = std::array::from_fn(|i| clocked[i] && high);
    (states, clocked)
}
