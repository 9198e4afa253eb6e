//! Clock, gate and trigger generation for the emulated inputs.

pub mod clock;
pub mod edges;
pub mod generator;
pub mod trigger;

pub use clock::Clock;
pub use edges::{Edge, EdgeDetector};
pub use generator::{clock_states, compute_inputs, cv_voltage};
pub use trigger::{TriggerPulse, TriggerPulses};
