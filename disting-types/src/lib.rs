//! # disting-types
//!
//! Shared type definitions for the Disting NT emulator.
//! This crate holds the plain data the engine, the runner and any front-end
//! exchange: jack identifiers, the voltage domain, input modes, script
//! channel kinds, parameters and the actions that mutate the engine.

pub mod action;
mod channel;
mod param;
mod schema;
mod voltage;

pub use action::{ControlEvent, DispatchResult, EngineAction};
pub use channel::{InputMode, ScriptInputType, ScriptOutputType};
pub use param::{ParamKind, ParamSpec, ParamUnit, Parameter};
pub use schema::{ScriptChannelSpec, ScriptSchema};
pub use voltage::{clamp_output, Polarity, OUTPUT_MAX_VOLTS, OUTPUT_MIN_VOLTS};

/// Number of physical input jacks on the module.
pub const INPUT_COUNT: usize = 12;

/// Number of physical output jacks on the module.
pub const OUTPUT_COUNT: usize = 8;

/// A physical jack namespace with a fixed, 1-based index range.
pub trait Jack: Copy + Eq + Ord + std::fmt::Debug {
    /// Number of jacks in this namespace.
    const COUNT: usize;

    /// Validate a 1-based index.
    fn new(index: usize) -> Option<Self>;

    /// The 1-based index.
    fn get(self) -> usize;

    /// 0-based slot for array storage.
    fn slot(self) -> usize {
        self.get() - 1
    }

    /// Every jack in the namespace, in index order.
    fn all() -> Vec<Self> {
        (1..=Self::COUNT).filter_map(Self::new).collect()
    }
}

/// One of the 12 physical inputs. Always within 1..=12.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
)]
#[serde(transparent)]
pub struct PhysicalInput(u8);

impl Jack for PhysicalInput {
    const COUNT: usize = INPUT_COUNT;

    fn new(index: usize) -> Option<Self> {
        (1..=INPUT_COUNT).contains(&index).then_some(Self(index as u8))
    }

    fn get(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for PhysicalInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "In {}", self.0)
    }
}

/// One of the 8 physical outputs. Always within 1..=8.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
)]
#[serde(transparent)]
pub struct PhysicalOutput(u8);

impl Jack for PhysicalOutput {
    const COUNT: usize = OUTPUT_COUNT;

    fn new(index: usize) -> Option<Self> {
        (1..=OUTPUT_COUNT).contains(&index).then_some(Self(index as u8))
    }

    fn get(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for PhysicalOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Out {}", self.0)
    }
}
