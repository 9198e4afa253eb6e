#![allow(dead_code)]
//! Shared helpers for disting-core integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use disting_core::{EngineSettings, Emulator};
use disting_types::{
    ParamSpec, ParamUnit, ScriptChannelSpec, ScriptInputType, ScriptOutputType, ScriptSchema,
};

pub const FRAME: f64 = 1.0 / 60.0;

pub fn emulator() -> Emulator {
    Emulator::new(EngineSettings::default())
}

/// Schema with the given input kinds and `outputs` linear outputs.
pub fn schema(inputs: &[ScriptInputType], outputs: usize) -> ScriptSchema {
    ScriptSchema {
        inputs: inputs.iter().map(|k| ScriptChannelSpec::new(*k)).collect(),
        outputs: (0..outputs)
            .map(|_| ScriptChannelSpec::new(ScriptOutputType::Linear))
            .collect(),
        parameters: Vec::new(),
    }
}

pub fn float_param(name: &str, min: f32, max: f32, default: f32) -> ParamSpec {
    ParamSpec::Float {
        name: name.to_string(),
        min,
        max,
        default,
        unit: ParamUnit::None,
        scale: 10,
    }
}

/// Run frames until engine time reaches `seconds`.
pub fn run_for(emu: &mut Emulator, seconds: f64) {
    let target = emu.elapsed() + seconds;
    while emu.elapsed() + 1e-9 < target {
        emu.tick(FRAME);
    }
}

/// A shared log of callback invocations the test can inspect afterwards.
pub type CallLog<T> = Rc<RefCell<Vec<T>>>;

pub fn call_log<T>() -> CallLog<T> {
    Rc::new(RefCell::new(Vec::new()))
}
