//! The script contract and the sandbox boundary it runs behind.
//!
//! A [`Script`] is a schema plus a set of optional callbacks. Callbacks are
//! checked for presence before they are invoked; a script without `gate`
//! simply never sees gate edges. Scripts come from Rust closures (tests,
//! built-in demos) or from Rhai source via [`rhai_host`].

pub mod display;
pub mod rhai_host;
pub mod sandbox;

use std::fmt;

use disting_types::{ControlEvent, ScriptSchema};

pub use display::{DisplayList, DrawCommand, DISPLAY_HEIGHT, DISPLAY_WIDTH};
pub use rhai_host::{load_rhai_file, load_rhai_script};
pub use sandbox::Sandbox;

use crate::state::{ParameterAddressing, ParameterList};

/// Values a callback returns for its script outputs. `None` slots leave the
/// physical output untouched.
pub type OutputFrame = Vec<Option<f32>>;

pub type ScriptResult<T = ()> = Result<T, ScriptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptError {
    Compile(String),
    Runtime(String),
    InvalidReturn { callback: String, reason: String },
    Panicked(String),
    BudgetExceeded,
    Io(String),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Compile(msg) => write!(f, "compile error: {}", msg),
            ScriptError::Runtime(msg) => write!(f, "{}", msg),
            ScriptError::InvalidReturn { callback, reason } => {
                write!(f, "{}() returned {}", callback, reason)
            }
            ScriptError::Panicked(msg) => write!(f, "script panicked: {}", msg),
            ScriptError::BudgetExceeded => write!(f, "operation budget exceeded"),
            ScriptError::Io(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<std::io::Error> for ScriptError {
    fn from(e: std::io::Error) -> Self {
        ScriptError::Io(e.to_string())
    }
}

/// What a callback may touch while it runs.
pub struct ScriptContext<'a> {
    pub params: &'a mut ParameterList,
    pub addressing: ParameterAddressing,
    pub display: &'a mut DisplayList,
}

type StepFn = Box<dyn FnMut(&mut ScriptContext, f64, &[f32]) -> ScriptResult<Option<OutputFrame>>>;
type GateFn = Box<dyn FnMut(&mut ScriptContext, usize, bool) -> ScriptResult<Option<OutputFrame>>>;
type TriggerFn = Box<dyn FnMut(&mut ScriptContext, usize) -> ScriptResult<Option<OutputFrame>>>;
type DrawFn = Box<dyn FnMut(&mut ScriptContext) -> ScriptResult>;
type ControlFn = Box<dyn FnMut(&mut ScriptContext, ControlEvent) -> ScriptResult<Option<OutputFrame>>>;

/// A loaded script: the schema its `init()` declared plus its callbacks.
pub struct Script {
    name: String,
    schema: ScriptSchema,
    step: Option<StepFn>,
    gate: Option<GateFn>,
    trigger: Option<TriggerFn>,
    draw: Option<DrawFn>,
    control: Option<ControlFn>,
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("step", &self.step.is_some())
            .field("gate", &self.gate.is_some())
            .field("trigger", &self.trigger.is_some())
            .field("draw", &self.draw.is_some())
            .field("control", &self.control.is_some())
            .finish()
    }
}

impl Script {
    pub fn new(name: impl Into<String>, schema: ScriptSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            step: None,
            gate: None,
            trigger: None,
            draw: None,
            control: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &ScriptSchema {
        &self.schema
    }

    pub fn on_step(
        mut self,
        f: impl FnMut(&mut ScriptContext, f64, &[f32]) -> ScriptResult<Option<OutputFrame>> + 'static,
    ) -> Self {
        self.step = Some(Box::new(f));
        self
    }

    pub fn on_gate(
        mut self,
        f: impl FnMut(&mut ScriptContext, usize, bool) -> ScriptResult<Option<OutputFrame>> + 'static,
    ) -> Self {
        self.gate = Some(Box::new(f));
        self
    }

    pub fn on_trigger(
        mut self,
        f: impl FnMut(&mut ScriptContext, usize) -> ScriptResult<Option<OutputFrame>> + 'static,
    ) -> Self {
        self.trigger = Some(Box::new(f));
        self
    }

    pub fn on_draw(mut self, f: impl FnMut(&mut ScriptContext) -> ScriptResult + 'static) -> Self {
        self.draw = Some(Box::new(f));
        self
    }

    pub fn on_control(
        mut self,
        f: impl FnMut(&mut ScriptContext, ControlEvent) -> ScriptResult<Option<OutputFrame>> + 'static,
    ) -> Self {
        self.control = Some(Box::new(f));
        self
    }

    pub fn has_step(&self) -> bool {
        self.step.is_some()
    }

    pub fn has_gate(&self) -> bool {
        self.gate.is_some()
    }

    pub fn has_trigger(&self) -> bool {
        self.trigger.is_some()
    }

    pub fn has_draw(&self) -> bool {
        self.draw.is_some()
    }

    pub fn has_control(&self) -> bool {
        self.control.is_some()
    }

    // The callers below return Ok(None) for a missing callback. Use the
    // has_* checks to skip the sandbox entirely.

    pub fn step(&mut self, ctx: &mut ScriptContext, dt: f64, inputs: &[f32]) -> ScriptResult<Option<OutputFrame>> {
        match self.step.as_mut() {
            Some(f) => f(ctx, dt, inputs),
            None => Ok(None),
        }
    }

    pub fn gate(&mut self, ctx: &mut ScriptContext, input: usize, rising: bool) -> ScriptResult<Option<OutputFrame>> {
        match self.gate.as_mut() {
            Some(f) => f(ctx, input, rising),
            None => Ok(None),
        }
    }

    pub fn trigger(&mut self, ctx: &mut ScriptContext, input: usize) -> ScriptResult<Option<OutputFrame>> {
        match self.trigger.as_mut() {
            Some(f) => f(ctx, input),
            None => Ok(None),
        }
    }

    pub fn draw(&mut self, ctx: &mut ScriptContext) -> ScriptResult {
        match self.draw.as_mut() {
            Some(f) => f(ctx),
            None => Ok(()),
        }
    }

    pub fn control(&mut self, ctx: &mut ScriptContext, event: ControlEvent) -> ScriptResult<Option<OutputFrame>> {
        match self.control.as_mut() {
            Some(f) => f(ctx, event),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_callbacks_are_noops() {
        let mut script = Script::new("empty", ScriptSchema::default());
        let mut params = ParameterList::default();
        let mut display = DisplayList::new();
        let mut ctx = ScriptContext {
            params: &mut params,
            addressing: ParameterAddressing::default(),
            display: &mut display,
        };
        assert!(!script.has_step());
        assert_eq!(script.step(&mut ctx, 0.016, &[]), Ok(None));
        assert_eq!(script.gate(&mut ctx, 1, true), Ok(None));
        assert_eq!(script.draw(&mut ctx), Ok(()));
    }

    #[test]
    fn closures_keep_their_own_state() {
        let mut count = 0;
        let mut script = Script::new("counter", ScriptSchema::default()).on_trigger(move |_, _| {
            count += 1;
            Ok(Some(vec![Some(count as f32)]))
        });
        let mut params = ParameterList::default();
        let mut display = DisplayList::new();
        let mut ctx = ScriptContext {
            params: &mut params,
            addressing: ParameterAddressing::default(),
            display: &mut display,
        };
        script.trigger(&mut ctx, 1).unwrap();
        assert_eq!(script.trigger(&mut ctx, 1), Ok(Some(vec![Some(2.0)])));
    }

    #[test]
    fn errors_display_their_callback() {
        let err = ScriptError::InvalidReturn {
            callback: "step".to_string(),
            reason: "a string".to_string(),
        };
        assert_eq!(err.to_string(), "step() returned a string");
    }
}
