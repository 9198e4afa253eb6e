//! The frame orchestrator.
//!
//! Every [`Emulator::tick`] runs the same fixed sequence:
//!
//! 1. advance the clock
//! 2. generate input voltages
//! 3. detect clock edges and fire `gate` / `trigger` (outputs committed as they return)
//! 4. apply parameter automation
//! 5. call `step` with freshly resolved script inputs
//! 6. zero unreachable outputs, then commit `step`'s outputs
//! 7. age trigger pulses
//!
//! Script faults never interrupt the sequence; a failed call just has no effect.

use std::fmt;
use std::path::{Path, PathBuf};

use disting_types::{
    ControlEvent, DispatchResult, EngineAction, Jack, PhysicalInput, PhysicalOutput,
    ScriptInputType, OUTPUT_COUNT,
};

use crate::config::EngineSettings;
use crate::dispatch::{dispatch_action, ActionError};
use crate::notify::Notifications;
use crate::output::OutputSink;
use crate::script::{
    load_rhai_file, DisplayList, OutputFrame, Script, ScriptContext, ScriptError, ScriptResult,
    Sandbox,
};
use crate::signal::{clock_states, compute_inputs};
use crate::state::routing::{
    commit_script_outputs, create_default_mapping, reset_unconnected_outputs, resolve_script_inputs,
};
use crate::state::{EngineState, ParameterList, PersistedState, StateStore};

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Script(ScriptError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "{}", e),
            LoadError::Script(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Script(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

impl From<ScriptError> for LoadError {
    fn from(e: ScriptError) -> Self {
        LoadError::Script(e)
    }
}

/// Frame `dt` as the loop may use it: non-finite or negative becomes 0.
pub fn sanitize_dt(dt: f64) -> f64 {
    if dt.is_finite() && dt > 0.0 {
        dt
    } else {
        0.0
    }
}

pub struct Emulator {
    settings: EngineSettings,
    state: EngineState,
    script: Option<Script>,
    script_path: Option<PathBuf>,
    sandbox: Sandbox,
    frames: u64,
}

impl Emulator {
    pub fn new(settings: EngineSettings) -> Self {
        let state = EngineState::new(&settings);
        let sandbox = Sandbox::new(settings.frame_budget);
        Self {
            settings,
            state,
            script: None,
            script_path: None,
            sandbox,
            frames: 0,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut EngineState {
        &mut self.state
    }

    pub fn script(&self) -> Option<&Script> {
        self.script.as_ref()
    }

    pub fn has_script(&self) -> bool {
        self.script.is_some()
    }

    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }

    pub fn params(&self) -> &ParameterList {
        &self.state.params
    }

    pub fn outputs(&self) -> &[f32; OUTPUT_COUNT] {
        self.state.channels.outputs()
    }

    pub fn output(&self, jack: PhysicalOutput) -> f32 {
        self.state.channels.output(jack)
    }

    pub fn input_voltage(&self, jack: PhysicalInput) -> f32 {
        self.state.channels.input_voltage(jack)
    }

    pub fn display(&self) -> &DisplayList {
        &self.state.display
    }

    pub fn notifications(&self) -> &Notifications {
        &self.state.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut Notifications {
        &mut self.state.notifications
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn elapsed(&self) -> f64 {
        self.state.elapsed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Swap in a new script between frames.
    ///
    /// The first load gets the default 1:1 mapping. A reload keeps wiring for
    /// script channels that still exist, drops channels beyond the new counts
    /// and gives new channels their default wiring. The parameter list is
    /// rebuilt from the new schema; automation links survive for parameter
    /// indices that still exist and their base values are re-captured.
    pub fn load_script(&mut self, script: Script) {
        let schema = script.schema().clone();
        let reload = self.script.is_some();

        self.state.routing = if reload {
            let old = &self.state.schema;
            crate::state::IoRouting {
                inputs: self
                    .state
                    .routing
                    .inputs
                    .rebased(old.input_count(), schema.input_count()),
                outputs: self
                    .state
                    .routing
                    .outputs
                    .rebased(old.output_count(), schema.output_count()),
            }
        } else {
            create_default_mapping(schema.input_count(), schema.output_count())
        };

        self.state.params = ParameterList::from_specs(&schema.parameters);
        self.state.automation.retain_valid(&mut self.state.params);
        self.state.display.clear();
        self.state.schema = schema;

        let verb = if reload { "Reloaded" } else { "Loaded" };
        let message = format!("{} {}", verb, script.name());
        log::info!(target: "engine", "{}", message);
        self.state.notifications.info(message, self.state.elapsed);
        self.script = Some(script);
    }

    /// Load (or reload) a Rhai script from disk. On failure the running
    /// script is left in place and an error notification is raised.
    pub fn load_script_file(&mut self, path: &Path) -> Result<(), LoadError> {
        match load_rhai_file(path, &self.settings) {
            Ok(script) => {
                self.script_path = Some(path.to_path_buf());
                self.load_script(script);
                Ok(())
            }
            Err(e) => {
                let message = format!("Failed to load {}: {}", path.display(), e);
                log::error!(target: "engine", "{}", message);
                self.state.notifications.error(message, self.state.elapsed);
                Err(LoadError::Script(e))
            }
        }
    }

    /// Reload the current script file from disk.
    pub fn reload(&mut self) -> Result<(), LoadError> {
        let path = self.script_path.clone().ok_or_else(|| {
            LoadError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no script file loaded",
            ))
        })?;
        self.load_script_file(&path)
    }

    /// Apply a persisted state. Each field is validated on its own; anything
    /// out of range is skipped and the engine default kept.
    pub fn restore(&mut self, saved: &PersistedState) {
        for (jack, mode) in PhysicalInput::all().into_iter().zip(saved.input_modes.iter()) {
            self.state.channels.input_mut(jack).mode = *mode;
        }
        self.state.clock.set_bpm(saved.clock_bpm);

        let schema = &self.state.schema;
        if !saved.input_assignments.is_empty() {
            for script in 1..=schema.input_count() {
                let jack = saved
                    .input_assignments
                    .get(&script)
                    .and_then(|p| PhysicalInput::new(*p));
                self.state.routing.inputs.set(script, jack);
            }
        }
        if !saved.output_assignments.is_empty() {
            for script in 1..=schema.output_count() {
                let jack = saved
                    .output_assignments
                    .get(&script)
                    .and_then(|p| PhysicalOutput::new(*p));
                self.state.routing.outputs.set(script, jack);
            }
        }

        for (name, value) in &saved.parameter_values {
            if let Some(index) = self.state.params.find(name) {
                self.state.params.set_value(index, *value);
            }
        }
        for (param, input) in &saved.parameter_automation {
            match PhysicalInput::new(*input) {
                Some(jack) if self.state.params.contains(*param) => {
                    self.state.automation.connect(&mut self.state.params, *param, jack);
                }
                _ => log::warn!(
                    target: "state",
                    "skipping automation link {} -> {}",
                    param,
                    input
                ),
            }
        }
        log::debug!(target: "state", "restored saved state");
    }

    pub fn to_persisted(&self) -> PersistedState {
        self.state.to_persisted(self.script_path.clone())
    }

    /// Write state to the store. Failures are logged and otherwise ignored.
    pub fn save_state(&self, store: &dyn StateStore) {
        if let Err(e) = store.save(&self.to_persisted()) {
            log::error!(target: "state", "failed to save state: {}", e);
        }
    }

    pub fn dispatch(&mut self, action: &EngineAction) -> Result<DispatchResult, ActionError> {
        dispatch_action(action, self)
    }

    /// Dispatch and save to `store` when the action changed persisted state.
    pub fn dispatch_with(
        &mut self,
        action: &EngineAction,
        store: &dyn StateStore,
    ) -> Result<DispatchResult, ActionError> {
        let result = dispatch_action(action, self)?;
        if result.persist {
            self.save_state(store);
        }
        Ok(result)
    }

    /// Run one frame.
    pub fn tick(&mut self, dt: f64) {
        let dt = sanitize_dt(dt);

        // AdvanceClock
        self.state.elapsed += dt;
        self.frames += 1;
        let now = self.state.elapsed;
        self.state.notifications.prune(now);

        // GenerateInputs
        let clock = self.state.clock;
        let modes = self.state.channels.input_modes();
        let trigger_mapped = self.state.trigger_mapped();
        let volts = compute_inputs(
            now,
            &clock,
            &modes,
            &trigger_mapped,
            &self.state.pulses.active_mask(),
        );
        self.state.channels.set_input_voltages(&volts);

        // DetectEdgesAndFireGateTrigger
        let (high, clocked) = clock_states(now, &clock, &modes);
        for edge in self.state.edges.detect(&high, &clocked) {
            for index in self.state.script_inputs_of(edge.input, ScriptInputType::Gate) {
                self.fire("gate", |script, ctx| script.gate(ctx, index, edge.rising));
            }
            if edge.rising {
                for index in self.state.script_inputs_of(edge.input, ScriptInputType::Trigger) {
                    self.fire("trigger", |script, ctx| script.trigger(ctx, index));
                }
            }
        }
        let due = self
            .state
            .pulses
            .take_due(now, self.settings.fire_window, dt);
        for input in due {
            for index in self.state.script_inputs_of(input, ScriptInputType::Trigger) {
                self.fire("trigger", |script, ctx| script.trigger(ctx, index));
            }
        }

        // RunAutomation
        self.state
            .automation
            .update(&mut self.state.params, &self.state.channels);

        // InvokeStep
        let inputs = resolve_script_inputs(
            self.state.schema.input_count(),
            &self.state.routing.inputs,
            &self.state.channels,
        );
        let stepped = if self.script.as_ref().is_some_and(Script::has_step) {
            self.invoke("step", |script, ctx| script.step(ctx, dt, &inputs))
        } else {
            None
        };

        // CommitOutputs
        reset_unconnected_outputs(
            self.state.schema.output_count(),
            &self.state.routing.outputs,
            &mut self.state.channels,
        );
        if let Some(frame) = stepped {
            self.commit(&frame);
        }

        // AgeTriggerPulses
        self.state.pulses.age(now, self.settings.pulse_duration);
    }

    /// Run one frame and hand the outputs to a sink.
    pub fn run_frame(&mut self, dt: f64, sink: &mut dyn OutputSink) {
        self.tick(dt);
        sink.send(self.outputs());
    }

    /// Re-render the display list through the script's `draw()`.
    pub fn draw(&mut self) {
        self.state.display.clear();
        if !self.script.as_ref().is_some_and(Script::has_draw) {
            return;
        }
        let Emulator {
            script,
            state,
            sandbox,
            ..
        } = self;
        let Some(script) = script.as_mut() else { return };
        let mut ctx = ScriptContext {
            params: &mut state.params,
            addressing: state.addressing,
            display: &mut state.display,
        };
        sandbox.safe_call("draw", &mut ctx, &mut state.notifications, state.elapsed, |ctx| {
            script.draw(ctx)
        });
    }

    /// Forward a hardware control gesture. Returns whether outputs changed.
    pub fn handle_control(&mut self, event: ControlEvent) -> bool {
        if !self.script.as_ref().is_some_and(Script::has_control) {
            return false;
        }
        let label = match event {
            ControlEvent::Button { .. } => "button",
            ControlEvent::Pot { .. } => "pot",
            ControlEvent::Encoder { .. } => "encoder",
        };
        match self.invoke(label, |script, ctx| script.control(ctx, event)) {
            Some(frame) => self.commit(&frame) > 0,
            None => false,
        }
    }

    /// Raise a trigger pulse on a physical input at the current engine time.
    pub fn trigger_pulse(&mut self, input: PhysicalInput) {
        let now = self.state.elapsed;
        self.state.pulses.fire(input, now);
        log::debug!(target: "engine", "trigger pulse on {} at {:.3}s", input, now);
    }

    /// Call a callback and commit whatever it returns.
    fn fire(
        &mut self,
        label: &str,
        call: impl FnOnce(&mut Script, &mut ScriptContext) -> ScriptResult<Option<OutputFrame>>,
    ) {
        if let Some(frame) = self.invoke(label, call) {
            self.commit(&frame);
        }
    }

    /// Run a callback in the sandbox. `None` for a missing script, a fault,
    /// or a callback that asked to leave outputs alone.
    fn invoke(
        &mut self,
        label: &str,
        call: impl FnOnce(&mut Script, &mut ScriptContext) -> ScriptResult<Option<OutputFrame>>,
    ) -> Option<OutputFrame> {
        let Emulator {
            script,
            state,
            sandbox,
            ..
        } = self;
        let script = script.as_mut()?;
        let mut ctx = ScriptContext {
            params: &mut state.params,
            addressing: state.addressing,
            display: &mut state.display,
        };
        sandbox
            .safe_call(label, &mut ctx, &mut state.notifications, state.elapsed, |ctx| {
                call(script, ctx)
            })
            .flatten()
    }

    /// Write a script output frame through the output mapping. Slots beyond
    /// the declared output count are ignored.
    fn commit(&mut self, frame: &[Option<f32>]) -> usize {
        let declared = self.state.schema.output_count();
        let frame = &frame[..frame.len().min(declared)];
        commit_script_outputs(frame, &self.state.routing.outputs, &mut self.state.channels)
    }
}
