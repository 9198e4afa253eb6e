pub mod automation;
pub mod channels;
pub mod parameters;
pub mod persistence;
pub mod routing;

pub use automation::AutomationMixer;
pub use channels::{ChannelStore, InputChannel};
pub use parameters::{ParameterAddressing, ParameterList};
pub use persistence::{JsonStateStore, MemoryStateStore, PersistedState, StateStore};
pub use routing::{IoAssignment, IoRouting};

use disting_types::{Jack, PhysicalInput, ScriptInputType, ScriptSchema, INPUT_COUNT};

use crate::config::EngineSettings;
use crate::notify::Notifications;
use crate::script::DisplayList;
use crate::signal::{Clock, EdgeDetector, TriggerPulses};

/// Everything the frame loop mutates, owned in one place.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub channels: ChannelStore,
    pub clock: Clock,
    pub edges: EdgeDetector,
    pub pulses: TriggerPulses,
    pub routing: IoRouting,
    pub params: ParameterList,
    pub automation: AutomationMixer,
    pub schema: ScriptSchema,
    pub addressing: ParameterAddressing,
    pub display: DisplayList,
    pub notifications: Notifications,
    /// Engine time in seconds; the clock's phase reference
    pub elapsed: f64,
}

impl EngineState {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            channels: ChannelStore::new(),
            clock: Clock::new(settings),
            edges: EdgeDetector::new(),
            pulses: TriggerPulses::new(),
            routing: IoRouting::default(),
            params: ParameterList::default(),
            automation: AutomationMixer::new(),
            schema: ScriptSchema::default(),
            addressing: ParameterAddressing::new(settings.parameter_offset),
            display: DisplayList::new(),
            notifications: Notifications::new(settings.notification_secs),
            elapsed: 0.0,
        }
    }

    /// Script inputs of `kind` wired to a physical input, in index order.
    pub fn script_inputs_of(&self, input: PhysicalInput, kind: ScriptInputType) -> Vec<usize> {
        self.routing
            .inputs
            .script_indices_for(input)
            .filter(|i| self.schema.input_type(*i) == Some(kind))
            .collect()
    }

    /// Physical inputs feeding at least one Trigger-typed script input.
    pub fn trigger_mapped(&self) -> [bool; INPUT_COUNT] {
        let mut mapped = [false; INPUT_COUNT];
        for (script, jack) in self.routing.inputs.iter() {
            if self.schema.input_type(script) == Some(ScriptInputType::Trigger) {
                mapped[jack.slot()] = true;
            }
        }
        mapped
    }

    /// Snapshot for the persistence store.
    pub fn to_persisted(&self, script_path: Option<std::path::PathBuf>) -> PersistedState {
        let parameter_values = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.base_value().unwrap_or(p.value())))
            .collect();
        PersistedState {
            script_path,
            input_assignments: self.routing.inputs.to_raw(),
            output_assignments: self.routing.outputs.to_raw(),
            parameter_automation: self.automation.to_raw(),
            input_modes: self.channels.input_modes().to_vec(),
            clock_bpm: self.clock.bpm(),
            parameter_values,
        }
    }
}
