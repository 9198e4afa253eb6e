use serde::{Deserialize, Serialize};

use crate::channel::{ScriptInputType, ScriptOutputType};
use crate::param::ParamSpec;

/// One logical channel declared by a script. Its index is its 1-based
/// position in the schema's input or output list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptChannelSpec<K> {
    pub kind: K,
    pub name: Option<String>,
}

impl<K> ScriptChannelSpec<K> {
    pub fn new(kind: K) -> Self {
        Self { kind, name: None }
    }

    pub fn named(kind: K, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
        }
    }
}

/// Channel and parameter layout returned by a script's `init()`.
///
/// Immutable for the lifetime of a loaded script; replaced wholesale on reload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScriptSchema {
    pub inputs: Vec<ScriptChannelSpec<ScriptInputType>>,
    pub outputs: Vec<ScriptChannelSpec<ScriptOutputType>>,
    pub parameters: Vec<ParamSpec>,
}

impl ScriptSchema {
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Type of the 1-based script input.
    pub fn input_type(&self, index: usize) -> Option<ScriptInputType> {
        index
            .checked_sub(1)
            .and_then(|i| self.inputs.get(i))
            .map(|spec| spec.kind)
    }

    /// Type of the 1-based script output.
    pub fn output_type(&self, index: usize) -> Option<ScriptOutputType> {
        index
            .checked_sub(1)
            .and_then(|i| self.outputs.get(i))
            .map(|spec| spec.kind)
    }

    /// Display name of a 1-based script input, falling back to its type.
    pub fn input_name(&self, index: usize) -> String {
        let spec = index.checked_sub(1).and_then(|i| self.inputs.get(i));
        match spec {
            Some(ScriptChannelSpec { name: Some(name), .. }) => name.clone(),
            Some(spec) => format!("{} {}", spec.kind.name(), index),
            None => format!("Input {}", index),
        }
    }

    /// Display name of a 1-based script output, falling back to its index.
    pub fn output_name(&self, index: usize) -> String {
        let spec = index.checked_sub(1).and_then(|i| self.outputs.get(i));
        match spec {
            Some(ScriptChannelSpec { name: Some(name), .. }) => name.clone(),
            _ => format!("Output {}", index),
        }
    }
}
