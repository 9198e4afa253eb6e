use disting_types::{ParamSpec, Parameter};

/// The loaded script's parameters, addressed by 1-based index.
///
/// Every setter funnels through [`Parameter::set_value`], so UI edits,
/// script calls and automation share one set of clamp/round rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterList {
    params: Vec<Parameter>,
}

impl ParameterList {
    pub fn from_specs(specs: &[ParamSpec]) -> Self {
        Self {
            params: specs.iter().map(Parameter::from_spec).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        (1..=self.params.len()).contains(&index)
    }

    pub fn get(&self, index: usize) -> Option<&Parameter> {
        index.checked_sub(1).and_then(|i| self.params.get(i))
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Parameter> {
        index.checked_sub(1).and_then(|i| self.params.get_mut(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn value(&self, index: usize) -> Option<f32> {
        self.get(index).map(Parameter::value)
    }

    /// Set a value; returns the stored (clamped) value.
    pub fn set_value(&mut self, index: usize, value: f32) -> Option<f32> {
        self.get_mut(index).map(|p| p.set_value(value))
    }

    pub fn normalized(&self, index: usize) -> Option<f32> {
        self.get(index).map(Parameter::normalized)
    }

    pub fn set_normalized(&mut self, index: usize, normalized: f32) -> Option<f32> {
        self.get_mut(index).map(|p| p.set_normalized(normalized))
    }

    /// 1-based index of the first parameter called `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name).map(|i| i + 1)
    }

    /// Live values in index order.
    pub fn values(&self) -> Vec<f32> {
        self.params.iter().map(Parameter::value).collect()
    }

    /// Put back values captured with [`ParameterList::values`].
    pub fn restore_values(&mut self, values: &[f32]) {
        for (param, value) in self.params.iter_mut().zip(values) {
            param.set_value(*value);
        }
    }
}

/// The parameter API as a script sees it.
///
/// Scripts address parameters as `(algorithm, index)`. The emulator hosts a
/// single algorithm (0), and the script's first parameter sits at
/// `1 + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParameterAddressing {
    pub offset: usize,
}

impl ParameterAddressing {
    pub const ALGORITHM: i64 = 0;

    pub fn new(offset: usize) -> Self {
        Self { offset }
    }

    /// Translate a script-side address into a list index.
    pub fn resolve(&self, algorithm: i64, parameter: i64) -> Option<usize> {
        if algorithm != Self::ALGORITHM || parameter < 1 {
            return None;
        }
        (parameter as usize).checked_sub(self.offset).filter(|i| *i >= 1)
    }

    /// Script-side parameter number for a list index.
    pub fn script_number(&self, index: usize) -> i64 {
        (index + self.offset) as i64
    }

    pub fn get(&self, params: &ParameterList, algorithm: i64, parameter: i64) -> Option<f32> {
        self.resolve(algorithm, parameter)
            .and_then(|i| params.value(i))
    }

    pub fn set(
        &self,
        params: &mut ParameterList,
        algorithm: i64,
        parameter: i64,
        value: f32,
    ) -> Option<f32> {
        self.resolve(algorithm, parameter)
            .and_then(|i| params.set_value(i, value))
    }

    pub fn get_normalized(&self, params: &ParameterList, algorithm: i64, parameter: i64) -> Option<f32> {
        self.resolve(algorithm, parameter)
            .and_then(|i| params.normalized(i))
    }

    pub fn set_normalized(
        &self,
        params: &mut ParameterList,
        algorithm: i64,
        parameter: i64,
        normalized: f32,
    ) -> Option<f32> {
        self.resolve(algorithm, parameter)
            .and_then(|i| params.set_normalized(i, normalized))
    }

    pub fn find(&self, params: &ParameterList, algorithm: i64, name: &str) -> Option<i64> {
        if algorithm != Self::ALGORITHM {
            return None;
        }
        params.find(name).map(|i| self.script_number(i))
    }
}
