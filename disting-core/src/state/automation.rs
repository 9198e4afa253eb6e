//! CV automation of script parameters.
//!
//! A linked parameter keeps the user's manual setting in `base_value`; each
//! frame the linked input's voltage is normalized and applied as an offset
//! around that base. Normalization divides by [`AUTOMATION_DIVISOR`], so a
//! bipolar input swings ±0.5 of the parameter range and a unipolar input
//! 0..1 of it. Disconnecting restores the base value.

use std::collections::BTreeMap;

use disting_types::{Jack, ParamKind, Parameter, PhysicalInput};

use super::channels::ChannelStore;
use super::parameters::ParameterList;

/// Volts per unit of normalized automation offset.
pub const AUTOMATION_DIVISOR: f32 = 10.0;

pub fn normalize_voltage(volts: f32) -> f32 {
    if volts.is_finite() {
        volts / AUTOMATION_DIVISOR
    } else {
        0.0
    }
}

/// Value a parameter takes for a given base and normalized offset.
pub fn automated_value(param: &Parameter, base: f32, normalized: f32) -> f32 {
    match &param.kind {
        ParamKind::Enum { .. } => {
            let count = param.value_count().unwrap_or(1) as f32;
            let delta = (normalized * (count - 1.0) + 0.5).floor();
            param.sanitize(base + delta)
        }
        ParamKind::Integer | ParamKind::Float { .. } => {
            let offset = normalized * (param.max() - param.min());
            param.sanitize(base + offset)
        }
    }
}

/// Links from 1-based parameter index to the physical input driving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutomationMixer {
    links: BTreeMap<usize, PhysicalInput>,
}

impl AutomationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&self, param: usize) -> Option<PhysicalInput> {
        self.links.get(&param).copied()
    }

    pub fn is_automated(&self, param: usize) -> bool {
        self.links.contains_key(&param)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, PhysicalInput)> + '_ {
        self.links.iter().map(|(p, j)| (*p, *j))
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Link a parameter to an input, capturing its value as the base if it
    /// has none yet. Returns false if the parameter does not exist.
    pub fn connect(&mut self, params: &mut ParameterList, param: usize, input: PhysicalInput) -> bool {
        let Some(p) = params.get_mut(param) else {
            return false;
        };
        if p.base_value().is_none() {
            let current = p.value();
            p.set_base_value(Some(current));
        }
        self.links.insert(param, input);
        true
    }

    /// Remove a link and restore the parameter to its base value.
    /// Returns false if the parameter was not automated.
    pub fn disconnect(&mut self, params: &mut ParameterList, param: usize) -> bool {
        if self.links.remove(&param).is_none() {
            return false;
        }
        if let Some(p) = params.get_mut(param) {
            if let Some(base) = p.base_value() {
                p.set_value(base);
            }
            p.set_base_value(None);
        }
        true
    }

    /// Move the centre an automated parameter is modulated around.
    /// Returns false if the parameter is not automated.
    pub fn set_base(&mut self, params: &mut ParameterList, param: usize, value: f32) -> bool {
        if !self.links.contains_key(&param) {
            return false;
        }
        match params.get_mut(param) {
            Some(p) => {
                p.set_base_value(Some(value));
                true
            }
            None => false,
        }
    }

    /// Apply every link from the current input voltages. Runs once per frame,
    /// after inputs are generated and before the script's `step`.
    pub fn update(&self, params: &mut ParameterList, channels: &ChannelStore) {
        for (param, input) in &self.links {
            let Some(p) = params.get_mut(*param) else { continue };
            let base = match p.base_value() {
                Some(base) => base,
                None => {
                    let current = p.value();
                    p.set_base_value(Some(current));
                    current
                }
            };
            let normalized = normalize_voltage(channels.input_voltage(*input));
            let next = automated_value(p, base, normalized);
            p.set_value(next);
        }
    }

    /// Drop links whose parameter no longer exists and (re)capture bases.
    pub fn retain_valid(&mut self, params: &mut ParameterList) {
        self.links.retain(|param, _| params.contains(*param));
        for param in self.links.keys() {
            if let Some(p) = params.get_mut(*param) {
                if p.base_value().is_none() {
                    let current = p.value();
                    p.set_base_value(Some(current));
                }
            }
        }
    }

    /// Raw `(parameter, input)` pairs, for persistence.
    pub fn to_raw(&self) -> BTreeMap<usize, usize> {
        self.links.iter().map(|(p, j)| (*p, j.get())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disting_types::{ParamSpec, ParamUnit, INPUT_COUNT};

    fn input(i: usize) -> PhysicalInput {
        PhysicalInput::new(i).unwrap()
    }

    fn params() -> ParameterList {
        ParameterList::from_specs(&[
            ParamSpec::Float {
                name: "Level".to_string(),
                min: 0.0,
                max: 100.0,
                default: 50.0,
                unit: ParamUnit::Percent,
                scale: 10,
            },
            ParamSpec::Integer {
                name: "Steps".to_string(),
                min: 0,
                max: 10,
                default: 5,
                unit: ParamUnit::None,
            },
            ParamSpec::Enum {
                name: "Shape".to_string(),
                values: ["A", "B", "C", "D", "E"].iter().map(|s| s.to_string()).collect(),
                default: 2,
            },
        ])
    }

    fn channels_with(jack: usize, volts: f32) -> ChannelStore {
        let mut channels = ChannelStore::new();
        let mut all = [0.0; INPUT_COUNT];
        all[jack - 1] = volts;
        channels.set_input_voltages(&all);
        channels
    }

    #[test]
    fn normalization_divides_by_ten() {
        assert!((normalize_voltage(2.5) - 0.25).abs() < 1e-6);
        assert!((normalize_voltage(-5.0) + 0.5).abs() < 1e-6);
        assert_eq!(normalize_voltage(f32::NAN), 0.0);
    }

    #[test]
    fn float_offset_around_base() {
        let mut params = params();
        let mut mixer = AutomationMixer::new();
        assert!(mixer.connect(&mut params, 1, input(1)));
        assert_eq!(params.get(1).unwrap().base_value(), Some(50.0));

        mixer.update(&mut params, &channels_with(1, 2.5));
        assert!((params.value(1).unwrap() - 75.0).abs() < 1e-4);

        mixer.update(&mut params, &channels_with(1, 5.0));
        assert_eq!(params.value(1), Some(100.0));

        mixer.update(&mut params, &channels_with(1, -5.0));
        assert!((params.value(1).unwrap() - 0.0).abs() < 1e-4);
    }

    #[test]
    fn float_offset_is_clamped() {
        let mut params = params();
        params.set_value(1, 90.0);
        let mut mixer = AutomationMixer::new();
        mixer.connect(&mut params, 1, input(1));
        mixer.update(&mut params, &channels_with(1, 2.5));
        assert_eq!(params.value(1), Some(100.0));
    }

    #[test]
    fn integer_offset_rounds() {
        let mut params = params();
        let mut mixer = AutomationMixer::new();
        mixer.connect(&mut params, 2, input(2));
        // 1.3V -> 0.13 * 10 = 1.3 -> 6.3 -> 6
        mixer.update(&mut params, &channels_with(2, 1.3));
        assert_eq!(params.value(2), Some(6.0));
        // 1.6V -> 6.6 -> 7
        mixer.update(&mut params, &channels_with(2, 1.6));
        assert_eq!(params.value(2), Some(7.0));
    }

    #[test]
    fn enum_offset_is_an_index_delta() {
        let mut params = params();
        let mut mixer = AutomationMixer::new();
        mixer.connect(&mut params, 3, input(3));
        // 0.25 * 4 + 0.5 = 1.5 -> 1 step from index 2
        mixer.update(&mut params, &channels_with(3, 2.5));
        assert_eq!(params.value(3), Some(3.0));
        // 0.5 * 4 + 0.5 = 2.5 -> 2 steps
        mixer.update(&mut params, &channels_with(3, 5.0));
        assert_eq!(params.value(3), Some(4.0));
        // -0.5 * 4 + 0.5 = -1.5 -> -2 steps, clamped to 1
        mixer.update(&mut params, &channels_with(3, -5.0));
        assert_eq!(params.value(3), Some(1.0));
    }

    #[test]
    fn disconnect_restores_base() {
        let mut params = params();
        let mut mixer = AutomationMixer::new();
        mixer.connect(&mut params, 1, input(4));
        mixer.update(&mut params, &channels_with(4, 2.0));
        assert!((params.value(1).unwrap() - 70.0).abs() < 1e-4);

        assert!(mixer.disconnect(&mut params, 1));
        assert_eq!(params.value(1), Some(50.0));
        assert_eq!(params.get(1).unwrap().base_value(), None);
        assert!(!mixer.disconnect(&mut params, 1));
    }

    #[test]
    fn reconnect_keeps_original_base() {
        let mut params = params();
        let mut mixer = AutomationMixer::new();
        mixer.connect(&mut params, 1, input(1));
        mixer.update(&mut params, &channels_with(1, 3.0));
        // re-link to another jack while automated: base stays 50
        mixer.connect(&mut params, 1, input(2));
        assert_eq!(params.get(1).unwrap().base_value(), Some(50.0));
        assert_eq!(mixer.link(1), Some(input(2)));
    }

    #[test]
    fn set_base_moves_the_centre() {
        let mut params = params();
        let mut mixer = AutomationMixer::new();
        assert!(!mixer.set_base(&mut params, 1, 20.0));
        mixer.connect(&mut params, 1, input(1));
        assert!(mixer.set_base(&mut params, 1, 20.0));
        mixer.update(&mut params, &channels_with(1, 1.0));
        assert!((params.value(1).unwrap() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn connect_rejects_missing_parameter() {
        let mut params = params();
        let mut mixer = AutomationMixer::new();
        assert!(!mixer.connect(&mut params, 9, input(1)));
        assert!(mixer.is_empty());
    }

    #[test]
    fn retain_valid_drops_stale_links() {
        let mut params = params();
        let mut mixer = AutomationMixer::new();
        mixer.connect(&mut params, 1, input(1));
        mixer.connect(&mut params, 3, input(2));

        let mut shorter = ParameterList::from_specs(&[ParamSpec::Integer {
            name: "Only".to_string(),
            min: 0,
            max: 4,
            default: 2,
            unit: ParamUnit::None,
        }]);
        mixer.retain_valid(&mut shorter);
        assert_eq!(mixer.len(), 1);
        assert_eq!(shorter.get(1).unwrap().base_value(), Some(2.0));
    }
}
