use disting_types::{
    clamp_output, InputMode, Jack, PhysicalInput, PhysicalOutput, INPUT_COUNT, OUTPUT_COUNT,
};

/// Live state of one physical input jack.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputChannel {
    pub voltage: f32,
    pub mode: InputMode,
}

/// The 12 input and 8 output jacks. All channels exist for the life of the
/// engine; only voltages and input modes change.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStore {
    inputs: [InputChannel; INPUT_COUNT],
    outputs: [f32; OUTPUT_COUNT],
}

impl Default for ChannelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelStore {
    pub fn new() -> Self {
        Self {
            inputs: [InputChannel::default(); INPUT_COUNT],
            outputs: [0.0; OUTPUT_COUNT],
        }
    }

    pub fn input(&self, jack: PhysicalInput) -> &InputChannel {
        &self.inputs[jack.slot()]
    }

    pub fn input_mut(&mut self, jack: PhysicalInput) -> &mut InputChannel {
        &mut self.inputs[jack.slot()]
    }

    pub fn input_voltage(&self, jack: PhysicalInput) -> f32 {
        self.inputs[jack.slot()].voltage
    }

    pub fn input_mode(&self, jack: PhysicalInput) -> InputMode {
        self.inputs[jack.slot()].mode
    }

    pub fn input_modes(&self) -> [InputMode; INPUT_COUNT] {
        std::array::from_fn(|i| self.inputs[i].mode)
    }

    pub fn input_voltages(&self) -> [f32; INPUT_COUNT] {
        std::array::from_fn(|i| self.inputs[i].voltage)
    }

    /// Overwrite every input voltage, clamping each into its polarity range.
    pub fn set_input_voltages(&mut self, voltages: &[f32; INPUT_COUNT]) {
        for (channel, volts) in self.inputs.iter_mut().zip(voltages) {
            channel.voltage = channel.mode.polarity.clamp(*volts);
        }
    }

    /// Force one input voltage (clamped to the input's polarity range).
    /// The generator overwrites it on the next frame.
    pub fn set_input_voltage(&mut self, jack: PhysicalInput, volts: f32) {
        let channel = &mut self.inputs[jack.slot()];
        channel.voltage = channel.mode.polarity.clamp(volts);
    }

    pub fn output(&self, jack: PhysicalOutput) -> f32 {
        self.outputs[jack.slot()]
    }

    pub fn outputs(&self) -> &[f32; OUTPUT_COUNT] {
        &self.outputs
    }

    /// Write an output voltage. Non-finite values are ignored, others are
    /// clamped to the output range. Returns whether the value was stored.
    pub fn set_output(&mut self, jack: PhysicalOutput, volts: f32) -> bool {
        match clamp_output(volts) {
            Some(v) => {
                self.outputs[jack.slot()] = v;
                true
            }
            None => false,
        }
    }

    pub fn clear_output(&mut self, jack: PhysicalOutput) {
        self.outputs[jack.slot()] = 0.0;
    }

    pub fn input_jacks() -> impl Iterator<Item = PhysicalInput> {
        (1..=INPUT_COUNT).filter_map(PhysicalInput::new)
    }

    pub fn output_jacks() -> impl Iterator<Item = PhysicalOutput> {
        (1..=OUTPUT_COUNT).filter_map(PhysicalOutput::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disting_types::Polarity;

    fn input(i: usize) -> PhysicalInput {
        PhysicalInput::new(i).unwrap()
    }

    fn output(i: usize) -> PhysicalOutput {
        PhysicalOutput::new(i).unwrap()
    }

    #[test]
    fn starts_silent() {
        let store = ChannelStore::new();
        assert!(store.outputs().iter().all(|v| *v == 0.0));
        assert!(store.input_voltages().iter().all(|v| *v == 0.0));
        assert_eq!(ChannelStore::input_jacks().count(), 12);
        assert_eq!(ChannelStore::output_jacks().count(), 8);
    }

    #[test]
    fn input_voltages_respect_polarity() {
        let mut store = ChannelStore::new();
        store.input_mut(input(2)).mode.polarity = Polarity::Unipolar;
        let mut volts = [7.0; INPUT_COUNT];
        volts[1] = -3.0;
        store.set_input_voltages(&volts);
        assert_eq!(store.input_voltage(input(1)), 5.0);
        assert_eq!(store.input_voltage(input(2)), 0.0);
    }

    #[test]
    fn outputs_clamp_and_reject_non_finite() {
        let mut store = ChannelStore::new();
        assert!(store.set_output(output(1), 14.0));
        assert_eq!(store.output(output(1)), 10.0);
        assert!(!store.set_output(output(1), f32::NAN));
        assert_eq!(store.output(output(1)), 10.0);
        store.clear_output(output(1));
        assert_eq!(store.output(output(1)), 0.0);
    }
}
