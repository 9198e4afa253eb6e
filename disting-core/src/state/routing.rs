//! Script-logical ↔ physical channel mapping.
//!
//! Scripts never see physical jacks. Inputs are resolved through the input
//! assignment, outputs are written through the output assignment. Both maps
//! allow several script channels on one jack (last write wins on outputs).

use std::collections::BTreeMap;

use disting_types::{Jack, PhysicalInput, PhysicalOutput, OUTPUT_COUNT};

use super::channels::ChannelStore;

/// Sparse map from 1-based script channel index to a physical jack.
/// A missing entry means "unassigned".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoAssignment<J: Jack> {
    slots: BTreeMap<usize, J>,
}

impl<J: Jack> Default for IoAssignment<J> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<J: Jack> IoAssignment<J> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1:1 mapping for script indices `1..=min(script_count, J::COUNT)`.
    pub fn identity(script_count: usize) -> Self {
        let slots = (1..=script_count.min(J::COUNT))
            .filter_map(|i| J::new(i).map(|jack| (i, jack)))
            .collect();
        Self { slots }
    }

    pub fn get(&self, script_index: usize) -> Option<J> {
        self.slots.get(&script_index).copied()
    }

    /// Assign or clear a script channel. Index validation is the caller's job.
    pub fn set(&mut self, script_index: usize, jack: Option<J>) {
        match jack {
            Some(jack) => {
                self.slots.insert(script_index, jack);
            }
            None => {
                self.slots.remove(&script_index);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, J)> + '_ {
        self.slots.iter().map(|(i, j)| (*i, *j))
    }

    /// Script indices wired to `jack`.
    pub fn script_indices_for(&self, jack: J) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .filter(move |(_, j)| **j == jack)
            .map(|(i, _)| *i)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Carry this assignment over to a new script layout.
    ///
    /// Indices the old script had keep their wiring (or lack of it), indices
    /// beyond the new count are dropped and indices new to this script get
    /// the default 1:1 wiring.
    pub fn rebased(&self, old_count: usize, new_count: usize) -> Self {
        let mut next = Self::identity(new_count);
        for index in 1..=new_count.min(old_count) {
            next.set(index, self.get(index));
        }
        next
    }

    /// Raw `(script, physical)` index pairs, for persistence.
    pub fn to_raw(&self) -> BTreeMap<usize, usize> {
        self.slots.iter().map(|(i, j)| (*i, j.get())).collect()
    }
}

/// Input and output assignments for the loaded script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoRouting {
    pub inputs: IoAssignment<PhysicalInput>,
    pub outputs: IoAssignment<PhysicalOutput>,
}

/// Default mapping for a freshly loaded script. Deterministic and idempotent.
pub fn create_default_mapping(script_inputs: usize, script_outputs: usize) -> IoRouting {
    IoRouting {
        inputs: IoAssignment::identity(script_inputs),
        outputs: IoAssignment::identity(script_outputs),
    }
}

/// The only place a script observes input voltages. Unassigned inputs read 0.
pub fn resolve_script_inputs(
    script_inputs: usize,
    assignment: &IoAssignment<PhysicalInput>,
    channels: &ChannelStore,
) -> Vec<f32> {
    (1..=script_inputs)
        .map(|i| {
            assignment
                .get(i)
                .map(|jack| channels.input_voltage(jack))
                .unwrap_or(0.0)
        })
        .collect()
}

/// Physical output a script output slot writes to. Unmapped slots whose
/// index is itself a valid output fall back to that jack.
pub fn output_target(
    script_index: usize,
    assignment: &IoAssignment<PhysicalOutput>,
) -> Option<PhysicalOutput> {
    assignment
        .get(script_index)
        .or_else(|| PhysicalOutput::new(script_index))
}

/// Write a script output array through the mapping. `None` slots leave
/// their jack untouched. Returns the number of jacks written.
pub fn commit_script_outputs(
    values: &[Option<f32>],
    assignment: &IoAssignment<PhysicalOutput>,
    channels: &mut ChannelStore,
) -> usize {
    let mut written = 0;
    for (slot, value) in values.iter().enumerate() {
        let Some(volts) = value else { continue };
        if let Some(jack) = output_target(slot + 1, assignment) {
            if channels.set_output(jack, *volts) {
                written += 1;
            }
        }
    }
    written
}

/// Which physical outputs some script output slot can reach.
pub fn connected_outputs(
    script_outputs: usize,
    assignment: &IoAssignment<PhysicalOutput>,
) -> [bool; OUTPUT_COUNT] {
    let mut connected = [false; OUTPUT_COUNT];
    for index in 1..=script_outputs {
        if let Some(jack) = output_target(index, assignment) {
            connected[jack.slot()] = true;
        }
    }
    connected
}

/// Zero every physical output no script output can reach, so stale voltages
/// never linger on disconnected jacks.
pub fn reset_unconnected_outputs(
    script_outputs: usize,
    assignment: &IoAssignment<PhysicalOutput>,
    channels: &mut ChannelStore,
) {
    let connected = connected_outputs(script_outputs, assignment);
    for jack in ChannelStore::output_jacks() {
        if !connected[jack.slot()] {
            channels.clear_output(jack);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(i: usize) -> PhysicalInput {
        PhysicalInput::new(i).unwrap()
    }

    fn output(i: usize) -> PhysicalOutput {
        PhysicalOutput::new(i).unwrap()
    }

    #[test]
    fn default_mapping_is_identity_and_bounded() {
        let routing = create_default_mapping(14, 3);
        assert_eq!(routing.inputs.len(), 12);
        assert_eq!(routing.inputs.get(12), Some(input(12)));
        assert_eq!(routing.inputs.get(13), None);
        assert_eq!(routing.outputs.len(), 3);
        assert_eq!(routing.outputs.get(3), Some(output(3)));
    }

    #[test]
    fn default_mapping_is_idempotent() {
        assert_eq!(create_default_mapping(4, 2), create_default_mapping(4, 2));
    }

    #[test]
    fn unassigned_inputs_read_zero() {
        let mut channels = ChannelStore::new();
        let mut volts = [0.0; 12];
        volts[4] = 2.5;
        volts[0] = 1.0;
        channels.set_input_voltages(&volts);

        let mut assignment = IoAssignment::identity(2);
        assignment.set(1, Some(input(5)));
        assignment.set(2, None);

        assert_eq!(resolve_script_inputs(3, &assignment, &channels), vec![2.5, 0.0, 0.0]);
    }

    #[test]
    fn several_script_inputs_may_share_a_jack() {
        let mut assignment = IoAssignment::<PhysicalInput>::new();
        assignment.set(1, Some(input(3)));
        assignment.set(2, Some(input(3)));
        let wired: Vec<_> = assignment.script_indices_for(input(3)).collect();
        assert_eq!(wired, vec![1, 2]);
    }

    #[test]
    fn commit_skips_none_slots() {
        let mut channels = ChannelStore::new();
        channels.set_output(output(2), 7.0);
        let assignment = IoAssignment::identity(3);

        let written = commit_script_outputs(&[Some(5.0), None, Some(2.0)], &assignment, &mut channels);

        assert_eq!(written, 2);
        assert_eq!(channels.output(output(1)), 5.0);
        assert_eq!(channels.output(output(2)), 7.0);
        assert_eq!(channels.output(output(3)), 2.0);
    }

    #[test]
    fn commit_follows_mapping_and_falls_back() {
        let mut channels = ChannelStore::new();
        let mut assignment = IoAssignment::new();
        assignment.set(1, Some(output(6)));

        commit_script_outputs(&[Some(1.0), Some(2.0)], &assignment, &mut channels);

        assert_eq!(channels.output(output(6)), 1.0);
        assert_eq!(channels.output(output(1)), 0.0);
        // slot 2 is unmapped and falls back to jack 2
        assert_eq!(channels.output(output(2)), 2.0);
    }

    #[test]
    fn slots_beyond_the_jacks_are_dropped() {
        let mut channels = ChannelStore::new();
        let values: Vec<Option<f32>> = (0..10).map(|i| Some(i as f32)).collect();
        let written = commit_script_outputs(&values, &IoAssignment::new(), &mut channels);
        assert_eq!(written, 8);
    }

    #[test]
    fn reset_zeroes_only_unreachable_jacks() {
        let mut channels = ChannelStore::new();
        for jack in ChannelStore::output_jacks() {
            channels.set_output(jack, 3.0);
        }
        let mut assignment = IoAssignment::identity(2);
        assignment.set(2, Some(output(7)));

        reset_unconnected_outputs(2, &assignment, &mut channels);

        assert_eq!(channels.output(output(1)), 3.0);
        assert_eq!(channels.output(output(2)), 0.0);
        assert_eq!(channels.output(output(7)), 3.0);
        assert_eq!(channels.output(output(8)), 0.0);
    }

    #[test]
    fn rebase_keeps_existing_wiring() {
        let mut old = IoAssignment::<PhysicalInput>::identity(3);
        old.set(1, Some(input(9)));
        old.set(2, None);

        let grown = old.rebased(3, 4);
        assert_eq!(grown.get(1), Some(input(9)));
        assert_eq!(grown.get(2), None);
        assert_eq!(grown.get(3), Some(input(3)));
        assert_eq!(grown.get(4), Some(input(4)));

        let shrunk = old.rebased(3, 1);
        assert_eq!(shrunk.len(), 1);
        assert_eq!(shrunk.get(1), Some(input(9)));
    }
}
