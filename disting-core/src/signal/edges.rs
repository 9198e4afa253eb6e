use disting_types::{Jack, PhysicalInput, INPUT_COUNT};

/// A change of clock state on a physical input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub input: PhysicalInput,
    /// low -> high
    pub rising: bool,
}

/// Tracks the previous frame's high/low state of every clock-mode input.
///
/// The previous state starts low, so a clock that is high on its first
/// observed frame reports a rising edge.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgeDetector {
    previous: [bool; INPUT_COUNT],
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare this frame's states against the last frame's. Only inputs
    /// flagged in `clocked` are considered; the others keep their stored
    /// state untouched.
    pub fn detect(
        &mut self,
        high: &[bool; INPUT_COUNT],
        clocked: &[bool; INPUT_COUNT],
    ) -> Vec<Edge> {
        let mut edges = Vec::new();
        for slot in 0..INPUT_COUNT {
            if !clocked[slot] {
                continue;
            }
            if high[slot] != self.previous[slot] {
                if let Some(input) = PhysicalInput::new(slot + 1) {
                    edges.push(Edge {
                        input,
                        rising: high[slot],
                    });
                }
                self.previous[slot] = high[slot];
            }
        }
        edges
    }

    /// Forget the stored state of one input (clock mode was switched off).
    pub fn rearm(&mut self, input: PhysicalInput) {
        self.previous[input.slot()] = false;
    }
}
