use disting_types::{Jack, PhysicalInput, INPUT_COUNT};

/// Pulse state of one physical input.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TriggerPulse {
    pub active: bool,
    /// Engine time (seconds) the pulse was raised
    pub activated_at: f64,
    /// `trigger()` already ran for this pulse
    fired: bool,
}

/// Momentary trigger pulses raised by the UI, one slot per input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriggerPulses {
    pulses: [TriggerPulse; INPUT_COUNT],
}

impl TriggerPulses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise a pulse at engine time `now`. Re-firing an active pulse
    /// restarts it.
    pub fn fire(&mut self, input: PhysicalInput, now: f64) {
        self.pulses[input.slot()] = TriggerPulse {
            active: true,
            activated_at: now,
            fired: false,
        };
    }

    pub fn is_active(&self, input: PhysicalInput) -> bool {
        self.pulses[input.slot()].active
    }

    pub fn active_mask(&self) -> [bool; INPUT_COUNT] {
        std::array::from_fn(|i| self.pulses[i].active)
    }

    /// Inputs whose pulse should run `trigger()` this frame; each pulse is
    /// reported at most once. A pulse is due while its age is inside the
    /// fire window, widened to one frame so a slow frame never drops it.
    pub fn take_due(&mut self, now: f64, window: f64, frame_dt: f64) -> Vec<PhysicalInput> {
        let window = window.max(frame_dt);
        let mut due = Vec::new();
        for (slot, pulse) in self.pulses.iter_mut().enumerate() {
            if !pulse.active || pulse.fired {
                continue;
            }
            pulse.fired = true;
            if now - pulse.activated_at <= window {
                if let Some(input) = PhysicalInput::new(slot + 1) {
                    due.push(input);
                }
            }
        }
        due
    }

    /// Clear pulses older than `duration` seconds.
    pub fn age(&mut self, now: f64, duration: f64) {
        for pulse in self.pulses.iter_mut() {
            if pulse.active && now - pulse.activated_at > duration {
                pulse.active = false;
            }
        }
    }
}
