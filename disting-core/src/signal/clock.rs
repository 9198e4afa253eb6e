//! The free-running clock shared by every clock-mode input.

use crate::config::EngineSettings;

/// Volts a clock input carries while high, before scaling.
pub const CLOCK_HIGH_VOLTS: f32 = 5.0;

/// Tempo of the synthetic clock. All clock-mode inputs share one phase
/// reference: the engine's elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    bpm: f64,
    min_bpm: f64,
    max_bpm: f64,
    fallback_bpm: f64,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(&EngineSettings::default())
    }
}

impl Clock {
    pub fn new(settings: &EngineSettings) -> Self {
        let mut clock = Self {
            bpm: settings.default_bpm,
            min_bpm: settings.min_bpm,
            max_bpm: settings.max_bpm,
            fallback_bpm: settings.default_bpm,
        };
        clock.set_bpm(settings.default_bpm);
        clock
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Set the tempo. Non-finite values reset to the default BPM, others
    /// are clamped into the configured range. Returns the stored BPM.
    pub fn set_bpm(&mut self, bpm: f64) -> f64 {
        self.bpm = sanitize_bpm(bpm, self.fallback_bpm, self.min_bpm, self.max_bpm);
        self.bpm
    }

    /// Seconds per beat.
    pub fn period(&self) -> f64 {
        60.0 / self.bpm
    }

    /// 50% duty square wave: high for the first half of each period.
    pub fn is_high(&self, elapsed: f64) -> bool {
        let period = self.period();
        elapsed.rem_euclid(period) < period / 2.0
    }

    pub fn voltage(&self, elapsed: f64, scaling: f32) -> f32 {
        if self.is_high(elapsed) {
            CLOCK_HIGH_VOLTS * scaling
        } else {
            0.0
        }
    }
}

pub fn sanitize_bpm(bpm: f64, fallback: f64, min: f64, max: f64) -> f64 {
    if !bpm.is_finite() {
        log::debug!(target: "engine::clock", "invalid bpm {}, using {}", bpm, fallback);
        return fallback.clamp(min, max);
    }
    bpm.clamp(min, max)
}
