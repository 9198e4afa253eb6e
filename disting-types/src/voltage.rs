//! Voltage domain conventions for the emulated jacks.

use serde::{Deserialize, Serialize};

/// Lowest voltage an output jack will carry.
pub const OUTPUT_MIN_VOLTS: f32 = -10.0;

/// Highest voltage an output jack will carry.
pub const OUTPUT_MAX_VOLTS: f32 = 10.0;

/// Input range convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Polarity {
    /// -5V..+5V
    #[default]
    Bipolar,
    /// 0V..+10V
    Unipolar,
}

impl Polarity {
    /// (min, max) volts for this convention.
    pub fn range(self) -> (f32, f32) {
        match self {
            Polarity::Bipolar => (-5.0, 5.0),
            Polarity::Unipolar => (0.0, 10.0),
        }
    }

    /// Clamp a voltage into this convention's range. NaN maps to the range floor.
    pub fn clamp(self, volts: f32) -> f32 {
        let (min, max) = self.range();
        if volts.is_nan() {
            return min.max(0.0).min(max);
        }
        volts.clamp(min, max)
    }

    pub fn contains(self, volts: f32) -> bool {
        let (min, max) = self.range();
        (min..=max).contains(&volts)
    }

    pub fn name(self) -> &'static str {
        match self {
            Polarity::Bipolar => "Bipolar",
            Polarity::Unipolar => "Unipolar",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bipolar" | "bi" => Some(Polarity::Bipolar),
            "unipolar" | "uni" => Some(Polarity::Unipolar),
            _ => None,
        }
    }
}

/// Clamp a script output value onto the output jack range.
/// Non-finite values are rejected.
pub fn clamp_output(volts: f32) -> Option<f32> {
    volts
        .is_finite()
        .then(|| volts.clamp(OUTPUT_MIN_VOLTS, OUTPUT_MAX_VOLTS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges() {
        assert_eq!(Polarity::Bipolar.range(), (-5.0, 5.0));
        assert_eq!(Polarity::Unipolar.range(), (0.0, 10.0));
    }

    #[test]
    fn clamp_into_range() {
        assert_eq!(Polarity::Bipolar.clamp(7.0), 5.0);
        assert_eq!(Polarity::Bipolar.clamp(-7.0), -5.0);
        assert_eq!(Polarity::Unipolar.clamp(-1.0), 0.0);
        assert_eq!(Polarity::Unipolar.clamp(12.0), 10.0);
        assert_eq!(Polarity::Bipolar.clamp(f32::NAN), 0.0);
        assert_eq!(Polarity::Unipolar.clamp(f32::NAN), 0.0);
    }

    #[test]
    fn parse_names() {
        assert_eq!(Polarity::parse("Unipolar"), Some(Polarity::Unipolar));
        assert_eq!(Polarity::parse("BI"), Some(Polarity::Bipolar));
        assert_eq!(Polarity::parse("sideways"), None);
    }

    #[test]
    fn output_clamp() {
        assert_eq!(clamp_output(12.0), Some(10.0));
        assert_eq!(clamp_output(-3.5), Some(-3.5));
        assert_eq!(clamp_output(f32::INFINITY), None);
        assert_eq!(clamp_output(f32::NAN), None);
    }
}
