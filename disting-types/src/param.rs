use std::fmt;

use serde::{Deserialize, Serialize};

/// Unit shown next to a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParamUnit {
    #[default]
    None,
    Db,
    Percent,
    Hz,
    KHz,
    Semitones,
    Cents,
    Ms,
    Seconds,
    Volts,
    Bpm,
}

impl ParamUnit {
    /// Parse a unit name as written in a script (`"dB"`, `"kHz"`, `"%"` ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Some(Self::None),
            "db" => Some(Self::Db),
            "%" | "percent" => Some(Self::Percent),
            "hz" => Some(Self::Hz),
            "khz" => Some(Self::KHz),
            "st" | "semitones" => Some(Self::Semitones),
            "cents" => Some(Self::Cents),
            "ms" => Some(Self::Ms),
            "s" | "seconds" => Some(Self::Seconds),
            "v" | "volts" => Some(Self::Volts),
            "bpm" => Some(Self::Bpm),
            _ => None,
        }
    }
}

impl fmt::Display for ParamUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamUnit::None => Ok(()),
            ParamUnit::Db => write!(f, "dB"),
            ParamUnit::Percent => write!(f, "%"),
            ParamUnit::Hz => write!(f, "Hz"),
            ParamUnit::KHz => write!(f, "kHz"),
            ParamUnit::Semitones => write!(f, "st"),
            ParamUnit::Cents => write!(f, "cents"),
            ParamUnit::Ms => write!(f, "ms"),
            ParamUnit::Seconds => write!(f, "s"),
            ParamUnit::Volts => write!(f, "V"),
            ParamUnit::Bpm => write!(f, "BPM"),
        }
    }
}

/// A parameter as declared by a script's `init()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamSpec {
    Integer {
        name: String,
        min: i32,
        max: i32,
        default: i32,
        unit: ParamUnit,
    },
    /// Stored unscaled; `scale` (10/100/1000) picks the displayed decimals.
    Float {
        name: String,
        min: f32,
        max: f32,
        default: f32,
        unit: ParamUnit,
        scale: u16,
    },
    /// `default` is a 1-based index into `values`.
    Enum {
        name: String,
        values: Vec<String>,
        default: usize,
    },
}

impl ParamSpec {
    pub fn name(&self) -> &str {
        match self {
            ParamSpec::Integer { name, .. }
            | ParamSpec::Float { name, .. }
            | ParamSpec::Enum { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamKind {
    Integer,
    Float { scale: u16 },
    Enum { values: Vec<String> },
}

/// A live script parameter.
///
/// `value()` is always within the declared bounds: every mutation goes
/// through [`Parameter::sanitize`], which clamps to `[min, max]` and rounds
/// integer and enum parameters to whole numbers. Enum values are 1-based
/// indices into the label list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub unit: ParamUnit,
    pub kind: ParamKind,
    min: f32,
    max: f32,
    default: f32,
    current: f32,
    /// The user-set value while the parameter is automated
    base_value: Option<f32>,
}

impl Parameter {
    pub fn from_spec(spec: &ParamSpec) -> Self {
        let (kind, unit, min, max, default) = match spec {
            ParamSpec::Integer {
                min,
                max,
                default,
                unit,
                ..
            } => (
                ParamKind::Integer,
                *unit,
                (*min).min(*max) as f32,
                (*min).max(*max) as f32,
                *default as f32,
            ),
            ParamSpec::Float {
                min,
                max,
                default,
                unit,
                scale,
                ..
            } => {
                // Non-finite bounds would make clamping panic
                let lo = if min.is_finite() { *min } else { 0.0 };
                let hi = if max.is_finite() { *max } else { lo };
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                (ParamKind::Float { scale: *scale }, *unit, lo, hi, *default)
            }
            ParamSpec::Enum {
                values, default, ..
            } => (
                ParamKind::Enum {
                    values: values.clone(),
                },
                ParamUnit::None,
                1.0,
                values.len().max(1) as f32,
                *default as f32,
            ),
        };

        let mut param = Self {
            name: spec.name().to_string(),
            unit,
            kind,
            min,
            max,
            default: min,
            current: min,
            base_value: None,
        };
        param.default = param.sanitize(default);
        param.current = param.default;
        param
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn default_value(&self) -> f32 {
        self.default
    }

    pub fn value(&self) -> f32 {
        self.current
    }

    pub fn base_value(&self) -> Option<f32> {
        self.base_value
    }

    pub fn is_integral(&self) -> bool {
        !matches!(self.kind, ParamKind::Float { .. })
    }

    /// Number of labels for an enum parameter, `None` otherwise.
    pub fn value_count(&self) -> Option<usize> {
        match &self.kind {
            ParamKind::Enum { values } => Some(values.len().max(1)),
            _ => None,
        }
    }

    /// Bring any candidate value onto the parameter's valid set.
    /// NaN falls back to the default.
    pub fn sanitize(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        let value = if self.is_integral() { value.round() } else { value };
        value.clamp(self.min, self.max)
    }

    /// Set the live value. Returns the stored value.
    pub fn set_value(&mut self, value: f32) -> f32 {
        self.current = self.sanitize(value);
        self.current
    }

    /// Current value expressed in 0..=1 over `[min, max]`.
    pub fn normalized(&self) -> f32 {
        let range = self.max - self.min;
        if range <= 0.0 {
            0.0
        } else {
            (self.current - self.min) / range
        }
    }

    pub fn denormalize(&self, normalized: f32) -> f32 {
        let normalized = if normalized.is_nan() { 0.0 } else { normalized.clamp(0.0, 1.0) };
        self.sanitize(self.min + normalized * (self.max - self.min))
    }

    pub fn set_normalized(&mut self, normalized: f32) -> f32 {
        self.current = self.denormalize(normalized);
        self.current
    }

    /// Store (or clear) the pre-automation value. Stored values are sanitized.
    pub fn set_base_value(&mut self, base: Option<f32>) {
        self.base_value = base.map(|v| self.sanitize(v));
    }

    /// Label of the current enum entry.
    pub fn enum_label(&self) -> Option<&str> {
        match &self.kind {
            ParamKind::Enum { values } => values
                .get((self.current as usize).saturating_sub(1))
                .map(String::as_str),
            _ => None,
        }
    }

    /// Format the current value for display.
    pub fn display_value(&self) -> String {
        let text = match &self.kind {
            ParamKind::Integer => format!("{}", self.current as i64),
            ParamKind::Float { scale } => {
                let decimals = (*scale).max(1).ilog10().clamp(1, 3) as usize;
                format!("{:.prec$}", self.current, prec = decimals)
            }
            ParamKind::Enum { .. } => return self.enum_label().unwrap_or("-").to_string(),
        };
        if self.unit == ParamUnit::None {
            text
        } else {
            format!("{} {}", text, self.unit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_spec(min: i32, max: i32, default: i32) -> ParamSpec {
        ParamSpec::Integer {
            name: "Steps".to_string(),
            min,
            max,
            default,
            unit: ParamUnit::None,
        }
    }

    fn float_spec(min: f32, max: f32, default: f32, scale: u16) -> ParamSpec {
        ParamSpec::Float {
            name: "Level".to_string(),
            min,
            max,
            default,
            unit: ParamUnit::Percent,
            scale,
        }
    }

    fn enum_spec(values: &[&str], default: usize) -> ParamSpec {
        ParamSpec::Enum {
            name: "Mode".to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            default,
        }
    }

    #[test]
    fn integer_rounds_and_clamps() {
        let mut p = Parameter::from_spec(&int_spec(0, 10, 5));
        assert_eq!(p.value(), 5.0);
        assert_eq!(p.set_value(3.6), 4.0);
        assert_eq!(p.set_value(42.0), 10.0);
        assert_eq!(p.set_value(-3.0), 0.0);
    }

    #[test]
    fn float_clamps_without_rounding() {
        let mut p = Parameter::from_spec(&float_spec(0.0, 100.0, 50.0, 10));
        assert_eq!(p.set_value(12.34), 12.34);
        assert_eq!(p.set_value(150.0), 100.0);
        assert_eq!(p.set_value(f32::NAN), 50.0);
    }

    #[test]
    fn enum_is_one_based() {
        let mut p = Parameter::from_spec(&enum_spec(&["Off", "On", "Auto"], 2));
        assert_eq!(p.value(), 2.0);
        assert_eq!(p.enum_label(), Some("On"));
        assert_eq!(p.set_value(0.0), 1.0);
        assert_eq!(p.set_value(9.0), 3.0);
        assert_eq!(p.value_count(), Some(3));
    }

    #[test]
    fn default_is_clamped_and_swapped_bounds_fixed() {
        let p = Parameter::from_spec(&int_spec(10, 0, 20));
        assert_eq!(p.min(), 0.0);
        assert_eq!(p.max(), 10.0);
        assert_eq!(p.value(), 10.0);
    }

    #[test]
    fn normalized_round_trip() {
        let mut p = Parameter::from_spec(&float_spec(-50.0, 50.0, 0.0, 100));
        assert!((p.normalized() - 0.5).abs() < 1e-6);
        p.set_normalized(0.25);
        assert!((p.value() + 25.0).abs() < 1e-4);
        p.set_normalized(4.0);
        assert_eq!(p.value(), 50.0);
    }

    #[test]
    fn normalized_integer_rounds() {
        let mut p = Parameter::from_spec(&int_spec(0, 3, 0));
        p.set_normalized(0.5);
        assert_eq!(p.value(), 2.0);
    }

    #[test]
    fn display_formats() {
        let mut p = Parameter::from_spec(&float_spec(0.0, 100.0, 12.345, 100));
        assert_eq!(p.display_value(), "12.35 %");
        p.kind = ParamKind::Float { scale: 1000 };
        assert_eq!(p.display_value(), "12.345 %");

        let p = Parameter::from_spec(&int_spec(0, 10, 7));
        assert_eq!(p.display_value(), "7");

        let p = Parameter::from_spec(&enum_spec(&["Sine", "Saw"], 2));
        assert_eq!(p.display_value(), "Saw");
    }

    #[test]
    fn base_value_is_sanitized() {
        let mut p = Parameter::from_spec(&int_spec(0, 10, 5));
        p.set_base_value(Some(12.7));
        assert_eq!(p.base_value(), Some(10.0));
        p.set_base_value(None);
        assert_eq!(p.base_value(), None);
    }

    #[test]
    fn parse_units() {
        assert_eq!(ParamUnit::parse("dB"), Some(ParamUnit::Db));
        assert_eq!(ParamUnit::parse("kHz"), Some(ParamUnit::KHz));
        assert_eq!(ParamUnit::parse("kMs"), None);
        assert_eq!(ParamUnit::parse(""), Some(ParamUnit::None));
        assert_eq!(ParamUnit::parse("furlongs"), None);
    }

    #[test]
    fn khz_keeps_its_label() {
        let spec = ParamSpec::Float {
            name: "Cutoff".to_string(),
            min: 0.1,
            max: 20.0,
            default: 1.5,
            unit: ParamUnit::KHz,
            scale: 10,
        };
        assert_eq!(Parameter::from_spec(&spec).display_value(), "1.5 kHz");
    }

    #[test]
    fn non_finite_float_bounds_become_finite() {
        let mut p = Parameter::from_spec(&float_spec(f32::NAN, 1.0, 0.5, 10));
        assert_eq!((p.min(), p.max()), (0.0, 1.0));
        assert_eq!(p.value(), 0.5);
        assert_eq!(p.set_value(4.0), 1.0);

        let mut p = Parameter::from_spec(&float_spec(2.0, f32::INFINITY, f32::NAN, 10));
        assert!(p.min().is_finite() && p.max().is_finite());
        assert_eq!(p.set_value(9.0), 2.0);
        assert!(p.normalized().is_finite());
    }
}
