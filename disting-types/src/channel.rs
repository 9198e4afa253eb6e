use serde::{Deserialize, Serialize};

use crate::voltage::Polarity;

/// Per-input generator settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InputMode {
    /// Square-wave clock instead of synthetic CV
    pub clock_enabled: bool,
    pub polarity: Polarity,
    /// Attenuation, always within 0.0..=1.0
    scaling: f32,
}

impl Default for InputMode {
    fn default() -> Self {
        Self {
            clock_enabled: false,
            polarity: Polarity::Bipolar,
            scaling: 1.0,
        }
    }
}

impl InputMode {
    pub fn new(clock_enabled: bool, polarity: Polarity, scaling: f32) -> Self {
        let mut mode = Self {
            clock_enabled,
            polarity,
            scaling: 1.0,
        };
        mode.set_scaling(scaling);
        mode
    }

    pub fn scaling(&self) -> f32 {
        self.scaling
    }

    /// Set the attenuation. Out-of-range values are clamped, NaN resets to 1.0.
    pub fn set_scaling(&mut self, scaling: f32) {
        self.scaling = if scaling.is_nan() {
            1.0
        } else {
            scaling.clamp(0.0, 1.0)
        };
    }
}

/// Semantic type of a script input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScriptInputType {
    #[default]
    Cv,
    Gate,
    Trigger,
}

impl ScriptInputType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cv" | "kcv" => Some(Self::Cv),
            "gate" | "kgate" => Some(Self::Gate),
            "trigger" | "ktrigger" => Some(Self::Trigger),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cv => "CV",
            Self::Gate => "Gate",
            Self::Trigger => "Trigger",
        }
    }
}

/// Semantic type of a script output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScriptOutputType {
    #[default]
    Linear,
    Stepped,
}

impl ScriptOutputType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linear" | "klinear" => Some(Self::Linear),
            "stepped" | "kstepped" => Some(Self::Stepped),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::Stepped => "Stepped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_is_clamped() {
        let mut mode = InputMode::default();
        mode.set_scaling(1.5);
        assert_eq!(mode.scaling(), 1.0);
        mode.set_scaling(-0.2);
        assert_eq!(mode.scaling(), 0.0);
        mode.set_scaling(f32::NAN);
        assert_eq!(mode.scaling(), 1.0);
        assert_eq!(InputMode::new(true, Polarity::Unipolar, 0.25).scaling(), 0.25);
    }

    #[test]
    fn parse_kinds() {
        assert_eq!(ScriptInputType::parse("kGate"), Some(ScriptInputType::Gate));
        assert_eq!(ScriptInputType::parse("trigger"), Some(ScriptInputType::Trigger));
        assert_eq!(ScriptInputType::parse("audio"), None);
        assert_eq!(ScriptOutputType::parse("Stepped"), Some(ScriptOutputType::Stepped));
    }
}
