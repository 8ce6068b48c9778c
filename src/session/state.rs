//! Parameter state and the UI-facing change events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::SessionDefaults;
use crate::interp::ParamPoint;

/// The current (regime, velocity, angle, mode count) tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterState {
    pub regime: String,
    /// Wind speed (m/s).
    pub velocity: f64,
    /// Wind angle (radians).
    pub angle: f64,
    pub modes: usize,
}

impl ParameterState {
    pub fn new(regime: &str, velocity: f64, angle: f64, modes: usize) -> Self {
        Self {
            regime: regime.to_string(),
            velocity,
            angle,
            modes,
        }
    }

    /// Converts configured defaults, whose angle is in degrees.
    pub fn from_defaults(defaults: &SessionDefaults) -> Self {
        Self::new(
            &defaults.regime,
            defaults.velocity,
            defaults.angle_deg.to_radians(),
            defaults.modes,
        )
    }

    pub fn point(&self) -> ParamPoint {
        ParamPoint::new(self.velocity, self.angle)
    }
}

impl fmt::Display for ParameterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "regime={} velocity={} angle={:.2}° modes={}",
            self.regime,
            self.velocity,
            self.angle.to_degrees(),
            self.modes
        )
    }
}

/// A single parameter change as delivered by the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterEvent {
    Velocity(f64),
    /// Angle in degrees; the session converts to radians.
    AngleDegrees(f64),
    ModeCount(usize),
    Regime(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseEventError {
    #[error("empty event")]
    Empty,
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("parameter '{0}' needs exactly one value")]
    MissingValue(String),
    #[error("invalid value '{value}' for '{parameter}'")]
    InvalidValue { parameter: String, value: String },
}

impl FromStr for ParameterEvent {
    type Err = ParseEventError;

    /// Parses `"<parameter> <value>"`, e.g. `"angle 90"` or `"regime noon"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let parameter = parts.next().ok_or(ParseEventError::Empty)?.to_ascii_lowercase();
        let value = match (parts.next(), parts.next()) {
            (Some(value), None) => value,
            _ => return Err(ParseEventError::MissingValue(parameter)),
        };
        let invalid = || ParseEventError::InvalidValue {
            parameter: parameter.clone(),
            value: value.to_string(),
        };

        match parameter.as_str() {
            "velocity" | "v" => value.parse().map(ParameterEvent::Velocity).map_err(|_| invalid()),
            "angle" | "a" => value.parse().map(ParameterEvent::AngleDegrees).map_err(|_| invalid()),
            "modes" | "bases" | "k" => value.parse().map(ParameterEvent::ModeCount).map_err(|_| invalid()),
            "regime" | "timeofday" => Ok(ParameterEvent::Regime(value.to_string())),
            _ => Err(ParseEventError::UnknownParameter(parameter)),
        }
    }
}

impl fmt::Display for ParameterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterEvent::Velocity(v) => write!(f, "velocity {}", v),
            ParameterEvent::AngleDegrees(a) => write!(f, "angle {}", a),
            ParameterEvent::ModeCount(k) => write!(f, "modes {}", k),
            ParameterEvent::Regime(r) => write!(f, "regime {}", r),
        }
    }
}
