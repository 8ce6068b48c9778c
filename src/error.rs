//! Error types for artifact loading and request-time evaluation.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal startup errors: a precomputed artifact is missing, malformed, or
/// inconsistent with the others. The database cannot serve after one of these.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed .npy file {path}: {reason}")]
    Npy { path: PathBuf, reason: String },
    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("Regime '{regime}' mode {mode}: {reason}")]
    InvalidInterpolant {
        regime: String,
        mode: usize,
        reason: String,
    },
    #[error("Regime file {path} declares regime '{found}', expected '{expected}'")]
    RegimeNameMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[error("Regime '{0}' is declared more than once")]
    DuplicateRegime(String),
    #[error("Regime '{0}' has no interpolation functions")]
    EmptyRegime(String),
    #[error("No regimes declared")]
    NoRegimes,
    #[error("Invalid display range: low ({0}) >= high ({1})")]
    InvalidDisplayRange(f64, f64),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn npy(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        LoadError::Npy {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        LoadError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Request-time errors. These reject a single request; the previous
/// parameter state and published field stay in place.
#[derive(Error, Debug)]
pub enum RomError {
    #[error("Invalid mode count {requested}: must be between 1 and {max}")]
    InvalidModeCount { requested: usize, max: usize },
    #[error("Unknown regime '{0}'")]
    UnknownRegime(String),
    #[error("Regime '{regime}' provides {available} interpolation functions, {requested} requested")]
    InsufficientModes {
        regime: String,
        requested: usize,
        available: usize,
    },
    #[error(transparent)]
    Load(#[from] LoadError),
}
