//! Regime table: per time-of-day sequences of per-mode interpolants.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LoadError, RomError};
use crate::interp::{BoxedInterpolant, InterpolantSpec};

/// On-disk layout of one regime's fitted interpolants, in mode order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeFile {
    pub regime: String,
    pub interpolants: Vec<InterpolantSpec>,
}

impl RegimeFile {
    /// Writes the file as pretty JSON.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}

/// Loads the interpolant sequence for `name` from a regime JSON file.
pub fn load_regime(name: &str, path: &Path) -> Result<Vec<BoxedInterpolant>, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::io(path, e))?;
    let parsed: RegimeFile =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| LoadError::json(path, e))?;

    if parsed.regime != name {
        return Err(LoadError::RegimeNameMismatch {
            path: path.to_path_buf(),
            expected: name.to_string(),
            found: parsed.regime,
        });
    }

    parsed
        .interpolants
        .iter()
        .enumerate()
        .map(|(mode, spec)| {
            spec.build().map_err(|e| LoadError::InvalidInterpolant {
                regime: name.to_string(),
                mode,
                reason: e.to_string(),
            })
        })
        .collect()
}

struct Regime {
    name: String,
    interpolants: Vec<BoxedInterpolant>,
}

/// Named regimes in declaration order.
///
/// Built once at startup through `&mut self` methods; afterwards it is only
/// read, typically from behind an `Arc` shared by every session.
#[derive(Default)]
pub struct RegimeTable {
    regimes: Vec<Regime>,
}

impl RegimeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an already-built interpolant sequence.
    pub fn insert(&mut self, name: &str, interpolants: Vec<BoxedInterpolant>) -> Result<(), LoadError> {
        if self.contains(name) {
            return Err(LoadError::DuplicateRegime(name.to_string()));
        }
        if interpolants.is_empty() {
            return Err(LoadError::EmptyRegime(name.to_string()));
        }
        self.regimes.push(Regime {
            name: name.to_string(),
            interpolants,
        });
        Ok(())
    }

    /// Loads and registers the regime `name` from `path`.
    pub fn load(&mut self, name: &str, path: &Path) -> Result<(), LoadError> {
        let interpolants = load_regime(name, path)?;
        info!(regime = name, modes = interpolants.len(), path = %path.display(), "loaded regime");
        self.insert(name, interpolants)
    }

    /// Returns the interpolant sequence for a declared regime.
    pub fn select(&self, name: &str) -> Result<&[BoxedInterpolant], RomError> {
        self.regimes
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.interpolants.as_slice())
            .ok_or_else(|| RomError::UnknownRegime(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.regimes.iter().any(|r| r.name == name)
    }

    /// Regime names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.regimes.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.regimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regimes.is_empty()
    }

    /// Number of interpolants in the shortest regime.
    pub fn min_modes(&self) -> usize {
        self.regimes
            .iter()
            .map(|r| r.interpolants.len())
            .min()
            .unwrap_or(0)
    }

    /// Logs every regime that cannot serve `required` modes.
    ///
    /// Short regimes remain usable; requests beyond their length are
    /// rejected with [`RomError::InsufficientModes`].
    pub fn warn_short_regimes(&self, required: usize) {
        for regime in self.regimes.iter().filter(|r| r.interpolants.len() < required) {
            warn!(
                regime = %regime.name,
                available = regime.interpolants.len(),
                required,
                "regime has fewer interpolants than basis modes"
            );
        }
    }
}

impl fmt::Debug for RegimeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.regimes.iter().map(|r| (&r.name, r.interpolants.len())))
            .finish()
    }
}
