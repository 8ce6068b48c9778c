//! Model bundle configuration.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::render::DisplayRange;
use crate::session::ParameterEvent;

/// Where one regime's interpolants are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSource {
    pub name: String,
    pub path: PathBuf,
}

/// Parameter values a new session starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDefaults {
    pub regime: String,
    /// Wind speed (m/s).
    pub velocity: f64,
    /// Wind angle in degrees, as the UI reports it.
    pub angle_deg: f64,
    pub modes: usize,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            regime: "morning".to_string(),
            velocity: 10.0,
            angle_deg: 0.0,
            modes: 20,
        }
    }
}

/// Paths and calibration for one precomputed model bundle.
///
/// Units:
/// - velocity: m/s
/// - angle: degrees at the UI boundary, radians inside the model
/// - display range: K
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RomConfig {
    pub mean_path: PathBuf,
    pub basis_path: PathBuf,
    /// Declaration order is the order the UI lists regimes in.
    pub regimes: Vec<RegimeSource>,
    pub display_range: DisplayRange,
    pub defaults: SessionDefaults,
    /// Mode counts offered by the UI slider. The evaluator accepts `[1, M]`.
    pub mode_slider: (usize, usize),
    /// Wind speeds offered by the UI slider (m/s).
    pub velocity_slider: (f64, f64),
}

impl Default for RomConfig {
    fn default() -> Self {
        Self::marina()
    }
}

impl RomConfig {
    /// The marina deployment: three time-of-day regimes, 300–320 K calibration.
    pub fn marina() -> Self {
        let regimes = ["morning", "noon", "afternoon"]
            .iter()
            .map(|name| RegimeSource {
                name: name.to_string(),
                path: PathBuf::from(format!("interp_{}.json", name)),
            })
            .collect();

        Self {
            mean_path: PathBuf::from("mean.npy"),
            basis_path: PathBuf::from("basis.npy"),
            regimes,
            display_range: DisplayRange::default(),
            defaults: SessionDefaults::default(),
            mode_slider: (20, 57),
            velocity_slider: (5.0, 15.0),
        }
    }

    /// Reads a JSON config; relative artifact paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|e| LoadError::io(path, e))?;
        let mut config: RomConfig =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| LoadError::json(path, e))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as pretty JSON.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Makes every relative artifact path relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.mean_path);
        resolve(&mut self.basis_path);
        for regime in &mut self.regimes {
            resolve(&mut regime.path);
        }
    }

    /// Checks internal consistency without touching the filesystem.
    pub fn validate(&self) -> Result<(), LoadError> {
        self.display_range.validate()?;

        if self.regimes.is_empty() {
            return Err(LoadError::NoRegimes);
        }
        for (i, regime) in self.regimes.iter().enumerate() {
            if self.regimes[..i].iter().any(|r| r.name == regime.name) {
                return Err(LoadError::DuplicateRegime(regime.name.clone()));
            }
        }
        if !self.regimes.iter().any(|r| r.name == self.defaults.regime) {
            return Err(LoadError::InvalidConfig(format!(
                "default regime '{}' is not declared",
                self.defaults.regime
            )));
        }
        if self.defaults.modes == 0 {
            return Err(LoadError::InvalidConfig("default mode count must be at least 1".into()));
        }
        let (k_lo, k_hi) = self.mode_slider;
        if k_lo == 0 || k_lo > k_hi {
            return Err(LoadError::InvalidConfig(format!(
                "mode slider {}..={} must be a non-empty range starting at 1 or above",
                k_lo, k_hi
            )));
        }
        let (v_lo, v_hi) = self.velocity_slider;
        if v_lo.is_nan() || v_hi.is_nan() || v_lo >= v_hi {
            return Err(LoadError::InvalidConfig(format!(
                "velocity slider {}..={} is empty",
                v_lo, v_hi
            )));
        }
        Ok(())
    }

    /// Describes how `event` exceeds the UI slider ranges, if it does.
    ///
    /// The evaluator accepts values beyond the sliders; this only flags
    /// scripted input the interactive UI could not have produced.
    pub fn slider_excursion(&self, event: &ParameterEvent) -> Option<String> {
        match *event {
            ParameterEvent::Velocity(v) => {
                let (lo, hi) = self.velocity_slider;
                (!(lo..=hi).contains(&v)).then(|| format!("velocity {} outside slider {}..={}", v, lo, hi))
            }
            ParameterEvent::ModeCount(k) => {
                let (lo, hi) = self.mode_slider;
                (!(lo..=hi).contains(&k)).then(|| format!("mode count {} outside slider {}..={}", k, lo, hi))
            }
            ParameterEvent::AngleDegrees(_) | ParameterEvent::Regime(_) => None,
        }
    }

    /// Declared regime names in order.
    pub fn regime_names(&self) -> Vec<&str> {
        self.regimes.iter().map(|r| r.name.as_str()).collect()
    }
}
