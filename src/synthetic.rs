//! Deterministic synthetic model bundles.
//!
//! Produces a mean field, a basis with decaying column energy and, per
//! regime, one grid interpolant per mode sampled on the same simulation grid
//! the marina database uses (velocities {5, 10, 15} m/s, 20 angles closing
//! at 2π). Used for demos and tests when the real artifacts are unavailable.

use std::f64::consts::TAU;
use std::path::{Path, PathBuf};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::basis::{BasisMatrix, BasisStore};
use crate::database::{RomConfig, RomDatabase};
use crate::error::LoadError;
use crate::interp::{GridInterpolant, InterpolantSpec};
use crate::io::write_npy;
use crate::regime::{RegimeFile, RegimeTable};

/// Parameters for a synthetic bundle.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Field dimension F.
    pub points: usize,
    /// Basis columns M (and interpolants per regime).
    pub modes: usize,
    pub regimes: Vec<String>,
    /// Simulated wind speeds (m/s).
    pub velocities: Vec<f64>,
    /// Angle samples over [0, 2π], both ends included.
    pub angle_samples: usize,
    /// Mean surface temperature (K).
    pub mean_temperature: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            points: 4096,
            modes: 60,
            regimes: vec!["morning".into(), "noon".into(), "afternoon".into()],
            velocities: vec![5.0, 10.0, 15.0],
            angle_samples: 20,
            mean_temperature: 310.0,
            seed: 42,
        }
    }
}

/// `samples` evenly spaced angles from 0 to 2π inclusive.
///
/// The last sample duplicates angle 0 to close the periodic domain.
pub fn simulation_angles(samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![0.0],
        n => (0..n)
            .map(|i| if i == n - 1 { TAU } else { TAU * i as f64 / (n - 1) as f64 })
            .collect(),
    }
}

/// A generated bundle held in memory.
#[derive(Debug, Clone)]
pub struct SyntheticModel {
    pub mean: Vec<f64>,
    pub basis: BasisMatrix,
    pub regimes: Vec<RegimeFile>,
}

impl SyntheticModel {
    pub fn generate(config: &SyntheticConfig) -> Result<Self, LoadError> {
        if config.points == 0 || config.modes == 0 {
            return Err(LoadError::InvalidConfig(
                "synthetic model needs at least one point and one mode".into(),
            ));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        // Smooth spatial pattern plus small per-point noise.
        let mean = (0..config.points)
            .map(|i| {
                config.mean_temperature
                    + 4.0 * (i as f64 * 0.013).sin()
                    + (rng.random::<f64>() - 0.5)
            })
            .collect();

        let len = config.points.checked_mul(config.modes).ok_or_else(|| {
            LoadError::InvalidConfig(format!(
                "synthetic basis {} x {} is too large",
                config.points, config.modes
            ))
        })?;
        // Column j carries energy proportional to 1 / (1 + j).
        let column_scale: Vec<f64> = (0..config.modes).map(|j| (1.0 + j as f64).sqrt().recip()).collect();
        let data = (0..len)
            .map(|i| (rng.random::<f64>() * 2.0 - 1.0) * column_scale[i % config.modes])
            .collect();
        let basis = BasisMatrix::from_row_major(config.points, config.modes, data)?;

        let angles = simulation_angles(config.angle_samples);
        let regimes = config
            .regimes
            .iter()
            .enumerate()
            .map(|(r, name)| {
                let interpolants = (0..config.modes)
                    .map(|mode| {
                        let grid = mode_grid(&mut rng, r, mode, &config.velocities, &angles)
                            .map_err(|e| LoadError::InvalidInterpolant {
                                regime: name.clone(),
                                mode,
                                reason: e.to_string(),
                            })?;
                        Ok(InterpolantSpec::from(&grid))
                    })
                    .collect::<Result<Vec<_>, LoadError>>()?;
                Ok(RegimeFile {
                    regime: name.clone(),
                    interpolants,
                })
            })
            .collect::<Result<Vec<_>, LoadError>>()?;

        Ok(Self {
            mean,
            basis,
            regimes,
        })
    }

    /// Builds the in-memory database without touching disk.
    pub fn into_database(self) -> Result<RomDatabase, LoadError> {
        let store = BasisStore::new(self.mean, self.basis)?;
        let mut table = RegimeTable::new();
        for file in &self.regimes {
            let interpolants = file
                .interpolants
                .iter()
                .enumerate()
                .map(|(mode, spec)| {
                    spec.build().map_err(|e| LoadError::InvalidInterpolant {
                        regime: file.regime.clone(),
                        mode,
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, LoadError>>()?;
            table.insert(&file.regime, interpolants)?;
        }
        RomDatabase::new(store, table)
    }

    /// Writes `mean.npy`, `basis.npy`, `interp_{regime}.json` and `rom.json`
    /// into `dir`, returning the config path.
    pub fn write(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let mut config = RomConfig::marina();
        config.regimes.clear();

        write_npy(&dir.join(&config.mean_path), &[self.mean.len()], &self.mean)?;
        write_npy(
            &dir.join(&config.basis_path),
            &[self.basis.rows(), self.basis.modes()],
            self.basis.as_slice(),
        )?;

        for file in &self.regimes {
            let path = PathBuf::from(format!("interp_{}.json", file.regime));
            file.save(&dir.join(&path))?;
            config.regimes.push(crate::database::RegimeSource {
                name: file.regime.clone(),
                path,
            });
        }

        let modes = self.basis.modes();
        config.defaults.modes = config.defaults.modes.min(modes);
        config.mode_slider = (config.defaults.modes, modes);
        if let Some(first) = config.regimes.first() {
            config.defaults.regime = first.name.clone();
        }

        let config_path = dir.join("rom.json");
        config.save(&config_path)?;
        Ok(config_path)
    }
}

/// Coefficient surface for one (regime, mode): periodic in angle, linear-ish
/// in velocity, with amplitude decaying by mode index.
fn mode_grid(
    rng: &mut ChaCha8Rng,
    regime: usize,
    mode: usize,
    velocities: &[f64],
    angles: &[f64],
) -> Result<GridInterpolant, crate::interp::InterpolantError> {
    let amplitude = 3.0 / (1 + mode) as f64;
    let phase = rng.random::<f64>() * TAU;
    let harmonic = 0.3 * rng.random::<f64>();
    let offset = 0.5 * (regime as f64 - 1.0) * amplitude;

    let last = angles.len().saturating_sub(1);
    let grid = GridInterpolant::from_fn(velocities.to_vec(), angles.to_vec(), |v, a| {
        // The closing sample reuses angle 0 so both ends agree exactly.
        let a = if angles.len() > 1 && a == angles[last] { angles[0] } else { a };
        amplitude * ((a + phase).cos() * v / 10.0 + harmonic * (2.0 * a).sin()) + offset
    })?;
    Ok(grid)
}
