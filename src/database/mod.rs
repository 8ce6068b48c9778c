//! The loaded model: basis store plus regime table, shared read-only.

mod config;

use std::time::Instant;

use tracing::info;

use crate::basis::BasisStore;
use crate::error::{LoadError, RomError};
use crate::field::Field;
use crate::interp::{BoxedInterpolant, ParamPoint};
use crate::regime::RegimeTable;
use crate::rom;

pub use config::{RegimeSource, RomConfig, SessionDefaults};

/// Everything needed to reconstruct fields, immutable once built.
///
/// Share it between sessions with `Arc<RomDatabase>`; no locking is needed.
#[derive(Debug)]
pub struct RomDatabase {
    basis: BasisStore,
    regimes: RegimeTable,
}

impl RomDatabase {
    pub fn new(basis: BasisStore, regimes: RegimeTable) -> Result<Self, LoadError> {
        if regimes.is_empty() {
            return Err(LoadError::NoRegimes);
        }
        regimes.warn_short_regimes(basis.max_modes());
        Ok(Self { basis, regimes })
    }

    /// Loads every artifact named by `config`. Any failure is fatal.
    pub fn open(config: &RomConfig) -> Result<Self, LoadError> {
        let start = Instant::now();
        config.validate()?;

        let basis = BasisStore::load(&config.mean_path, &config.basis_path)?;
        let mut regimes = RegimeTable::new();
        for source in &config.regimes {
            regimes.load(&source.name, &source.path)?;
        }

        let database = Self::new(basis, regimes)?;
        info!(
            points = database.basis.field_len(),
            modes = database.basis.max_modes(),
            regimes = database.regimes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "model database ready"
        );
        Ok(database)
    }

    pub fn basis(&self) -> &BasisStore {
        &self.basis
    }

    pub fn regimes(&self) -> &RegimeTable {
        &self.regimes
    }

    /// Largest mode count `regime` can serve: `min(M, interpolant count)`.
    pub fn mode_limit(&self, regime: &str) -> Result<usize, RomError> {
        let interpolants = self.regimes.select(regime)?;
        Ok(self.basis.max_modes().min(interpolants.len()))
    }

    /// Selects `regime` and checks it can serve `modes`.
    ///
    /// `modes` outside `[1, M]` is an [`RomError::InvalidModeCount`]; a valid
    /// count the regime has too few interpolants for is
    /// [`RomError::InsufficientModes`].
    pub fn interpolants_for(&self, regime: &str, modes: usize) -> Result<&[BoxedInterpolant], RomError> {
        let max = self.basis.max_modes();
        if modes == 0 || modes > max {
            return Err(RomError::InvalidModeCount {
                requested: modes,
                max,
            });
        }
        let interpolants = self.regimes.select(regime)?;
        if modes > interpolants.len() {
            return Err(RomError::InsufficientModes {
                regime: regime.to_string(),
                requested: modes,
                available: interpolants.len(),
            });
        }
        Ok(interpolants)
    }

    /// Reconstructs the field for `regime` at `point` with `modes` modes.
    pub fn reconstruct(&self, regime: &str, point: ParamPoint, modes: usize) -> Result<Field, RomError> {
        let interpolants = self.interpolants_for(regime, modes)?;
        rom::reconstruct(self.basis.mean(), self.basis.basis(), interpolants, point, modes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisMatrix;
    use crate::synthetic::{SyntheticConfig, SyntheticModel};
    use tempfile::tempdir;

    fn tiny_database() -> RomDatabase {
        let basis = BasisMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let store = BasisStore::new(vec![10.0, 10.0, 10.0], basis).unwrap();
        let mut regimes = RegimeTable::new();
        regimes
            .insert(
                "morning",
                vec![
                    Box::new(|v: f64, _a: f64| v) as BoxedInterpolant,
                    Box::new(|_v: f64, a: f64| a / 10.0) as BoxedInterpolant,
                ],
            )
            .unwrap();
        regimes
            .insert("noon", vec![Box::new(|v: f64, _a: f64| -v) as BoxedInterpolant])
            .unwrap();
        RomDatabase::new(store, regimes).unwrap()
    }

    #[test]
    fn test_reconstruct_through_database() {
        let db = tiny_database();
        let field = db.reconstruct("morning", ParamPoint::new(10.0, 20.0), 2).unwrap();
        assert_eq!(field.values(), &[20.0, 12.0, 22.0]);
    }

    #[test]
    fn test_error_taxonomy() {
        let db = tiny_database();
        let p = ParamPoint::new(10.0, 0.0);

        assert!(matches!(
            db.reconstruct("morning", p, 0),
            Err(RomError::InvalidModeCount { requested: 0, max: 2 })
        ));
        assert!(matches!(
            db.reconstruct("morning", p, 3),
            Err(RomError::InvalidModeCount { requested: 3, max: 2 })
        ));
        assert!(matches!(db.reconstruct("dusk", p, 1), Err(RomError::UnknownRegime(_))));
        assert!(matches!(
            db.reconstruct("noon", p, 2),
            Err(RomError::InsufficientModes { requested: 2, available: 1, .. })
        ));
        assert_eq!(db.mode_limit("noon").unwrap(), 1);
        assert_eq!(db.mode_limit("morning").unwrap(), 2);
    }

    #[test]
    fn test_empty_regime_table_rejected() {
        let basis = BasisMatrix::from_rows(&[vec![1.0]]).unwrap();
        let store = BasisStore::new(vec![0.0], basis).unwrap();
        assert!(matches!(
            RomDatabase::new(store, RegimeTable::new()),
            Err(LoadError::NoRegimes)
        ));
    }

    #[test]
    fn test_open_written_bundle() {
        let dir = tempdir().unwrap();
        let synthetic = SyntheticConfig {
            points: 50,
            modes: 12,
            ..Default::default()
        };
        let model = SyntheticModel::generate(&synthetic).unwrap();
        model.write(dir.path()).unwrap();

        let config = RomConfig::load(&dir.path().join("rom.json")).unwrap();
        let db = RomDatabase::open(&config).unwrap();
        assert_eq!(db.basis().field_len(), 50);
        assert_eq!(db.basis().max_modes(), 12);
        assert_eq!(db.regimes().names().collect::<Vec<_>>(), vec!["morning", "noon", "afternoon"]);

        let in_memory = model.into_database().unwrap();
        let p = ParamPoint::from_degrees(12.0, 75.0);
        let from_disk = db.reconstruct("noon", p, 12).unwrap();
        let from_memory = in_memory.reconstruct("noon", p, 12).unwrap();
        assert!(from_disk.max_abs_diff(&from_memory) < 1e-9);
    }

    #[test]
    fn test_open_fails_on_missing_regime_file() {
        let dir = tempdir().unwrap();
        let model = SyntheticModel::generate(&SyntheticConfig {
            points: 8,
            modes: 4,
            ..Default::default()
        })
        .unwrap();
        let config_path = model.write(dir.path()).unwrap();
        std::fs::remove_file(dir.path().join("interp_noon.json")).unwrap();

        let config = RomConfig::load(&config_path).unwrap();
        assert!(matches!(RomDatabase::open(&config), Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_open_fails_on_shape_mismatch() {
        let dir = tempdir().unwrap();
        let model = SyntheticModel::generate(&SyntheticConfig {
            points: 8,
            modes: 4,
            ..Default::default()
        })
        .unwrap();
        let config_path = model.write(dir.path()).unwrap();
        crate::io::write_npy(&dir.path().join("mean.npy"), &[7], &[300.0; 7]).unwrap();

        let config = RomConfig::load(&config_path).unwrap();
        assert!(matches!(RomDatabase::open(&config), Err(LoadError::ShapeMismatch(_))));
    }
}
