//! Parametric reduced-order model evaluation for marina surface temperature.
//!
//! A precomputed mean field and POD basis are combined with per-regime
//! interpolated coefficients to reconstruct a full field for any
//! (wind velocity, wind angle, mode count) query, and an interactive session
//! republishes the field whenever one parameter changes.

pub mod basis;
pub mod database;
pub mod error;
pub mod field;
pub mod interp;
pub mod io;
pub mod logging;
pub mod regime;
pub mod render;
pub mod rom;
pub mod session;
pub mod synthetic;

pub use basis::{BasisMatrix, BasisStore};
pub use database::{RomConfig, RomDatabase, SessionDefaults};
pub use error::{LoadError, RomError};
pub use field::Field;
pub use interp::{BoxedInterpolant, GridInterpolant, Interpolant, InterpolantSpec, ParamPoint, RbfInterpolant};
pub use regime::RegimeTable;
pub use render::{DisplayRange, MemorySink, RenderSink};
pub use rom::reconstruct;
pub use session::{Frame, ParameterEvent, ParameterState, Session};
