//! Interactive session: one parameter state, one published field.
//!
//! Every change goes through one of four transitions. Each transition takes
//! the session lock, reconstructs against the shared database, swaps in the
//! new frame and hands it to the render sink before the lock is released, so
//! readers and sinks only ever see complete frames in acceptance order.
//! Rejected changes leave the previous frame untouched.
//!
//! Transitions issued from a rayon worker reconstruct on that worker alone.
//! Holding the session lock across a parallel section would let the worker
//! steal another transition for the same session and block on its own lock.

mod state;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::database::{RomConfig, RomDatabase};
use crate::error::RomError;
use crate::field::Field;
use crate::render::{DisplayRange, RenderSink};
use crate::rom::{self, DomainAdvisory};

pub use state::{ParameterEvent, ParameterState, ParseEventError};

/// An accepted parameter state together with its reconstructed field.
#[derive(Debug, Clone)]
pub struct Frame {
    /// 0 for the initial frame, +1 per accepted transition.
    pub sequence: u64,
    pub state: ParameterState,
    pub field: Arc<Field>,
    pub advisory: Option<DomainAdvisory>,
}

pub struct Session {
    database: Arc<RomDatabase>,
    sink: Arc<dyn RenderSink>,
    range: DisplayRange,
    current: Mutex<Frame>,
}

impl Session {
    /// Validates `initial`, reconstructs and publishes the first frame.
    pub fn start(
        database: Arc<RomDatabase>,
        sink: Arc<dyn RenderSink>,
        range: DisplayRange,
        initial: ParameterState,
    ) -> Result<Self, RomError> {
        range.validate()?;
        let (field, advisory) = evaluate(&database, &initial)?;
        let frame = Frame {
            sequence: 0,
            state: initial,
            field: Arc::new(field),
            advisory,
        };
        info!(state = %frame.state, "session started");

        let session = Self {
            database,
            sink,
            range,
            current: Mutex::new(frame),
        };
        {
            let frame = session.lock();
            session.publish(&frame);
        }
        Ok(session)
    }

    /// Opens the database named by `config` and starts from its defaults.
    pub fn from_config(config: &RomConfig, sink: Arc<dyn RenderSink>) -> Result<Self, RomError> {
        let database = Arc::new(RomDatabase::open(config)?);
        let initial = ParameterState::from_defaults(&config.defaults);
        Self::start(database, sink, config.display_range, initial)
    }

    pub fn on_velocity_changed(&self, velocity: f64) -> Result<Frame, RomError> {
        self.transition("velocity", |state| state.velocity = velocity)
    }

    /// `degrees` is converted to radians, the unit the interpolants use.
    pub fn on_angle_changed(&self, degrees: f64) -> Result<Frame, RomError> {
        self.transition("angle", |state| state.angle = degrees.to_radians())
    }

    /// Fails with [`RomError::InvalidModeCount`] outside `[1, M]`.
    pub fn on_mode_count_changed(&self, modes: usize) -> Result<Frame, RomError> {
        self.transition("modes", |state| state.modes = modes)
    }

    /// Switches the coefficient source; velocity, angle and mode count persist.
    pub fn on_regime_changed(&self, regime: &str) -> Result<Frame, RomError> {
        self.transition("regime", |state| state.regime = regime.to_string())
    }

    pub fn apply(&self, event: &ParameterEvent) -> Result<Frame, RomError> {
        match event {
            ParameterEvent::Velocity(v) => self.on_velocity_changed(*v),
            ParameterEvent::AngleDegrees(a) => self.on_angle_changed(*a),
            ParameterEvent::ModeCount(k) => self.on_mode_count_changed(*k),
            ParameterEvent::Regime(r) => self.on_regime_changed(r),
        }
    }

    /// The current frame. State and field always belong together.
    pub fn frame(&self) -> Frame {
        self.lock().clone()
    }

    pub fn state(&self) -> ParameterState {
        self.lock().state.clone()
    }

    pub fn field(&self) -> Arc<Field> {
        Arc::clone(&self.lock().field)
    }

    pub fn database(&self) -> &Arc<RomDatabase> {
        &self.database
    }

    pub fn display_range(&self) -> DisplayRange {
        self.range
    }

    fn transition(&self, kind: &str, update: impl FnOnce(&mut ParameterState)) -> Result<Frame, RomError> {
        let start = Instant::now();
        let mut current = self.lock();

        let mut next = current.state.clone();
        update(&mut next);
        let (field, advisory) = evaluate(&self.database, &next).inspect_err(|err| {
            debug!(kind, error = %err, "parameter change rejected");
        })?;

        if let Some(advisory) = &advisory {
            warn!(regime = %next.regime, "{}", advisory);
        }

        *current = Frame {
            sequence: current.sequence + 1,
            state: next,
            field: Arc::new(field),
            advisory,
        };
        self.publish(&current);

        debug!(
            kind,
            sequence = current.sequence,
            elapsed_us = start.elapsed().as_micros() as u64,
            "frame published"
        );
        Ok(current.clone())
    }

    /// Sink failures are logged and dropped; the frame stays accepted.
    fn publish(&self, frame: &Frame) {
        if let Err(err) = self.sink.publish(&frame.field, self.range) {
            warn!(sequence = frame.sequence, error = %err, "render sink rejected frame");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Frame> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn evaluate(
    database: &RomDatabase,
    state: &ParameterState,
) -> Result<(Field, Option<DomainAdvisory>), RomError> {
    let interpolants = database.interpolants_for(&state.regime, state.modes)?;
    let point = state.point();
    let basis = database.basis();
    let field = if rayon::current_thread_index().is_some() {
        rom::reconstruct_sequential(basis.mean(), basis.basis(), interpolants, point, state.modes)?
    } else {
        rom::reconstruct(basis.mean(), basis.basis(), interpolants, point, state.modes)?
    };
    let advisory = rom::domain_advisory(&interpolants[..state.modes], point);
    Ok((field, advisory))
}
