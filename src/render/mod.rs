//! Render sinks: where reconstructed fields are published.
//!
//! The 3-D viewer lives outside this crate. Sinks here cover the publication
//! contract (`publish(field, low, high)`), retry handling, and simple file
//! exports used by the CLI.

mod colormap;
mod png;
mod raw;

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::LoadError;
use crate::field::Field;

pub use colormap::{coolwarm, ColorMap};
pub use png::{export_field_png, PngFieldSink};
pub use raw::{export_field_raw, expected_file_size, RawFieldSink, RawFormat};

/// Errors that can occur while publishing a frame.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Fixed color calibration range, decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRange {
    pub low: f64,
    pub high: f64,
}

impl DisplayRange {
    pub fn new(low: f64, high: f64) -> Result<Self, LoadError> {
        let range = Self { low, high };
        range.validate()?;
        Ok(range)
    }

    /// Rejects empty, inverted or non-finite ranges.
    pub fn validate(&self) -> Result<(), LoadError> {
        if !(self.low.is_finite() && self.high.is_finite() && self.low < self.high) {
            return Err(LoadError::InvalidDisplayRange(self.low, self.high));
        }
        Ok(())
    }

    /// Maps `value` to `[0, 1]`, clamping outside the range.
    pub fn normalize(&self, value: f64) -> f64 {
        ((value - self.low) / (self.high - self.low)).clamp(0.0, 1.0)
    }
}

impl Default for DisplayRange {
    /// Surface temperature calibration of the marina model, in K.
    fn default() -> Self {
        Self {
            low: 300.0,
            high: 320.0,
        }
    }
}

/// Consumer of reconstructed fields.
///
/// Failures are reported to the caller but never affect the parameter
/// state that produced the field.
pub trait RenderSink: Send + Sync {
    fn publish(&self, field: &Field, range: DisplayRange) -> Result<(), SinkError>;
}

impl<S: RenderSink + ?Sized> RenderSink for std::sync::Arc<S> {
    fn publish(&self, field: &Field, range: DisplayRange) -> Result<(), SinkError> {
        (**self).publish(field, range)
    }
}

/// Keeps every published field in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Mutex<Vec<(Field, DisplayRange)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames published so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The most recently published field.
    pub fn last(&self) -> Option<Field> {
        self.lock().last().map(|(field, _)| field.clone())
    }

    /// All published fields in publication order.
    pub fn fields(&self) -> Vec<Field> {
        self.lock().iter().map(|(field, _)| field.clone()).collect()
    }

    /// Display ranges that accompanied each publication.
    pub fn ranges(&self) -> Vec<DisplayRange> {
        self.lock().iter().map(|(_, range)| *range).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Field, DisplayRange)>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RenderSink for MemorySink {
    fn publish(&self, field: &Field, range: DisplayRange) -> Result<(), SinkError> {
        self.lock().push((field.clone(), range));
        Ok(())
    }
}

/// Counts publications without keeping the fields.
#[derive(Debug, Default)]
pub struct CountingSink {
    published: AtomicU64,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.published.load(AtomicOrdering::SeqCst)
    }
}

impl RenderSink for CountingSink {
    fn publish(&self, _field: &Field, _range: DisplayRange) -> Result<(), SinkError> {
        self.published.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }
}

/// Publishes every frame to each inner sink in order.
///
/// All sinks are tried; the first failure is returned.
#[derive(Default)]
pub struct TeeSink {
    sinks: Vec<Box<dyn RenderSink>>,
}

impl TeeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl RenderSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl RenderSink for TeeSink {
    fn publish(&self, field: &Field, range: DisplayRange) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(err) = sink.publish(field, range) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Retries a failing sink a bounded number of times.
#[derive(Debug)]
pub struct RetryingSink<S> {
    inner: S,
    attempts: u32,
}

impl<S: RenderSink> RetryingSink<S> {
    /// `attempts` is the total number of tries, at least one.
    pub fn new(inner: S, attempts: u32) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: RenderSink> RenderSink for RetryingSink<S> {
    fn publish(&self, field: &Field, range: DisplayRange) -> Result<(), SinkError> {
        let mut attempt = 1;
        loop {
            match self.inner.publish(field, range) {
                Ok(()) => return Ok(()),
                Err(err) if attempt < self.attempts => {
                    warn!(attempt, max_attempts = self.attempts, error = %err, "publish failed, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` publications.
    struct FlakySink {
        failures: u32,
        calls: AtomicU32,
        delivered: MemorySink,
    }

    impl RenderSink for FlakySink {
        fn publish(&self, field: &Field, range: DisplayRange) -> Result<(), SinkError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(SinkError::Unavailable("viewer reconnecting".into()));
            }
            self.delivered.publish(field, range)
        }
    }

    fn flaky(failures: u32) -> FlakySink {
        FlakySink {
            failures,
            calls: AtomicU32::new(0),
            delivered: MemorySink::new(),
        }
    }

    #[test]
    fn test_display_range_validation() {
        assert!(DisplayRange::new(300.0, 320.0).is_ok());
        assert!(matches!(
            DisplayRange::new(320.0, 300.0),
            Err(LoadError::InvalidDisplayRange(_, _))
        ));
        assert!(DisplayRange::new(f64::NAN, 1.0).is_err());
        assert_eq!(DisplayRange::default(), DisplayRange::new(300.0, 320.0).unwrap());
    }

    #[test]
    fn test_normalize_clamps() {
        let range = DisplayRange::default();
        assert_eq!(range.normalize(310.0), 0.5);
        assert_eq!(range.normalize(250.0), 0.0);
        assert_eq!(range.normalize(400.0), 1.0);
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        let range = DisplayRange::default();
        sink.publish(&Field::from_values(vec![1.0]), range).unwrap();
        sink.publish(&Field::from_values(vec![2.0]), range).unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.last().unwrap().values(), &[2.0]);
        assert_eq!(sink.ranges(), vec![range, range]);
    }

    #[test]
    fn test_retrying_sink_recovers() {
        let sink = RetryingSink::new(flaky(2), 3);
        sink.publish(&Field::from_values(vec![305.0]), DisplayRange::default()).unwrap();
        assert_eq!(sink.inner().delivered.len(), 1);
        assert_eq!(sink.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retrying_sink_gives_up() {
        let sink = RetryingSink::new(flaky(5), 2);
        let result = sink.publish(&Field::from_values(vec![305.0]), DisplayRange::default());
        assert!(matches!(result, Err(SinkError::Unavailable(_))));
        assert!(sink.inner().delivered.is_empty());
        assert_eq!(sink.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_counting_sink_keeps_no_fields() {
        let sink = CountingSink::new();
        for _ in 0..5 {
            sink.publish(&Field::from_values(vec![305.0; 1000]), DisplayRange::default()).unwrap();
        }
        assert_eq!(sink.count(), 5);
    }

    #[test]
    fn test_tee_sink_reaches_every_sink() {
        let memory = std::sync::Arc::new(MemorySink::new());
        let counter = std::sync::Arc::new(CountingSink::new());
        let tee = TeeSink::new()
            .with(flaky(1))
            .with(std::sync::Arc::clone(&memory))
            .with(std::sync::Arc::clone(&counter));
        assert_eq!(tee.len(), 3);

        let field = Field::from_values(vec![310.0]);
        let first = tee.publish(&field, DisplayRange::default());
        assert!(matches!(first, Err(SinkError::Unavailable(_))));
        tee.publish(&field, DisplayRange::default()).unwrap();

        assert_eq!(memory.len(), 2);
        assert_eq!(counter.count(), 2);
    }
}
