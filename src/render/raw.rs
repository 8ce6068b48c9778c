//! RAW float export of reconstructed fields.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{DisplayRange, RenderSink, SinkError};
use crate::field::Field;

/// RAW element formats, always little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawFormat {
    /// 32-bit float (compact, enough for display).
    #[default]
    F32,
    /// 64-bit float (full precision).
    F64,
}

impl RawFormat {
    fn bytes_per_value(self) -> u64 {
        match self {
            RawFormat::F32 => 4,
            RawFormat::F64 => 8,
        }
    }
}

/// Writes the field values in mesh order.
pub fn export_field_raw(field: &Field, path: &Path, format: RawFormat) -> Result<(), SinkError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        RawFormat::F32 => {
            for &value in field.values() {
                writer.write_all(&(value as f32).to_le_bytes())?;
            }
        }
        RawFormat::F64 => {
            for &value in field.values() {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

/// Returns the expected file size for a RAW export of `points` values.
pub fn expected_file_size(points: usize, format: RawFormat) -> u64 {
    points as u64 * format.bytes_per_value()
}

/// Writes each published frame to `{dir}/{base_name}_{frame:05}.raw`.
#[derive(Debug)]
pub struct RawFieldSink {
    output_dir: PathBuf,
    base_name: String,
    format: RawFormat,
    next_frame: AtomicU64,
}

impl RawFieldSink {
    pub fn new(output_dir: &Path, base_name: &str, format: RawFormat) -> Result<Self, SinkError> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            base_name: base_name.to_string(),
            format,
            next_frame: AtomicU64::new(0),
        })
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.output_dir
            .join(format!("{}_{:05}.raw", self.base_name, index))
    }
}

impl RenderSink for RawFieldSink {
    /// The display range does not affect raw values.
    fn publish(&self, field: &Field, _range: DisplayRange) -> Result<(), SinkError> {
        let index = self.next_frame.fetch_add(1, Ordering::SeqCst);
        export_field_raw(field, &self.frame_path(index), self.format)
    }
}
