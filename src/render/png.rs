//! Color PNG previews of reconstructed fields.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageBuffer, ImageEncoder, Rgb};

use super::{ColorMap, DisplayRange, RenderSink, SinkError};
use crate::field::Field;

/// Fill for pixels past the last mesh point.
const PADDING_COLOR: [u8; 3] = [32, 32, 32];

/// Picks a near-square `(width, height)` holding `points` pixels.
fn swatch_dimensions(points: usize, width: Option<u32>) -> (u32, u32) {
    let points = points.max(1);
    let width = width
        .filter(|w| *w > 0)
        .unwrap_or_else(|| (points as f64).sqrt().ceil() as u32)
        .max(1);
    let height = points.div_ceil(width as usize) as u32;
    (width, height)
}

/// Exports a field as an RGB PNG, one pixel per mesh point in mesh order.
///
/// Values are colored through `colormap` after normalization to `range`;
/// the mesh has no image layout, so this is a swatch rather than a picture.
pub fn export_field_png(
    field: &Field,
    path: &Path,
    range: DisplayRange,
    colormap: ColorMap,
    width: Option<u32>,
) -> Result<(), SinkError> {
    let (width, height) = swatch_dimensions(field.len(), width);
    let values = field.values();

    let mut img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let i = (y * width + x) as usize;
            let color = match values.get(i) {
                Some(&v) if v.is_finite() => colormap.rgb(range.normalize(v)),
                Some(_) => colormap.rgb(f64::NAN),
                None => PADDING_COLOR,
            };
            img.put_pixel(x, y, Rgb(color));
        }
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, CompressionType::Default, FilterType::Adaptive);
    encoder.write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)?;
    Ok(())
}

/// Writes each published frame to `{dir}/{base_name}_{frame:05}.png`.
#[derive(Debug)]
pub struct PngFieldSink {
    output_dir: PathBuf,
    base_name: String,
    colormap: ColorMap,
    width: Option<u32>,
    next_frame: AtomicU64,
}

impl PngFieldSink {
    /// Creates the output directory if needed.
    pub fn new(output_dir: &Path, base_name: &str) -> Result<Self, SinkError> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            base_name: base_name.to_string(),
            colormap: ColorMap::default(),
            width: None,
            next_frame: AtomicU64::new(0),
        })
    }

    pub fn with_colormap(mut self, colormap: ColorMap) -> Self {
        self.colormap = colormap;
        self
    }

    /// Fixes the swatch width instead of choosing a square.
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Path of frame `index`.
    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.output_dir
            .join(format!("{}_{:05}.png", self.base_name, index))
    }
}

impl RenderSink for PngFieldSink {
    fn publish(&self, field: &Field, range: DisplayRange) -> Result<(), SinkError> {
        let index = self.next_frame.fetch_add(1, Ordering::SeqCst);
        export_field_png(field, &self.frame_path(index), range, self.colormap, self.width)
    }
}
