//! Raster figures: compositing and PNG export.

use std::io::{BufWriter, Write};
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb as Pixel, RgbImage};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{MapError, Result};
use crate::layout::{InsetAnchor, PixelRect};
use crate::style::Rgb;

/// An RGB raster produced by the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    image: RgbImage,
}

impl Figure {
    /// Blank figure filled with `background`
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let pixel = Pixel([background.r, background.g, background.b]);
        Self {
            image: RgbImage::from_pixel(width, height, pixel),
        }
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let Pixel([r, g, b]) = *self.image.get_pixel(x, y);
        Rgb::new(r, g, b)
    }

    /// Draw `inset` on top of this figure at `anchor`.
    ///
    /// An inset that was not rendered at the anchor's pixel size is resampled
    /// to fit. Returns the pixel rectangle it occupies.
    pub fn composite(&mut self, inset: &Figure, anchor: &InsetAnchor) -> Result<PixelRect> {
        let rect = anchor.place(self.width(), self.height())?;

        if inset.dimensions() == (rect.width, rect.height) {
            imageops::replace(&mut self.image, &inset.image, rect.x as i64, rect.y as i64);
        } else {
            debug!(
                "Resampling inset from {}x{} to {}x{}",
                inset.width(),
                inset.height(),
                rect.width,
                rect.height
            );
            let resized = imageops::resize(&inset.image, rect.width, rect.height, FilterType::Triangle);
            imageops::replace(&mut self.image, &resized, rect.x as i64, rect.y as i64);
        }

        Ok(rect)
    }

    /// Write the figure as PNG, checking it has the requested pixel size.
    ///
    /// The image is encoded into a temporary file next to `path` and renamed
    /// into place, so a failed export never leaves a partial file.
    pub fn export_png(&self, path: &Path, dimensions: (u32, u32)) -> Result<()> {
        let (expected_w, expected_h) = dimensions;
        if self.dimensions() != dimensions {
            return Err(MapError::DimensionMismatch {
                expected_w,
                expected_h,
                actual_w: self.width(),
                actual_h: self.height(),
            });
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if !dir.is_dir() {
            return Err(MapError::InputNotFound {
                what: "output directory",
                path: dir.to_path_buf(),
            });
        }

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            self.image.write_to(&mut writer, ImageFormat::Png)?;
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| MapError::Io(e.error))?;

        info!("Wrote {}x{} PNG to {}", expected_w, expected_h, path.display());
        Ok(())
    }
}
