//! Canvas layout: inset placement and viewport fitting.
//!
//! Pure functions over pixel sizes, independent of the rendering backend.

use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};
use crate::models::BoundingBox;

/// Pixel rectangle with a top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Position of an inset as fractions of the base canvas, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsetAnchor {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for InsetAnchor {
    fn default() -> Self {
        Self {
            x: 0.055,
            y: 0.251,
            width: 0.5,
            height: 0.3,
        }
    }
}

impl InsetAnchor {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Reject fractions outside [0, 1], empty insets and insets that overhang the canvas.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("inset.x", self.x),
            ("inset.y", self.y),
            ("inset.width", self.width),
            ("inset.height", self.height),
        ];
        for (name, value) in fields {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(MapError::invalid_config(name, value, "must be within [0, 1]"));
            }
        }
        if self.width == 0.0 || self.height == 0.0 {
            return Err(MapError::invalid_config(
                "inset",
                format!("{}x{}", self.width, self.height),
                "inset must have a non-zero size",
            ));
        }
        if self.x + self.width > 1.0 || self.y + self.height > 1.0 {
            return Err(MapError::invalid_config(
                "inset",
                format!("({}, {}) + ({}, {})", self.x, self.y, self.width, self.height),
                "inset extends past the canvas edge",
            ));
        }
        Ok(())
    }

    /// Pixel rectangle for this anchor on a `canvas_w` x `canvas_h` canvas.
    pub fn place(&self, canvas_w: u32, canvas_h: u32) -> Result<PixelRect> {
        self.validate()?;
        if canvas_w == 0 || canvas_h == 0 {
            return Err(MapError::invalid_config(
                "canvas",
                format!("{}x{}", canvas_w, canvas_h),
                "canvas must be at least 1x1 px",
            ));
        }

        let scale = |frac: f64, total: u32| (frac * total as f64).round() as u32;
        let x = scale(self.x, canvas_w).min(canvas_w);
        let bottom = scale(self.y, canvas_h).min(canvas_h);
        let width = scale(self.width, canvas_w).clamp(1, canvas_w - x.min(canvas_w - 1));
        let height = scale(self.height, canvas_h).clamp(1, canvas_h - bottom.min(canvas_h - 1));

        Ok(PixelRect {
            x: x.min(canvas_w - width),
            y: canvas_h - bottom.min(canvas_h - height) - height,
            width,
            height,
        })
    }
}

/// Largest rectangle inside the padded canvas with the ground aspect of `bbox`, centred.
pub fn fit_viewport(bbox: &BoundingBox, canvas_w: u32, canvas_h: u32, padding: u32) -> PixelRect {
    let avail_w = canvas_w.saturating_sub(padding.saturating_mul(2)).max(1);
    let avail_h = canvas_h.saturating_sub(padding.saturating_mul(2)).max(1);
    let aspect = bbox.aspect_ratio();

    let (width, height) = if !aspect.is_finite() || aspect <= 0.0 {
        (avail_w, avail_h)
    } else if avail_w as f64 / avail_h as f64 > aspect {
        let w = (avail_h as f64 * aspect).round() as u32;
        (w.clamp(1, avail_w), avail_h)
    } else {
        let h = (avail_w as f64 / aspect).round() as u32;
        (avail_w, h.clamp(1, avail_h))
    };

    PixelRect {
        x: (canvas_w - width) / 2,
        y: (canvas_h - height) / 2,
        width,
        height,
    }
}
