//! Rasterization of the main map, the overview inset and the composite.

mod figure;
mod map;

pub use figure::Figure;
pub use map::{render_map, Overlay};

use crate::config::StyleConfig;

/// Points per inch, for converting typographic sizes to pixels
const POINTS_PER_INCH: f64 = 72.0;

/// Style and resolution shared by every figure of one map
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub style: &'a StyleConfig,
    pub dpi: u32,
}

impl<'a> RenderContext<'a> {
    pub fn new(style: &'a StyleConfig, dpi: u32) -> Self {
        Self { style, dpi }
    }

    /// Size in points to whole pixels at this DPI; zero stays zero
    pub fn px(&self, points: f64) -> u32 {
        (points * self.dpi as f64 / POINTS_PER_INCH).round().max(0.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_to_pixels() {
        let style = StyleConfig::default();
        assert_eq!(RenderContext::new(&style, 600).px(3.0), 25);
        assert_eq!(RenderContext::new(&style, 72).px(0.5), 1);
        assert_eq!(RenderContext::new(&style, 72).px(0.0), 0);
    }
}
