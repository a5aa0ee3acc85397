//! Map rendering with plotters: basemap, sites, study-area box and annotations.

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::{debug, warn};

use super::{Figure, RenderContext};
use crate::basemap::{Basemap, BasemapFeature};
use crate::error::{MapError, Result};
use crate::layout::{fit_viewport, PixelRect};
use crate::models::{BoundingBox, SiteTable};
use crate::style::{ColorScale, Rgb};

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

fn render_err<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> MapError {
    MapError::Render(err.to_string())
}

fn color(c: Rgb) -> RGBColor {
    RGBColor(c.r, c.g, c.b)
}

/// What goes on top of the basemap
pub enum Overlay<'a> {
    /// Site points coloured by temperature, plus legend and north arrow
    Sites {
        sites: &'a SiteTable,
        scale: &'a ColorScale,
    },
    /// Outline of the study area
    StudyArea(&'a BoundingBox),
}

/// Render the basemap inside `extent` on a `width` x `height` canvas.
///
/// Features and overlays are drawn in a panel fitted to the extent's ground
/// aspect ratio. Output is deterministic for identical inputs.
pub fn render_map(
    basemap: &Basemap,
    extent: &BoundingBox,
    overlay: Overlay<'_>,
    ctx: &RenderContext<'_>,
    (width, height): (u32, u32),
) -> Result<Figure> {
    let style = ctx.style;
    let padding = if matches!(overlay, Overlay::StudyArea(_)) {
        0
    } else {
        ctx.px(style.padding).min(width / 4).min(height / 4)
    };
    let panel = fit_viewport(extent, width, height, padding);
    debug!(
        "Rendering {}x{} figure, panel {}x{} at ({}, {})",
        width, height, panel.width, panel.height, panel.x, panel.y
    );

    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&color(style.background)).map_err(render_err)?;

        let plot = root
            .clone()
            .shrink(
                (panel.x as i32, panel.y as i32),
                (panel.width as i32, panel.height as i32),
            );
        plot.fill(&color(style.water)).map_err(render_err)?;

        {
            let mut chart = ChartBuilder::on(&plot)
                .build_cartesian_2d(
                    extent.long_min..extent.long_max,
                    extent.lat_min..extent.lat_max,
                )
                .map_err(render_err)?;

            let land = color(style.land).filled();
            let water = color(style.water).filled();
            let outline = color(style.outline).stroke_width(ctx.px(style.outline_width));

            let features = basemap.clipped_to(extent);
            debug!("{} basemap features inside extent", features.len());

            for feature in &features {
                if let BasemapFeature::Area(mp) = feature {
                    for polygon in &mp.0 {
                        chart
                            .draw_series(std::iter::once(Polygon::new(
                                to_xy(polygon.exterior().coords()),
                                land,
                            )))
                            .map_err(render_err)?;
                        for hole in polygon.interiors() {
                            chart
                                .draw_series(std::iter::once(Polygon::new(
                                    to_xy(hole.coords()),
                                    water,
                                )))
                                .map_err(render_err)?;
                        }
                    }
                }
            }

            // Strokes follow the original rings, so the view edge is never outlined
            if style.outline_width > 0.0 {
                for lines in basemap.outlines_in(extent) {
                    chart
                        .draw_series(
                            lines
                                .0
                                .iter()
                                .map(|line| PathElement::new(to_xy(line.coords()), outline)),
                        )
                        .map_err(render_err)?;
                }
            }

            if let Some(step) = style.graticule {
                let stroke = color(style.graticule_color).stroke_width(1);
                chart
                    .draw_series(
                        graticule(extent, step)
                            .into_iter()
                            .map(|line| PathElement::new(line, stroke)),
                    )
                    .map_err(render_err)?;
            }

            match &overlay {
                Overlay::Sites { sites, scale } => {
                    let (t_min, t_max) = sites.temperature_range().unwrap_or((0.0, 0.0));
                    let radius = ctx.px(style.point_radius) as i32;
                    let ring = color(style.point_outline).stroke_width((radius as u32 / 4).max(1));

                    let inside = sites.iter().filter(|s| extent.contains(s.lat, s.long));
                    for site in inside {
                        let fill = color(scale.color_at(site.temp, t_min, t_max)).filled();
                        chart
                            .draw_series([
                                Circle::new((site.long, site.lat), radius, fill),
                                Circle::new((site.long, site.lat), radius, ring),
                            ])
                            .map_err(render_err)?;
                    }
                }
                Overlay::StudyArea(bbox) => {
                    let stroke = color(style.study_area).stroke_width(ctx.px(style.study_area_width));
                    chart
                        .draw_series(std::iter::once(Rectangle::new(
                            [(bbox.long_min, bbox.lat_min), (bbox.long_max, bbox.lat_max)],
                            stroke,
                        )))
                        .map_err(render_err)?;
                }
            }
        }

        let panel_size = PixelRect {
            x: 0,
            y: 0,
            width: panel.width,
            height: panel.height,
        };
        if let Overlay::Sites { scale, .. } = &overlay {
            if style.legend {
                draw_color_bar(&plot, panel_size, scale, ctx)?;
            }
            if style.north_arrow {
                draw_north_arrow(&plot, panel_size, ctx)?;
            }
        }
        draw_frame(&plot, panel_size, style.frame, ctx.px(style.frame_width))?;

        root.present().map_err(render_err)?;
    }

    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| MapError::Render("pixel buffer has the wrong size".to_string()))?;
    Ok(Figure::from_image(image))
}

fn to_xy<'a>(coords: impl Iterator<Item = &'a geo::Coord<f64>>) -> Vec<(f64, f64)> {
    coords.map(|c| (c.x, c.y)).collect()
}

/// Upper bound on graticule lines per direction
const MAX_GRATICULE_LINES: usize = 1000;

/// Meridians and parallels at multiples of `step` inside `extent`.
///
/// Returns nothing when `step` would give more than
/// [`MAX_GRATICULE_LINES`] lines in either direction.
fn graticule(extent: &BoundingBox, step: f64) -> Vec<Vec<(f64, f64)>> {
    let Some(longs) = multiples_within(extent.long_min, extent.long_max, step) else {
        warn!("Graticule step {} is too fine for this extent, skipped", step);
        return Vec::new();
    };
    let Some(lats) = multiples_within(extent.lat_min, extent.lat_max, step) else {
        warn!("Graticule step {} is too fine for this extent, skipped", step);
        return Vec::new();
    };

    longs
        .into_iter()
        .map(|long| vec![(long, extent.lat_min), (long, extent.lat_max)])
        .chain(
            lats.into_iter()
                .map(|lat| vec![(extent.long_min, lat), (extent.long_max, lat)]),
        )
        .collect()
}

/// Multiples of `step` in `[min, max]`, with a tolerance for rounding at both ends
fn multiples_within(min: f64, max: f64, step: f64) -> Option<Vec<f64>> {
    if !(step.is_finite() && step > 0.0) {
        return None;
    }
    let eps = 1e-9;
    let first = (min / step - eps).ceil() as i64;
    let last = (max / step + eps).floor() as i64;
    if last < first {
        return Some(Vec::new());
    }
    let count = (last - first + 1) as usize;
    if count > MAX_GRATICULE_LINES {
        return None;
    }
    Some((first..=last).map(|i| i as f64 * step).collect())
}

/// Vertical low-to-high gradient in the bottom-right corner of the panel
fn draw_color_bar(
    plot: &Area<'_>,
    panel: PixelRect,
    scale: &ColorScale,
    ctx: &RenderContext<'_>,
) -> Result<()> {
    let inset = ctx.px(ctx.style.padding) as i32;
    let bar_w = ((panel.width as f64 * 0.025).round() as i32).max(2);
    let bar_h = ((panel.height as f64 * 0.3).round() as i32).max(2);
    let right = panel.width as i32 - inset;
    let bottom = panel.height as i32 - inset;
    let (left, top) = (right - bar_w, bottom - bar_h);
    if left < 0 || top < 0 {
        debug!("Panel too small for a colour bar");
        return Ok(());
    }

    for row in 0..bar_h {
        let t = 1.0 - row as f64 / (bar_h - 1).max(1) as f64;
        let c = scale.low.lerp(scale.high, t);
        plot.draw(&Rectangle::new(
            [(left, top + row), (right, top + row + 1)],
            color(c).filled(),
        ))
        .map_err(render_err)?;
    }
    plot.draw(&Rectangle::new(
        [(left, top), (right, bottom)],
        color(ctx.style.frame).stroke_width(1),
    ))
    .map_err(render_err)?;
    Ok(())
}

/// Two-tone arrow in the top-right corner of the panel
fn draw_north_arrow(plot: &Area<'_>, panel: PixelRect, ctx: &RenderContext<'_>) -> Result<()> {
    let inset = ctx.px(ctx.style.padding) as i32;
    let half_w = ((panel.width.min(panel.height) as f64 * 0.025).round() as i32).max(2);
    let height = half_w * 3;
    let cx = panel.width as i32 - inset - half_w;
    let tip = inset;
    let base = tip + height;
    let notch = base - half_w;
    if cx - half_w < 0 || base > panel.height as i32 {
        debug!("Panel too small for a north arrow");
        return Ok(());
    }

    let dark = color(ctx.style.frame);
    plot.draw(&Polygon::new(vec![(cx, tip), (cx - half_w, base), (cx, notch)], dark.filled()))
        .map_err(render_err)?;
    plot.draw(&Polygon::new(
        vec![(cx, tip), (cx + half_w, base), (cx, notch)],
        color(Rgb::WHITE).filled(),
    ))
    .map_err(render_err)?;
    plot.draw(&PathElement::new(
        vec![(cx, tip), (cx + half_w, base), (cx, notch), (cx - half_w, base), (cx, tip)],
        dark.stroke_width(1),
    ))
    .map_err(render_err)?;
    Ok(())
}

fn draw_frame(plot: &Area<'_>, panel: PixelRect, frame: Rgb, width: u32) -> Result<()> {
    if width == 0 {
        return Ok(());
    }
    let (w, h) = (panel.width as i32, panel.height as i32);
    for i in 0..width as i32 {
        if 2 * i >= w.min(h) {
            break;
        }
        plot.draw(&Rectangle::new(
            [(i, i), (w - 1 - i, h - 1 - i)],
            color(frame).stroke_width(1),
        ))
        .map_err(render_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::models::{Crs, SiteRecord};
    use geo::{polygon, MultiPolygon};

    fn island() -> Basemap {
        Basemap::new(
            vec![BasemapFeature::Area(MultiPolygon::new(vec![polygon![
                (x: -125.3, y: 48.7),
                (x: -125.0, y: 48.7),
                (x: -125.0, y: 48.85),
                (x: -125.3, y: 48.85),
            ]]))],
            Crs::wgs84(),
        )
    }

    fn sites() -> SiteTable {
        SiteTable::new(vec![
            SiteRecord::new("S1", 48.83, -125.14, 12.0),
            SiteRecord::new("S2", 48.86, -125.11, 14.0),
        ])
    }

    #[test]
    fn test_graticule_lines() {
        let extent = BoundingBox::new(0.5, 2.5, 0.5, 1.5);
        let lines = graticule(&extent, 1.0);
        // meridian at 1, parallels at 1 and 2
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_graticule_keeps_last_line() {
        // 0.1 steps accumulate error when summed; the line at 0.7 must survive
        let extent = BoundingBox::new(0.0, 0.7, 0.0, 0.7);
        let lines = graticule(&extent, 0.1);
        assert_eq!(lines.len(), 16);
        let last_meridian = lines[7][0].0;
        assert!((last_meridian - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_graticule_too_fine_is_skipped() {
        let extent = BoundingBox::new(0.0, 10.0, 0.0, 10.0);
        assert!(graticule(&extent, 1e-6).is_empty());
        assert!(graticule(&extent, 0.0).is_empty());
    }

    #[test]
    fn test_render_is_deterministic() {
        let config = MapConfig::default();
        let ctx = RenderContext::new(&config.style, 72);
        let basemap = island();
        let sites = sites();
        let bbox = BoundingBox::from_sites(sites.records(), 0.05).unwrap();
        let scale = ColorScale::default();

        let render = || {
            render_map(
                &basemap,
                &bbox,
                Overlay::Sites {
                    sites: &sites,
                    scale: &scale,
                },
                &ctx,
                (240, 180),
            )
            .unwrap()
        };

        let first = render();
        assert_eq!(first.dimensions(), (240, 180));
        assert_eq!(first, render());
    }

    #[test]
    fn test_overview_draws_study_area() {
        let config = MapConfig::default();
        let ctx = RenderContext::new(&config.style, 72);
        let bbox = BoundingBox::new(48.78, 48.91, -125.19, -125.06);
        let extent = bbox.expand(1.0).unwrap();

        let figure =
            render_map(&island(), &extent, Overlay::StudyArea(&bbox), &ctx, (200, 120)).unwrap();
        let red = config.style.study_area;
        let has_outline = figure
            .image()
            .pixels()
            .any(|p| p.0 == [red.r, red.g, red.b]);
        assert!(has_outline);
    }
}
