//! Composition of one view into its column of the canvas.
//!
//! Layers, bottom to top: background fill, background plane with the overlay
//! plane blended in, crosshair, then colorbar and text labels. The plane is
//! assembled at native resolution and scaled into the view rect in one step.

use glam::DVec3;
use image::{Rgba, RgbaImage, imageops};
use tracing::trace;

use crate::colormap::ColorMap;
use crate::config::ViewerConfig;
use crate::enums::{Interpolation, Orientation};
use crate::error::Result;
use crate::geometry::{Position, SliceCounts, TileRect};
use crate::interpolator::Interpolator;
use crate::layout::{Layout, ViewRect};
use crate::reconstruct::{PlaneReconstructor, plane_size};
use crate::text::{Baseline, TextAlign, TextLabel, TextPainter, format_significant, round_half_up};

/// Fraction of a view's width kept free at each side of the L/R labels.
const LR_PADDING: f64 = 0.05;
/// Vertical position of the L/R labels as a fraction of the canvas height.
const LR_TOP: f64 = 0.22;

/// Overlay planes and the opacity they are blended with.
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    pub planes: PlaneReconstructor,
    pub opacity: f32,
}

/// Everything a view render reads. Borrowed from the viewer for one render.
pub(crate) struct Scene<'a> {
    pub config: &'a ViewerConfig,
    pub layout: &'a Layout,
    pub background: &'a PlaneReconstructor,
    pub overlay: Option<&'a OverlayLayer>,
    pub color_map: Option<&'a ColorMap>,
    pub position: Position,
    pub world: DVec3,
    pub value: f64,
}

/// What was drawn for a view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRender {
    pub orientation: Orientation,
    pub rect: ViewRect,
    pub labels: Vec<TextLabel>,
}

/// Source-over of `top`, its alpha scaled by `opacity`, onto `bottom`.
#[inline]
fn over_pixel(bottom: &mut Rgba<u8>, top: Rgba<u8>, opacity: f32) {
    let top_alpha = f32::from(top[3]) / 255.0 * opacity;
    if top_alpha <= 0.0 {
        return;
    }
    if top_alpha >= 1.0 {
        *bottom = top;
        return;
    }
    let bottom_alpha = f32::from(bottom[3]) / 255.0;
    let alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);
    for c in 0..3 {
        let premultiplied = f32::from(top[c]) * top_alpha
            + f32::from(bottom[c]) * bottom_alpha * (1.0 - top_alpha);
        bottom[c] = (premultiplied / alpha).round().clamp(0.0, 255.0) as u8;
    }
    bottom[3] = (alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Blend `overlay` onto `base` of the same size.
pub(crate) fn blend_overlay(base: &mut RgbaImage, overlay: &RgbaImage, opacity: f32) {
    for (bottom, top) in base.pixels_mut().zip(overlay.pixels()) {
        over_pixel(bottom, *top, opacity);
    }
}

/// Distance kept between a crosshair line and the plane edge.
#[inline]
fn crosshair_inset(count: u32, size: f64) -> u32 {
    (((1.0 - size) * f64::from(count)) / 2.0).ceil().max(0.0) as u32
}

/// The vertical and horizontal crosshair lines of a plane, in plane pixels.
pub fn crosshair_lines(
    orientation: Orientation,
    slices: SliceCounts,
    position: Position,
    size: f64,
) -> [TileRect; 2] {
    let (horizontal, vertical) = orientation.in_plane();
    let width = slices.get(horizontal);
    let height = slices.get(vertical);
    let inset_w = crosshair_inset(width, size);
    let inset_h = crosshair_inset(height, size);

    let column = position.get(horizontal);
    let row = height - 1 - position.get(vertical);
    [
        TileRect::new(column, inset_h, 1, height.saturating_sub(2 * inset_h)),
        TileRect::new(inset_w, row, width.saturating_sub(2 * inset_w), 1),
    ]
}

fn fill_rect(canvas: &mut RgbaImage, rect: ViewRect, color: Rgba<u8>) {
    let right = rect.right().min(canvas.width());
    let bottom = rect.bottom().min(canvas.height());
    for y in rect.top..bottom {
        for x in rect.left..right {
            canvas.put_pixel(x, y, color);
        }
    }
}

impl Scene<'_> {
    fn slices(&self) -> SliceCounts {
        self.background.geometry().slices()
    }

    fn interpolation(&self) -> Interpolation {
        Interpolation::from_smooth(self.config.smooth)
    }

    fn font_px(&self) -> f64 {
        (self.config.font_size * f64::from(self.layout.height_max())).round()
    }

    /// Native resolution plane with overlay and crosshair applied.
    pub fn plane(&self, orientation: Orientation) -> Result<RgbaImage> {
        let slices = self.slices();
        let index = self.position.get(orientation);
        let mut plane = self.background.plane(orientation, index)?;

        if let Some(overlay) = self.overlay {
            let overlay_geometry = overlay.planes.geometry();
            let overlay_index =
                self.background
                    .geometry()
                    .rescale(orientation, index, overlay_geometry);
            let mut overlay_plane = overlay.planes.plane(orientation, overlay_index)?;
            let (width, height) = plane_size(slices, orientation);
            if overlay_plane.dimensions() != (width, height) {
                overlay_plane =
                    Interpolator::scale(&overlay_plane, width, height, Interpolation::None);
            }
            blend_overlay(&mut plane, &overlay_plane, overlay.opacity);
        }

        if self.config.crosshair {
            let color = self.config.crosshair_color;
            for line in crosshair_lines(orientation, slices, self.position, self.config.crosshair_size)
            {
                for y in line.y..line.y + line.height {
                    for x in line.x..line.x + line.width {
                        plane.put_pixel(x, y, color);
                    }
                }
            }
        }
        Ok(plane)
    }

    /// Redraw the column of `orientation`; nothing outside it is touched.
    pub fn render_view(
        &self,
        canvas: &mut RgbaImage,
        orientation: Orientation,
        painter: Option<&dyn TextPainter>,
    ) -> Result<ViewRender> {
        let column = self.layout.column(orientation);
        let view = self.layout.view(orientation);
        trace!(?orientation, ?view, "Rendering view");

        fill_rect(canvas, column, self.config.background_color);

        if view.width > 0 && view.height > 0 {
            let plane = self.plane(orientation)?;
            let scaled = Interpolator::scale(&plane, view.width, view.height, self.interpolation());
            imageops::overlay(canvas, &scaled, i64::from(view.left), i64::from(view.top));
        }

        if orientation == Orientation::Coronal {
            self.draw_colorbar(canvas, column);
        }

        let labels = self.labels(orientation);
        if let Some(painter) = painter {
            for label in &labels {
                painter.paint(canvas, column, label);
            }
        }

        Ok(ViewRender {
            orientation,
            rect: view,
            labels,
        })
    }

    /// Colorbar rect inside the coronal column, if one is shown.
    pub fn colorbar_rect(&self) -> Option<ViewRect> {
        let color_map = self.color_map?;
        if color_map.hidden() {
            return None;
        }
        let coronal = self.layout.view(Orientation::Coronal);
        let height_max = f64::from(self.layout.height_max());
        let width = f64::from(coronal.width);
        Some(ViewRect {
            left: (f64::from(coronal.left) + width * 0.2).round() as u32,
            top: (height_max * self.config.colorbar_height / 2.0).round() as u32,
            width: (width * 0.6).round() as u32,
            height: (height_max * self.config.colorbar_height).round() as u32,
        })
    }

    fn draw_colorbar(&self, canvas: &mut RgbaImage, column: ViewRect) {
        let (Some(color_map), Some(rect)) = (self.color_map, self.colorbar_rect()) else {
            return;
        };
        let width = rect.width.min(column.right().saturating_sub(rect.left));
        let height = rect.height.min(canvas.height().saturating_sub(rect.top));
        if width == 0 || height == 0 {
            return;
        }
        let bar = Interpolator::scale(color_map.strip(), width, height, self.interpolation());
        imageops::overlay(canvas, &bar, i64::from(rect.left), i64::from(rect.top));
    }

    fn label(&self, text: String, x: f64, y: f64, align: TextAlign, baseline: Baseline) -> TextLabel {
        TextLabel {
            text,
            x: x as f32,
            y: y as f32,
            size: self.font_px() as f32,
            align,
            baseline,
            color: self.config.font_color,
        }
    }

    /// Text labels of a view, in drawing order.
    pub fn labels(&self, orientation: Orientation) -> Vec<TextLabel> {
        let mut labels = Vec::new();
        let view = self.layout.view(orientation);
        let left = f64::from(view.left);
        let width = f64::from(view.width);
        let height_max = f64::from(self.layout.height_max());
        let canvas_height = f64::from(self.layout.canvas_height());
        let font_px = self.font_px();
        let colorbar = self.config.colorbar_height;
        let decimals = self.config.decimals;

        // upper text line and the one below it
        let first_line = (height_max * colorbar + font_px / 4.0).round();
        let second_line = (height_max * colorbar * 2.0 + 0.75 * font_px).round();

        if orientation == Orientation::Sagittal {
            if let Some(title) = &self.config.title {
                labels.push(self.label(
                    title.clone(),
                    (width / 10.0).round(),
                    first_line,
                    TextAlign::Left,
                    Baseline::Alphabetic,
                ));
            }
            if self.config.show_value {
                let value = if self.value.is_nan() {
                    "no value".to_string()
                } else {
                    format_significant(self.value, decimals)
                };
                labels.push(self.label(
                    format!("value = {value}"),
                    (width / 10.0).round(),
                    second_line,
                    TextAlign::Left,
                    Baseline::Alphabetic,
                ));
            }
        }

        if orientation == Orientation::Coronal && self.colorbar_rect().is_some() {
            if let Some(color_map) = self.color_map {
                labels.push(self.label(
                    format_significant(color_map.min(), decimals),
                    left + width * 0.2,
                    second_line,
                    TextAlign::Center,
                    Baseline::Alphabetic,
                ));
                labels.push(self.label(
                    format_significant(color_map.max(), decimals),
                    left + width * 0.8,
                    second_line,
                    TextAlign::Center,
                    Baseline::Alphabetic,
                ));
            }
        }

        if self.config.show_coordinates {
            let coordinate = match orientation {
                Orientation::Sagittal => self.world.x,
                Orientation::Coronal => self.world.y,
                Orientation::Axial => self.world.z,
            };
            labels.push(self.label(
                format!(
                    "{} = {}",
                    orientation.axis_name(),
                    round_half_up(coordinate)
                ),
                left + width / 2.0,
                (canvas_height - font_px / 2.0).round(),
                TextAlign::Center,
                Baseline::Alphabetic,
            ));
        }

        if self.config.show_lr && orientation != Orientation::Sagittal {
            let (near, far) = if self.config.radiological {
                ("R", "L")
            } else {
                ("L", "R")
            };
            let top = (LR_TOP * canvas_height).round();
            let offset = width * LR_PADDING;
            labels.push(self.label(
                near.to_string(),
                left + offset,
                top,
                TextAlign::Center,
                Baseline::Middle,
            ));
            labels.push(self.label(
                far.to_string(),
                left + width - offset,
                top,
                TextAlign::Center,
                Baseline::Middle,
            ));
        }

        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crosshair_inset_for_default_size() {
        let slices = SliceCounts::new(100, 100, 100);
        let position = Position::new(50, 40, 30);
        let [vertical, horizontal] =
            crosshair_lines(Orientation::Coronal, slices, position, 0.9);
        assert_eq!(vertical, TileRect::new(50, 5, 1, 90));
        assert_eq!(vertical.y + vertical.height, 95);
        assert_eq!(horizontal, TileRect::new(5, 69, 90, 1));
    }

    #[test]
    fn crosshair_axes_per_view() {
        let slices = SliceCounts::new(10, 20, 30);
        let position = Position::new(3, 4, 5);

        let [v, h] = crosshair_lines(Orientation::Sagittal, slices, position, 1.0);
        assert_eq!(v, TileRect::new(4, 0, 1, 30));
        assert_eq!(h, TileRect::new(0, 24, 20, 1));

        let [v, h] = crosshair_lines(Orientation::Axial, slices, position, 1.0);
        assert_eq!(v, TileRect::new(3, 0, 1, 20));
        assert_eq!(h, TileRect::new(0, 15, 10, 1));
    }

    #[test]
    fn overlay_blend_uses_alpha_and_opacity() {
        let mut base = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        let overlay = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([200, 100, 50, 255])
            } else {
                Rgba([200, 100, 50, 0])
            }
        });
        blend_overlay(&mut base, &overlay, 0.5);
        assert_eq!(base.get_pixel(0, 0).0, [100, 50, 25, 255]);
        assert_eq!(base.get_pixel(1, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn overlay_blend_over_transparent_base() {
        let overlay = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));

        let mut base = RgbaImage::new(1, 1);
        blend_overlay(&mut base, &overlay, 1.0);
        assert_eq!(base.get_pixel(0, 0).0, [255, 0, 0, 255]);

        let mut base = RgbaImage::new(1, 1);
        blend_overlay(&mut base, &overlay, 0.5);
        assert_eq!(base.get_pixel(0, 0).0, [255, 0, 0, 128]);
    }

    #[test]
    fn fill_is_clipped_to_canvas() {
        let mut canvas = RgbaImage::new(4, 4);
        fill_rect(
            &mut canvas,
            ViewRect {
                left: 2,
                top: 0,
                width: 5,
                height: 9,
            },
            Rgba([1, 2, 3, 255]),
        );
        assert_eq!(canvas.get_pixel(3, 3).0, [1, 2, 3, 255]);
        assert_eq!(canvas.get_pixel(1, 3).0, [0, 0, 0, 0]);
    }
}
