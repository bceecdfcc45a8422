//! Text labels drawn on top of the views.
//!
//! The compositor decides what each label says and where it goes; drawing is
//! delegated to a [`TextPainter`] so the engine carries no font of its own.

use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use image::{Rgba, RgbaImage};

use crate::error::{Result, ViewerError};
use crate::layout::ViewRect;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

/// Vertical meaning of a label's `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Baseline {
    Alphabetic,
    Middle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// Font size in pixels.
    pub size: f32,
    pub align: TextAlign,
    pub baseline: Baseline,
    pub color: Rgba<u8>,
}

/// Rasterizes labels into the canvas.
pub trait TextPainter {
    /// Draw `label`, touching no pixel outside `clip`.
    fn paint(&self, canvas: &mut RgbaImage, clip: ViewRect, label: &TextLabel);
}

/// [`TextPainter`] backed by an `ab_glyph` font.
pub struct GlyphPainter {
    font: FontArc,
}

impl GlyphPainter {
    /// Load a TrueType or OpenType font.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let font = FontArc::try_from_vec(bytes).map_err(|_| ViewerError::Font)?;
        Ok(Self { font })
    }

    pub fn from_font(font: FontArc) -> Self {
        Self { font }
    }

    /// Glyphs of one line positioned from x = 0, and the line width.
    fn layout(&self, text: &str, size: f32) -> (Vec<(GlyphId, f32)>, f32) {
        let scaled = self.font.as_scaled(size);
        let mut glyphs = Vec::with_capacity(text.len());
        let mut cursor_x = 0.0f32;
        let mut last_glyph: Option<GlyphId> = None;

        for ch in text.chars() {
            let glyph_id = self.font.glyph_id(ch);
            if let Some(prev) = last_glyph {
                cursor_x += scaled.kern(prev, glyph_id);
            }
            glyphs.push((glyph_id, cursor_x));
            cursor_x += scaled.h_advance(glyph_id);
            last_glyph = Some(glyph_id);
        }
        (glyphs, cursor_x)
    }
}

impl TextPainter for GlyphPainter {
    fn paint(&self, canvas: &mut RgbaImage, clip: ViewRect, label: &TextLabel) {
        let (glyphs, width) = self.layout(&label.text, label.size);
        let scaled = self.font.as_scaled(label.size);

        let origin_x = match label.align {
            TextAlign::Left => label.x,
            TextAlign::Center => label.x - width * 0.5,
        };
        let baseline = match label.baseline {
            Baseline::Alphabetic => label.y,
            Baseline::Middle => label.y + (scaled.ascent() + scaled.descent()) * 0.5,
        };

        for (glyph_id, gx) in glyphs {
            let glyph = glyph_id.with_scale_and_position(label.size, point(origin_x + gx, baseline));
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = bounds.min.x as i64 + i64::from(px);
                let y = bounds.min.y as i64 + i64::from(py);
                if !clip.contains(x, y) || x >= i64::from(canvas.width()) || y >= i64::from(canvas.height())
                {
                    return;
                }
                let target = canvas.get_pixel_mut(x as u32, y as u32);
                blend(target, label.color, coverage);
            });
        }
    }
}

/// Blend `color` over `target` with `coverage` in `[0, 1]`.
#[inline]
fn blend(target: &mut Rgba<u8>, color: Rgba<u8>, coverage: f32) {
    let alpha = coverage.clamp(0.0, 1.0) * f32::from(color[3]) / 255.0;
    for c in 0..3 {
        let value = f32::from(color[c]) * alpha + f32::from(target[c]) * (1.0 - alpha);
        target[c] = value.round() as u8;
    }
}

/// Format `value` with `digits` significant digits and drop trailing zeros
/// of the fraction, e.g. `1.50` becomes `1.5`.
pub fn format_significant(value: f64, digits: u32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let digits = digits.max(1) as i32;
    let text = if value == 0.0 {
        "0".to_string()
    } else {
        let exponent = value.abs().log10().floor() as i32;
        if exponent >= digits {
            let factor = 10f64.powi(exponent - digits + 1);
            format!("{:.0}", (value / factor).round() * factor)
        } else {
            let decimals = (digits - 1 - exponent).clamp(0, 20) as usize;
            format!("{value:.decimals$}")
        }
    };
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Round half up, the way coordinate labels are shown.
#[inline]
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn significant_digits() {
        assert_eq!(format_significant(1.5, 3), "1.5");
        assert_eq!(format_significant(0.123456, 3), "0.123");
        assert_eq!(format_significant(-2.0, 3), "-2");
        assert_eq!(format_significant(12.345, 3), "12.3");
        assert_eq!(format_significant(100.0, 3), "100");
        assert_eq!(format_significant(12345.0, 3), "12300");
        assert_eq!(format_significant(0.0, 3), "0");
        assert_eq!(format_significant(f64::NAN, 3), "NaN");
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
    }

    #[test]
    fn blend_respects_coverage() {
        let mut pixel = Rgba([0, 0, 0, 255]);
        blend(&mut pixel, Rgba([255, 255, 255, 255]), 1.0);
        assert_eq!(pixel, Rgba([255, 255, 255, 255]));

        let mut pixel = Rgba([0, 0, 0, 255]);
        blend(&mut pixel, Rgba([200, 100, 0, 255]), 0.5);
        assert_eq!(pixel, Rgba([100, 50, 0, 255]));
    }

    #[test]
    fn invalid_font_bytes() {
        assert!(matches!(
            GlyphPainter::from_bytes(vec![0, 1, 2, 3]),
            Err(ViewerError::Font)
        ));
    }
}
