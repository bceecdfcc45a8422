//! Recovery of the scalar value under the cursor from the overlay colors.
//!
//! The overlay pixel is read twice, composited over white and over black.
//! A pixel that reads back as pure white on the first pass and pure black on
//! the second has no color of its own and yields no value. This assumes the
//! overlay never holds an opaque pixel that is both, which no single color
//! can be; fully transparent pixels are the only ones caught.

use image::Rgba;
use tracing::warn;

use crate::atlas::Atlas;
use crate::colormap::ColorMap;
use crate::enums::Orientation;
use crate::error::Result;
use crate::geometry::{Position, VolumeGeometry};

const WHITE: [u8; 3] = [255, 255, 255];
const BLACK: [u8; 3] = [0, 0, 0];

/// Composite `pixel` over an opaque `fill` color.
#[inline]
pub(crate) fn composite_over(pixel: Rgba<u8>, fill: [u8; 3]) -> [u8; 3] {
    let alpha = u32::from(pixel[3]);
    let mut out = [0u8; 3];
    for c in 0..3 {
        let value = u32::from(pixel[c]) * alpha + u32::from(fill[c]) * (255 - alpha);
        out[c] = ((value + 127) / 255) as u8;
    }
    out
}

/// Overlay position matching a background position, per-axis rescaled.
pub fn overlay_position(
    background: &VolumeGeometry,
    overlay: &VolumeGeometry,
    position: Position,
) -> Position {
    let mut mapped = Position::default();
    for orientation in Orientation::ALL {
        mapped.set(
            orientation,
            background.rescale(orientation, position.get(orientation), overlay),
        );
    }
    mapped
}

/// Samples overlay values. A failed pixel read switches sampling off for the
/// lifetime of the sampler.
#[derive(Debug, Clone, Default)]
pub struct VoxelSampler {
    disabled: bool,
}

impl VoxelSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Value under `position`, or NaN when there is none to show.
    pub fn sample(
        &mut self,
        background: &VolumeGeometry,
        overlay: Option<&Atlas>,
        color_map: Option<&ColorMap>,
        position: Position,
    ) -> f64 {
        let (Some(overlay), Some(color_map)) = (overlay, color_map) else {
            return f64::NAN;
        };
        if self.disabled {
            return f64::NAN;
        }
        match Self::read(background, overlay, position) {
            Ok(Some(rgb)) => color_map.lookup(rgb),
            Ok(None) => f64::NAN,
            Err(err) => {
                warn!("Disabling voxel value sampling: {err}");
                self.disabled = true;
                f64::NAN
            }
        }
    }

    /// Overlay color under `position`, `None` for unset pixels.
    fn read(
        background: &VolumeGeometry,
        overlay: &Atlas,
        position: Position,
    ) -> Result<Option<[u8; 3]>> {
        let mapped = overlay_position(background, overlay.geometry(), position);
        let (px, py) = overlay.geometry().voxel_pixel(mapped)?;
        let pixel = overlay.read_pixel(px, py)?;

        let on_white = composite_over(pixel, WHITE);
        let on_black = composite_over(pixel, BLACK);
        if on_white == WHITE && on_black == BLACK {
            return Ok(None);
        }
        Ok(Some(on_black))
    }
}
