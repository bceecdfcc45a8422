//! Packing of a voxel volume into a sprite atlas.
//!
//! Volumes are indexed `[x, y, z]`. Each sagittal slice becomes one tile,
//! `ny` pixels wide and `nz` tall, with z increasing upwards.
//!
//! Scalar volumes can be packed through a color strip: values are windowed
//! onto `[vmin, vmax]`, looked up in the strip, and values within the
//! threshold are left transparent so the background shows through.

use image::{Rgba, RgbaImage, imageops};
use ndarray::{ArrayView2, ArrayView3, Axis};
use rayon::prelude::*;
use tracing::debug;
use web_time::Instant;

use crate::atlas::Atlas;
use crate::error::{Result, ViewerError};
use crate::geometry::{SliceCounts, VolumeGeometry};

/// Value range spread over the colors of a strip. Values outside it clamp
/// to the first or last color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub vmin: f64,
    pub vmax: f64,
}

impl Window {
    pub fn new(vmin: f64, vmax: f64) -> Self {
        Self { vmin, vmax }
    }

    /// Position of `value` in the window, in `[0, 1]`. An empty window maps
    /// everything to 0.
    pub fn fraction(&self, value: f64) -> f64 {
        let span = self.vmax - self.vmin;
        if span.is_nan() || span <= 0.0 {
            return 0.0;
        }
        ((value - self.vmin) / span).clamp(0.0, 1.0)
    }
}

pub struct SpritePacker;

impl SpritePacker {
    /// Grid `(columns, rows)` for `depth` slices, as close to square as the
    /// slice count allows.
    pub fn grid_for(depth: u32) -> (u32, u32) {
        if depth == 0 {
            return (0, 0);
        }
        let rows = f64::from(depth).sqrt().ceil() as u32;
        (depth.div_ceil(rows), rows)
    }

    #[inline]
    fn normalize_to_u8(value: u16) -> u8 {
        ((value as f32 / 65535.0) * 255.0).clamp(0.0, 255.0) as u8
    }

    #[inline]
    fn grey(value: u8) -> Rgba<u8> {
        Rgba([value, value, value, 255])
    }

    /// Pack an 8-bit volume as opaque grey.
    pub fn pack(volume: ArrayView3<'_, u8>) -> Result<Atlas> {
        Self::pack_with(volume, Self::grey)
    }

    /// Pack a 16-bit volume, scaling the full `u16` range onto grey levels.
    pub fn pack_u16(volume: ArrayView3<'_, u16>) -> Result<Atlas> {
        Self::pack_with(volume, |value| Self::grey(Self::normalize_to_u8(value)))
    }

    /// Whether `value` is hidden by `threshold`. A zero threshold hides exact
    /// zeros, any other hides `[-threshold, threshold]`.
    pub fn is_below_threshold(value: f64, threshold: f64) -> bool {
        let threshold = threshold.abs();
        if threshold == 0.0 {
            value == 0.0
        } else {
            value.abs() <= threshold
        }
    }

    /// A one pixel tall strip of `n_colors` samples of `colormap`, taken
    /// evenly over `[0, 1]` from first to last.
    pub fn color_strip<F>(n_colors: u32, colormap: F) -> Result<RgbaImage>
    where
        F: Fn(f64) -> Rgba<u8>,
    {
        if n_colors == 0 {
            return Err(ViewerError::EmptyColorMap);
        }
        let last = f64::from(n_colors - 1).max(1.0);
        Ok(RgbaImage::from_fn(n_colors, 1, |x, _| {
            colormap(f64::from(x) / last)
        }))
    }

    /// Pack a scalar volume through `strip`: each voxel takes the strip color
    /// at its position in `window`. Voxels hidden by `threshold` and
    /// non-finite voxels stay transparent.
    pub fn pack_windowed<T>(
        volume: ArrayView3<'_, T>,
        window: Window,
        threshold: Option<f64>,
        strip: &RgbaImage,
    ) -> Result<Atlas>
    where
        T: Copy + Sync + Into<f64>,
    {
        let colors = strip.width();
        if colors == 0 || strip.height() == 0 {
            return Err(ViewerError::EmptyColorMap);
        }
        Self::pack_with(volume, |value: T| {
            let value: f64 = value.into();
            if !value.is_finite() || threshold.is_some_and(|t| Self::is_below_threshold(value, t)) {
                return Rgba([0, 0, 0, 0]);
            }
            let index = (window.fraction(value) * f64::from(colors)).floor() as u32;
            *strip.get_pixel(index.min(colors - 1), 0)
        })
    }

    /// Pack a volume with a caller-supplied voxel to color mapping, e.g. a
    /// colormap for overlays. Cells after the last slice stay transparent.
    pub fn pack_with<T, F>(volume: ArrayView3<'_, T>, to_pixel: F) -> Result<Atlas>
    where
        T: Copy + Sync,
        F: Fn(T) -> Rgba<u8> + Sync,
    {
        let start = Instant::now();
        let (nx, ny, nz) = volume.dim();
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(ViewerError::EmptyDimension("volume"));
        }
        let slices = SliceCounts::new(nx as u32, ny as u32, nz as u32);
        let (columns, rows) = Self::grid_for(slices.x);
        let geometry = VolumeGeometry::new(slices, columns, rows)?;

        let tiles: Vec<RgbaImage> = volume
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|slice| Self::tile(slice, &to_pixel))
            .collect();

        let mut image = RgbaImage::new(geometry.atlas_width(), geometry.atlas_height());
        for (index, tile) in tiles.iter().enumerate() {
            let rect = geometry.tile_rect(index as u32)?;
            imageops::replace(&mut image, tile, i64::from(rect.x), i64::from(rect.y));
        }
        debug!(
            "Packed {}x{}x{} volume into {}x{} sprite in {:?}",
            nx,
            ny,
            nz,
            image.width(),
            image.height(),
            start.elapsed()
        );
        Ok(Atlas::from_parts(image, geometry))
    }

    fn tile<T, F>(slice: ArrayView2<'_, T>, to_pixel: &F) -> RgbaImage
    where
        T: Copy,
        F: Fn(T) -> Rgba<u8>,
    {
        let (ny, nz) = slice.dim();
        RgbaImage::from_fn(ny as u32, nz as u32, |px, py| {
            let z = nz - 1 - py as usize;
            to_pixel(slice[[px as usize, z]])
        })
    }
}
