//! Plane reconstruction from a sprite atlas.
//!
//! Sagittal planes are stored as tiles and come out with a single copy. The
//! coronal and axial planes cut across every tile, so they are reassembled
//! from one strip per sagittal slice:
//!
//! - coronal: the pixel column `y` of each tile becomes output column `x`
//! - axial: the pixel row of `z` in each tile becomes output column `x`, in a
//!   destination frame turned by a quarter so that anterior ends up on top

use image::{RgbaImage, imageops};
use rayon::prelude::*;
use tracing::debug;
use web_time::Instant;

use crate::atlas::Atlas;
use crate::enums::{Orientation, ReconstructionMode};
use crate::error::{Result, ViewerError};
use crate::geometry::{SliceCounts, TileRect, VolumeGeometry};

/// Destination frame strips are written through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Identity,
    /// Rotated by -90° and shifted by `extent`: `(u, v)` lands on
    /// `(v, extent - 1 - u)`.
    QuarterTurn { extent: u32 },
}

impl Frame {
    #[inline]
    fn map(self, u: u32, v: u32) -> (u32, u32) {
        match self {
            Frame::Identity => (u, v),
            Frame::QuarterTurn { extent } => (v, extent - 1 - u),
        }
    }
}

/// Copy `rect` of `source` into `dest` at `(dx, dy)` of the given frame.
fn blit_strip(
    source: &RgbaImage,
    rect: TileRect,
    dest: &mut RgbaImage,
    dx: u32,
    dy: u32,
    frame: Frame,
) {
    for j in 0..rect.height {
        for i in 0..rect.width {
            let pixel = *source.get_pixel(rect.x + i, rect.y + j);
            let (ox, oy) = frame.map(dx + i, dy + j);
            dest.put_pixel(ox, oy, pixel);
        }
    }
}

/// Pixel size `(width, height)` of the plane for `orientation`.
pub fn plane_size(slices: SliceCounts, orientation: Orientation) -> (u32, u32) {
    match orientation {
        Orientation::Sagittal => (slices.y, slices.z),
        Orientation::Coronal => (slices.x, slices.z),
        Orientation::Axial => (slices.x, slices.y),
    }
}

/// Reconstruct one plane straight from the atlas.
///
/// # Errors
///
/// Returns [`ViewerError::SliceOutOfRange`] if `slice` is outside the volume.
pub fn reconstruct_plane(atlas: &Atlas, orientation: Orientation, slice: u32) -> Result<RgbaImage> {
    let geometry = atlas.geometry();
    let slices = geometry.slices();
    let count = slices.get(orientation);
    if slice >= count {
        return Err(ViewerError::SliceOutOfRange {
            orientation,
            index: slice,
            count,
        });
    }

    let (width, height) = plane_size(slices, orientation);
    match orientation {
        Orientation::Sagittal => atlas.tile(slice),
        Orientation::Coronal => {
            let mut plane = RgbaImage::new(width, height);
            for xx in 0..slices.x {
                let tile = geometry.tile_rect(xx)?;
                let strip = TileRect::new(tile.x + slice, tile.y, 1, slices.z);
                blit_strip(atlas.image(), strip, &mut plane, xx, 0, Frame::Identity);
            }
            Ok(plane)
        }
        Orientation::Axial => {
            let mut plane = RgbaImage::new(width, height);
            let frame = Frame::QuarterTurn { extent: slices.y };
            let row = geometry.tile_row(slice);
            for xx in 0..slices.x {
                let tile = geometry.tile_rect(xx)?;
                let strip = TileRect::new(tile.x, tile.y + row, slices.y, 1);
                blit_strip(atlas.image(), strip, &mut plane, 0, xx, frame);
            }
            Ok(plane)
        }
    }
}

/// Every coronal or axial plane laid out as the tiles of a second atlas.
#[derive(Debug, Clone)]
struct Lookup {
    coronal: Atlas,
    axial: Atlas,
}

fn build_lookup(atlas: &Atlas, orientation: Orientation) -> Result<Atlas> {
    let slices = atlas.geometry().slices();
    let (width, height) = plane_size(slices, orientation);
    let count = slices.get(orientation);
    let columns = atlas.geometry().columns();
    let rows = count.div_ceil(columns);
    let geometry = VolumeGeometry::new(SliceCounts::new(count, width, height), columns, rows)?;

    let planes = (0..count)
        .into_par_iter()
        .map(|index| reconstruct_plane(atlas, orientation, index))
        .collect::<Result<Vec<_>>>()?;

    let mut image = RgbaImage::new(geometry.atlas_width(), geometry.atlas_height());
    for (index, plane) in planes.iter().enumerate() {
        let rect = geometry.tile_rect(index as u32)?;
        imageops::replace(&mut image, plane, i64::from(rect.x), i64::from(rect.y));
    }
    Ok(Atlas::from_parts(image, geometry))
}

/// Produces planes of one atlas in the configured [`ReconstructionMode`].
#[derive(Debug, Clone)]
pub struct PlaneReconstructor {
    atlas: Atlas,
    mode: ReconstructionMode,
    lookup: Option<Lookup>,
}

impl PlaneReconstructor {
    pub fn new(atlas: Atlas, mode: ReconstructionMode) -> Self {
        Self {
            atlas,
            mode,
            lookup: None,
        }
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        self.atlas.geometry()
    }

    pub fn mode(&self) -> ReconstructionMode {
        self.mode
    }

    /// Build the lookup atlases when running in precomputed mode. Costs one
    /// pass over every voxel and twice the atlas memory.
    pub fn prepare(&mut self) -> Result<()> {
        if self.mode != ReconstructionMode::Precomputed || self.lookup.is_some() {
            return Ok(());
        }
        let start = Instant::now();
        let coronal = build_lookup(&self.atlas, Orientation::Coronal)?;
        let axial = build_lookup(&self.atlas, Orientation::Axial)?;
        debug!(
            "Built lookup atlases {}x{} and {}x{} in {:?}",
            coronal.image().width(),
            coronal.image().height(),
            axial.image().width(),
            axial.image().height(),
            start.elapsed()
        );
        self.lookup = Some(Lookup { coronal, axial });
        Ok(())
    }

    /// The plane for `orientation` at `slice`.
    pub fn plane(&self, orientation: Orientation, slice: u32) -> Result<RgbaImage> {
        match (&self.lookup, orientation) {
            (_, Orientation::Sagittal) | (None, _) => {
                reconstruct_plane(&self.atlas, orientation, slice)
            }
            (Some(lookup), Orientation::Coronal) => lookup.coronal.tile(slice).map_err(|_| {
                ViewerError::SliceOutOfRange {
                    orientation,
                    index: slice,
                    count: self.geometry().slices().y,
                }
            }),
            (Some(lookup), Orientation::Axial) => lookup.axial.tile(slice).map_err(|_| {
                ViewerError::SliceOutOfRange {
                    orientation,
                    index: slice,
                    count: self.geometry().slices().z,
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Atlas of a 5x4x3 volume in a 3x2 grid (one empty cell) where every
    /// voxel encodes its own index as `[x, y, z, 255]`.
    fn indexed_atlas() -> Atlas {
        let geometry = VolumeGeometry::new(SliceCounts::new(5, 4, 3), 3, 2).unwrap();
        let mut image = RgbaImage::new(geometry.atlas_width(), geometry.atlas_height());
        for x in 0..5 {
            let rect = geometry.tile_rect(x).unwrap();
            for y in 0..4 {
                for z in 0..3 {
                    image.put_pixel(
                        rect.x + y,
                        rect.y + geometry.tile_row(z),
                        Rgba([x as u8, y as u8, z as u8, 255]),
                    );
                }
            }
        }
        Atlas::from_parts(image, geometry)
    }

    #[test]
    fn frame_quarter_turn() {
        let frame = Frame::QuarterTurn { extent: 4 };
        assert_eq!(frame.map(0, 2), (2, 3));
        assert_eq!(frame.map(3, 0), (0, 0));
    }

    #[test]
    fn sagittal_is_tile_copy() {
        let atlas = indexed_atlas();
        for x in 0..5 {
            let plane = reconstruct_plane(&atlas, Orientation::Sagittal, x).unwrap();
            let rect = atlas.geometry().tile_rect(x).unwrap();
            assert_eq!(plane, atlas.region(rect));
        }
    }

    #[test]
    fn coronal_sweeps_columns() {
        let atlas = indexed_atlas();
        let plane = reconstruct_plane(&atlas, Orientation::Coronal, 2).unwrap();
        assert_eq!(plane.dimensions(), (5, 3));
        for x in 0..5 {
            for row in 0..3 {
                let z = 2 - row;
                assert_eq!(plane.get_pixel(x, row).0, [x as u8, 2, z as u8, 255]);
            }
        }
    }

    #[test]
    fn axial_puts_anterior_on_top() {
        let atlas = indexed_atlas();
        let plane = reconstruct_plane(&atlas, Orientation::Axial, 1).unwrap();
        assert_eq!(plane.dimensions(), (5, 4));
        for x in 0..5 {
            for row in 0..4 {
                let y = 3 - row;
                assert_eq!(plane.get_pixel(x, row).0, [x as u8, y as u8, 1, 255]);
            }
        }
    }

    #[test]
    fn out_of_range_slice_is_an_error() {
        let atlas = indexed_atlas();
        assert!(matches!(
            reconstruct_plane(&atlas, Orientation::Coronal, 4),
            Err(ViewerError::SliceOutOfRange { index: 4, count: 4, .. })
        ));
    }

    #[test]
    fn precomputed_matches_incremental() {
        let atlas = indexed_atlas();
        let incremental = PlaneReconstructor::new(atlas.clone(), ReconstructionMode::Incremental);
        let mut precomputed = PlaneReconstructor::new(atlas, ReconstructionMode::Precomputed);
        precomputed.prepare().unwrap();

        for orientation in Orientation::ALL {
            let count = incremental.geometry().slices().get(orientation);
            for slice in 0..count {
                assert_eq!(
                    incremental.plane(orientation, slice).unwrap(),
                    precomputed.plane(orientation, slice).unwrap(),
                    "{orientation:?} {slice}"
                );
            }
        }
        assert!(precomputed.plane(Orientation::Axial, 3).is_err());
    }
}
