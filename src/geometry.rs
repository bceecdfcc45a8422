//! Mapping between voxel indices and tiles of a sprite atlas.
//!
//! An atlas packs the sagittal slices of a volume into a grid, row-major from
//! the top-left corner. Each tile is `y` pixels wide and `z` pixels tall, with
//! the last z index on the top pixel row.
//!
//! ```text
//!  col 0   col 1   col 2
//! ┌───────┬───────┬───────┐
//! │ x = 0 │ x = 1 │ x = 2 │  row 0
//! ├───────┼───────┼───────┤
//! │ x = 3 │ x = 4 │       │  row 1
//! └───────┴───────┴───────┘
//! ```

use serde::Deserialize;

use crate::enums::Orientation;
use crate::error::{Result, ViewerError};
use crate::interpolator::Interpolator;

/// Number of slices along each volume axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct SliceCounts {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl SliceCounts {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, orientation: Orientation) -> u32 {
        match orientation {
            Orientation::Sagittal => self.x,
            Orientation::Coronal => self.y,
            Orientation::Axial => self.z,
        }
    }
}

/// A voxel index triple. Always within the slice counts of the volume it
/// belongs to once it has gone through [`VolumeGeometry::clamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Position {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, orientation: Orientation) -> u32 {
        match orientation {
            Orientation::Sagittal => self.x,
            Orientation::Coronal => self.y,
            Orientation::Axial => self.z,
        }
    }

    pub fn set(&mut self, orientation: Orientation, index: u32) {
        match orientation {
            Orientation::Sagittal => self.x = index,
            Orientation::Coronal => self.y = index,
            Orientation::Axial => self.z = index,
        }
    }
}

/// Pixel rectangle inside an atlas or plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

/// Tile grid of an atlas together with the volume dimensions it encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolumeGeometry {
    slices: SliceCounts,
    columns: u32,
    rows: u32,
}

impl VolumeGeometry {
    /// Build a geometry from explicit slice counts and grid size.
    ///
    /// # Errors
    ///
    /// Returns an error if any dimension is zero or if the grid has fewer
    /// cells than `slices.x`.
    pub fn new(slices: SliceCounts, columns: u32, rows: u32) -> Result<Self> {
        if slices.x == 0 {
            return Err(ViewerError::EmptyDimension("volume depth"));
        }
        if slices.y == 0 || slices.z == 0 {
            return Err(ViewerError::EmptyDimension("tile size"));
        }
        if columns == 0 || rows == 0 {
            return Err(ViewerError::EmptyDimension("tile grid"));
        }
        if u64::from(columns) * u64::from(rows) < u64::from(slices.x) {
            return Err(ViewerError::DepthExceedsGrid {
                depth: slices.x,
                columns,
                rows,
            });
        }
        Ok(Self {
            slices,
            columns,
            rows,
        })
    }

    /// Derive the tile grid from the atlas pixel size.
    ///
    /// # Arguments
    ///
    /// * `atlas_width`, `atlas_height` - Atlas size in pixels
    /// * `tile_width` - Pixel width of one tile (the y slice count)
    /// * `tile_height` - Pixel height of one tile (the z slice count)
    /// * `depth` - Explicit x slice count, defaults to `columns * rows`
    ///
    /// # Errors
    ///
    /// An atlas whose size is not an exact multiple of the tile size is a
    /// configuration error and is reported rather than rounded.
    pub fn from_atlas(
        atlas_width: u32,
        atlas_height: u32,
        tile_width: u32,
        tile_height: u32,
        depth: Option<u32>,
    ) -> Result<Self> {
        if tile_width == 0 || tile_height == 0 {
            return Err(ViewerError::EmptyDimension("tile size"));
        }
        if atlas_width % tile_width != 0 {
            return Err(ViewerError::NonDivisibleAtlas {
                dimension: "width",
                atlas: atlas_width,
                tile: tile_width,
            });
        }
        if atlas_height % tile_height != 0 {
            return Err(ViewerError::NonDivisibleAtlas {
                dimension: "height",
                atlas: atlas_height,
                tile: tile_height,
            });
        }
        let columns = atlas_width / tile_width;
        let rows = atlas_height / tile_height;
        let depth = match depth {
            Some(depth) => depth,
            None => columns
                .checked_mul(rows)
                .ok_or(ViewerError::DepthExceedsGrid {
                    depth: u32::MAX,
                    columns,
                    rows,
                })?,
        };
        Self::new(SliceCounts::new(depth, tile_width, tile_height), columns, rows)
    }

    pub fn slices(&self) -> SliceCounts {
        self.slices
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn tile_width(&self) -> u32 {
        self.slices.y
    }

    pub fn tile_height(&self) -> u32 {
        self.slices.z
    }

    pub fn atlas_width(&self) -> u32 {
        self.columns * self.slices.y
    }

    pub fn atlas_height(&self) -> u32 {
        self.rows * self.slices.z
    }

    /// Grid cell `(column, row)` of a sagittal slice.
    fn cell(&self, slice: u32) -> (u32, u32) {
        let column = slice % self.columns;
        let row = (slice - column) / self.columns;
        (column, row)
    }

    /// Pixel rectangle of the tile holding sagittal slice `slice`.
    pub fn tile_rect(&self, slice: u32) -> Result<TileRect> {
        if slice >= self.slices.x {
            return Err(ViewerError::SliceOutOfRange {
                orientation: Orientation::Sagittal,
                index: slice,
                count: self.slices.x,
            });
        }
        let (column, row) = self.cell(slice);
        Ok(TileRect::new(
            column * self.slices.y,
            row * self.slices.z,
            self.slices.y,
            self.slices.z,
        ))
    }

    /// Inverse of [`tile_rect`](Self::tile_rect): the slice whose tile covers
    /// the atlas pixel, if any. Empty trailing cells map to `None`.
    pub fn tile_at(&self, px: u32, py: u32) -> Option<u32> {
        if px >= self.atlas_width() || py >= self.atlas_height() {
            return None;
        }
        let slice = (py / self.slices.z) * self.columns + px / self.slices.y;
        (slice < self.slices.x).then_some(slice)
    }

    /// Pixel row inside a tile for axial index `z`.
    #[inline]
    pub fn tile_row(&self, z: u32) -> u32 {
        self.slices.z - 1 - z
    }

    /// Atlas pixel holding the voxel at `position`.
    pub fn voxel_pixel(&self, position: Position) -> Result<(u32, u32)> {
        for orientation in Orientation::ALL {
            let count = self.slices.get(orientation);
            let index = position.get(orientation);
            if index >= count {
                return Err(ViewerError::SliceOutOfRange {
                    orientation,
                    index,
                    count,
                });
            }
        }
        let rect = self.tile_rect(position.x)?;
        Ok((rect.x + position.y, rect.y + self.tile_row(position.z)))
    }

    /// Clamp a signed index into `[0, count - 1]` for the given axis.
    pub fn clamp(&self, orientation: Orientation, index: i64) -> u32 {
        let max = i64::from(self.slices.get(orientation)) - 1;
        index.clamp(0, max) as u32
    }

    /// Default cursor: `floor(n / 2)` on every axis.
    pub fn center(&self) -> Position {
        Position::new(self.slices.x / 2, self.slices.y / 2, self.slices.z / 2)
    }

    /// Map an index on this volume's axis to the index of another volume
    /// sampled at a different resolution along the same axis: the other
    /// volume's cell containing the center of cell `index`. Planes are scaled
    /// with the same rule, so the mapped voxel is the one on screen.
    pub fn rescale(&self, orientation: Orientation, index: u32, other: &VolumeGeometry) -> u32 {
        Interpolator::nearest_index(
            index,
            self.slices.get(orientation),
            other.slices.get(orientation),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> VolumeGeometry {
        // 10 slices of 64x64 in a 5x2 grid
        VolumeGeometry::from_atlas(320, 128, 64, 64, None).unwrap()
    }

    #[test]
    fn derives_grid_from_atlas_size() {
        let geometry = grid();
        assert_eq!(geometry.columns(), 5);
        assert_eq!(geometry.rows(), 2);
        assert_eq!(geometry.slices(), SliceCounts::new(10, 64, 64));
    }

    #[test]
    fn explicit_depth_overrides_grid_fill() {
        let geometry = VolumeGeometry::from_atlas(320, 128, 64, 64, Some(7)).unwrap();
        assert_eq!(geometry.slices().x, 7);
        assert!(geometry.tile_rect(7).is_err());
    }

    #[test]
    fn rejects_non_divisible_atlas() {
        let err = VolumeGeometry::from_atlas(321, 128, 64, 64, None).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::NonDivisibleAtlas {
                dimension: "width",
                ..
            }
        ));
        let err = VolumeGeometry::from_atlas(320, 100, 64, 64, None).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::NonDivisibleAtlas {
                dimension: "height",
                ..
            }
        ));
    }

    #[test]
    fn rejects_depth_beyond_grid() {
        let err = VolumeGeometry::from_atlas(320, 128, 64, 64, Some(11)).unwrap_err();
        assert!(matches!(err, ViewerError::DepthExceedsGrid { depth: 11, .. }));
    }

    #[test]
    fn tile_rect_walks_rows() {
        let geometry = grid();
        assert_eq!(geometry.tile_rect(0).unwrap(), TileRect::new(0, 0, 64, 64));
        assert_eq!(geometry.tile_rect(4).unwrap(), TileRect::new(256, 0, 64, 64));
        assert_eq!(geometry.tile_rect(5).unwrap(), TileRect::new(0, 64, 64, 64));
        assert_eq!(geometry.tile_rect(8).unwrap(), TileRect::new(192, 64, 64, 64));
        assert!(matches!(
            geometry.tile_rect(10),
            Err(ViewerError::SliceOutOfRange { index: 10, count: 10, .. })
        ));
    }

    #[test]
    fn tile_at_inverts_tile_rect() {
        let geometry = grid();
        for slice in 0..10 {
            let rect = geometry.tile_rect(slice).unwrap();
            assert_eq!(geometry.tile_at(rect.x, rect.y), Some(slice));
            assert_eq!(
                geometry.tile_at(rect.x + rect.width - 1, rect.y + rect.height - 1),
                Some(slice)
            );
        }
        assert_eq!(geometry.tile_at(320, 0), None);
    }

    #[test]
    fn tile_at_skips_empty_cells() {
        let geometry = VolumeGeometry::from_atlas(320, 128, 64, 64, Some(8)).unwrap();
        assert_eq!(geometry.tile_at(200, 70), None);
        assert_eq!(geometry.tile_at(130, 70), Some(7));
    }

    #[test]
    fn voxel_pixel_flips_z() {
        let geometry = grid();
        let (px, py) = geometry.voxel_pixel(Position::new(6, 3, 0)).unwrap();
        assert_eq!((px, py), (64 + 3, 64 + 63));
        assert!(geometry.voxel_pixel(Position::new(0, 64, 0)).is_err());
    }

    #[test]
    fn clamp_and_center() {
        let geometry = grid();
        assert_eq!(geometry.clamp(Orientation::Sagittal, 110), 9);
        assert_eq!(geometry.clamp(Orientation::Sagittal, -5), 0);
        assert_eq!(geometry.clamp(Orientation::Axial, 31), 31);
        assert_eq!(geometry.center(), Position::new(5, 32, 32));
    }

    #[test]
    fn rescale_between_resolutions() {
        let background = grid();
        let overlay = VolumeGeometry::from_atlas(160, 64, 32, 32, None).unwrap();
        assert_eq!(background.rescale(Orientation::Coronal, 63, &overlay), 31);
        assert_eq!(background.rescale(Orientation::Coronal, 10, &overlay), 5);
        assert_eq!(background.rescale(Orientation::Sagittal, 9, &overlay), 9);
        // cell centers: 8 -> 4 maps pairs of indices onto one
        let fine = VolumeGeometry::new(SliceCounts::new(4, 8, 8), 2, 2).unwrap();
        let coarse = VolumeGeometry::new(SliceCounts::new(4, 4, 4), 2, 2).unwrap();
        let mapped = (0..8)
            .map(|y| fine.rescale(Orientation::Coronal, y, &coarse))
            .collect::<Vec<_>>();
        assert_eq!(mapped, vec![0, 0, 1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn huge_grid_does_not_overflow() {
        let err = VolumeGeometry::from_atlas(1 << 20, 1 << 20, 1, 1, None).unwrap_err();
        assert!(matches!(err, ViewerError::DepthExceedsGrid { .. }));
    }
}
