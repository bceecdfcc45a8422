use image::{Rgba, RgbaImage, imageops};

use crate::error::{Result, ViewerError};
use crate::geometry::{TileRect, VolumeGeometry};

/// A decoded sprite image together with the tile grid it is laid out in.
#[derive(Debug, Clone)]
pub struct Atlas {
    image: RgbaImage,
    geometry: VolumeGeometry,
}

impl Atlas {
    /// Wrap a decoded sprite.
    ///
    /// # Arguments
    ///
    /// * `image` - The decoded sprite
    /// * `tile_width` - Width of one tile in pixels (y slice count)
    /// * `tile_height` - Height of one tile in pixels (z slice count)
    /// * `depth` - Explicit x slice count, when the last grid row is not full
    ///
    /// # Errors
    ///
    /// Returns an error if the sprite size is not a multiple of the tile size.
    pub fn new(
        image: RgbaImage,
        tile_width: u32,
        tile_height: u32,
        depth: Option<u32>,
    ) -> Result<Self> {
        let geometry = VolumeGeometry::from_atlas(
            image.width(),
            image.height(),
            tile_width,
            tile_height,
            depth,
        )?;
        Ok(Self { image, geometry })
    }

    pub(crate) fn from_parts(image: RgbaImage, geometry: VolumeGeometry) -> Self {
        Self { image, geometry }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// Read one atlas pixel.
    pub fn read_pixel(&self, x: u32, y: u32) -> Result<Rgba<u8>> {
        self.image
            .get_pixel_checked(x, y)
            .copied()
            .ok_or(ViewerError::PixelRead {
                x,
                y,
                width: self.image.width(),
                height: self.image.height(),
            })
    }

    /// Copy out a rectangle of the atlas.
    pub fn region(&self, rect: TileRect) -> RgbaImage {
        imageops::crop_imm(&self.image, rect.x, rect.y, rect.width, rect.height).to_image()
    }

    /// Copy out the tile of sagittal slice `slice`.
    pub fn tile(&self, slice: u32) -> Result<RgbaImage> {
        let rect = self.geometry.tile_rect(slice)?;
        Ok(self.region(rect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_copies_grid_cell() {
        let image = RgbaImage::from_fn(6, 4, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let atlas = Atlas::new(image, 3, 2, None).unwrap();
        let tile = atlas.tile(3).unwrap();
        assert_eq!(tile.dimensions(), (3, 2));
        assert_eq!(*tile.get_pixel(0, 0), Rgba([3, 2, 0, 255]));
        assert_eq!(*tile.get_pixel(2, 1), Rgba([5, 3, 0, 255]));
    }

    #[test]
    fn read_pixel_reports_out_of_bounds() {
        let atlas = Atlas::new(RgbaImage::new(4, 4), 2, 2, None).unwrap();
        assert!(atlas.read_pixel(3, 3).is_ok());
        assert!(matches!(
            atlas.read_pixel(4, 0),
            Err(ViewerError::PixelRead { x: 4, width: 4, .. })
        ));
    }
}
