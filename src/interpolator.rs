use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::enums::Interpolation;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Resample `plane` to `width` x `height`.
    ///
    /// Both modes map output pixel centers onto the source with a half-pixel
    /// offset, so integer upscales with [`Interpolation::None`] replicate each
    /// source pixel exactly.
    pub(crate) fn scale(
        plane: &RgbaImage,
        width: u32,
        height: u32,
        interpolation: Interpolation,
    ) -> RgbaImage {
        let mut output = RgbaImage::new(width, height);
        if width == 0 || height == 0 || plane.width() == 0 || plane.height() == 0 {
            return output;
        }
        if plane.dimensions() == (width, height) {
            return plane.clone();
        }

        let (plane_width, plane_height) = plane.dimensions();
        let row_len = width as usize * 4;

        output
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| {
                let y = y as u32;
                for x in 0..width {
                    let pixel = match interpolation {
                        Interpolation::None => {
                            let src_x = Self::nearest_index(x, width, plane_width);
                            let src_y = Self::nearest_index(y, height, plane_height);
                            *plane.get_pixel(src_x, src_y)
                        }
                        Interpolation::Bilinear => {
                            // Normalized coordinates with half-pixel offset
                            let norm_x = (x as f32 + 0.5) / width as f32;
                            let norm_y = (y as f32 + 0.5) / height as f32;

                            let src_x = norm_x * plane_width as f32 - 0.5;
                            let src_y = norm_y * plane_height as f32 - 0.5;

                            let src_x = src_x.max(0.0).min((plane_width - 1) as f32);
                            let src_y = src_y.max(0.0).min((plane_height - 1) as f32);

                            Self::bilinear_interpolate(plane, src_y, src_x)
                        }
                    };
                    let offset = x as usize * 4;
                    row[offset..offset + 4].copy_from_slice(&pixel.0);
                }
            });

        output
    }

    /// Source index whose cell contains the center of output pixel `index`.
    #[inline]
    pub(crate) fn nearest_index(index: u32, output_len: u32, source_len: u32) -> u32 {
        let scaled = (2 * u64::from(index) + 1) * u64::from(source_len) / (2 * u64::from(output_len));
        (scaled as u32).min(source_len - 1)
    }

    #[inline]
    pub(crate) fn bilinear_interpolate(plane: &RgbaImage, y: f32, x: f32) -> Rgba<u8> {
        let (width, height) = plane.dimensions();

        let y0 = y.floor() as u32;
        let x0 = x.floor() as u32;
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f32;
        let dx = x - x0 as f32;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;

        let p00 = plane.get_pixel(x0, y0).0;
        let p01 = plane.get_pixel(x1, y0).0;
        let p10 = plane.get_pixel(x0, y1).0;
        let p11 = plane.get_pixel(x1, y1).0;

        let mut out = [0u8; 4];
        for channel in 0..4 {
            let v00 = f32::from(p00[channel]);
            let v01 = f32::from(p01[channel]);
            let v10 = f32::from(p10[channel]);
            let v11 = f32::from(p11[channel]);

            let v0 = v00.mul_add(one_minus_dx, v01 * dx);
            let v1 = v10.mul_add(one_minus_dx, v11 * dx);

            out[channel] = v0.mul_add(one_minus_dy, v1 * dy).round().clamp(0.0, 255.0) as u8;
        }
        Rgba(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> RgbaImage {
        RgbaImage::from_fn(2, 2, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
    }

    #[test]
    fn nearest_upscale_replicates_pixels() {
        let scaled = Interpolator::scale(&checker(), 6, 4, Interpolation::None);
        assert_eq!(scaled.dimensions(), (6, 4));
        for y in 0..4 {
            for x in 0..6 {
                let expected = checker().get_pixel(x / 3, y / 2).0;
                assert_eq!(scaled.get_pixel(x, y).0, expected);
            }
        }
    }

    #[test]
    fn nearest_downscale_stays_in_bounds() {
        let plane = RgbaImage::from_fn(7, 5, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let scaled = Interpolator::scale(&plane, 3, 2, Interpolation::None);
        assert_eq!(scaled.get_pixel(2, 1).0, [5, 3, 0, 255]);
        assert_eq!(scaled.get_pixel(0, 0).0, [1, 1, 0, 255]);
    }

    #[test]
    fn bilinear_blends_neighbours() {
        let scaled = Interpolator::scale(&checker(), 4, 4, Interpolation::Bilinear);
        let corner = scaled.get_pixel(0, 0).0;
        let inner = scaled.get_pixel(1, 1).0;
        assert_eq!(corner, [255, 255, 255, 255]);
        assert!(inner[0] > 0 && inner[0] < 255);
        assert_eq!(inner[3], 255);
    }

    #[test]
    fn empty_target_is_empty() {
        let scaled = Interpolator::scale(&checker(), 0, 3, Interpolation::None);
        assert_eq!(scaled.dimensions(), (0, 3));
    }
}
