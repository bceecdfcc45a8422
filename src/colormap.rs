use image::{Rgba, RgbaImage, imageops};

use crate::config::ColorMapConfig;
use crate::error::{Result, ViewerError};

/// Ordered reference colors and the scalar range they span, used to turn a
/// displayed overlay color back into a value.
#[derive(Debug, Clone)]
pub struct ColorMap {
    strip: RgbaImage,
    min: f64,
    max: f64,
    hide: bool,
}

impl ColorMap {
    /// Take the reference colors from the first pixel row of `image`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::EmptyColorMap`] for an image without pixels.
    pub fn from_strip(image: &RgbaImage, config: &ColorMapConfig) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ViewerError::EmptyColorMap);
        }
        let strip = imageops::crop_imm(image, 0, 0, image.width(), 1).to_image();
        Ok(Self {
            strip,
            min: config.min,
            max: config.max,
            hide: config.hide,
        })
    }

    /// One pixel tall strip of reference colors.
    pub fn strip(&self) -> &RgbaImage {
        &self.strip
    }

    pub fn len(&self) -> usize {
        self.strip.width() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Whether the colorbar should be left out of the coronal view.
    pub fn hidden(&self) -> bool {
        self.hide
    }

    /// Index of the reference color closest to `rgb` in squared RGB
    /// distance. Ties go to the lowest index.
    pub fn nearest_index(&self, rgb: [u8; 3]) -> usize {
        let mut best = 0;
        let mut best_distance = u32::MAX;
        for (index, Rgba(reference)) in self.strip.pixels().enumerate() {
            let distance = (0..3)
                .map(|c| {
                    let d = i32::from(reference[c]) - i32::from(rgb[c]);
                    (d * d) as u32
                })
                .sum::<u32>();
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
        }
        best
    }

    /// Scalar at reference color `index`, linear between `min` and `max`.
    pub fn value_at(&self, index: usize) -> f64 {
        let steps = self.len().saturating_sub(1);
        if steps == 0 {
            return self.min;
        }
        self.min + index as f64 * (self.max - self.min) / steps as f64
    }

    pub fn lookup(&self, rgb: [u8; 3]) -> f64 {
        self.value_at(self.nearest_index(rgb))
    }
}
