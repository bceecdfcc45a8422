//! Placement of the three views inside the composite canvas.
//!
//! Views sit side by side (sagittal, coronal, axial) with widths proportional
//! to `y : x : x` and heights that keep each plane's aspect ratio. Shorter
//! views are centered vertically on the tallest one.

use tracing::debug;

use crate::enums::Orientation;
use crate::geometry::SliceCounts;

/// Screen rectangle of one view's plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl ViewRect {
    #[inline]
    pub fn right(&self) -> u32 {
        self.left + self.width
    }

    #[inline]
    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= i64::from(self.left)
            && x < i64::from(self.right())
            && y >= i64::from(self.top)
            && y < i64::from(self.bottom())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Layout {
    views: [ViewRect; 3],
    height_max: u32,
    canvas_width: u32,
    canvas_height: u32,
}

impl Layout {
    /// Lay out the views for a container `container_width` pixels wide.
    ///
    /// `label_margin` is the fraction of the tallest view added below the
    /// views for coordinate labels.
    pub fn compute(slices: SliceCounts, container_width: u32, label_margin: f64) -> Self {
        let (nx, ny, nz) = (
            u64::from(slices.x),
            u64::from(slices.y),
            u64::from(slices.z),
        );
        let total = u64::from(container_width);
        let denominator = (2 * nx + ny).max(1);

        let width_x = total * ny / denominator;
        let width_yz = total * nx / denominator;

        let height_x = if ny == 0 { 0 } else { width_x * nz / ny };
        let height_y = if nx == 0 { 0 } else { width_yz * nz / nx };
        let height_z = if nx == 0 { 0 } else { width_yz * ny / nx };
        let height_max = height_x.max(height_y).max(height_z);

        let widths = [width_x, width_yz, width_yz];
        let heights = [height_x, height_y, height_z];
        let mut views = [ViewRect::default(); 3];
        let mut left = 0;
        for index in 0..3 {
            views[index] = ViewRect {
                left: left as u32,
                top: ((height_max - heights[index]) / 2) as u32,
                width: widths[index] as u32,
                height: heights[index] as u32,
            };
            left += widths[index];
        }

        let canvas_height = (height_max as f64 * (1.0 + label_margin)).round() as u32;
        let layout = Self {
            views,
            height_max: height_max as u32,
            canvas_width: left as u32,
            canvas_height,
        };
        debug!(
            "Layout for {}px container: widths {:?}, heights {:?}, canvas {}x{}",
            container_width, widths, heights, layout.canvas_width, layout.canvas_height
        );
        layout
    }

    /// Suggested `height / width` ratio of a viewer for a volume, leaving 20%
    /// of headroom for annotations.
    pub fn aspect_for(slices: SliceCounts) -> f64 {
        let width = f64::from(slices.y) + 2.0 * f64::from(slices.x);
        if width == 0.0 {
            return 0.0;
        }
        1.2 * f64::from(slices.y.max(slices.z)) / width
    }

    pub fn view(&self, orientation: Orientation) -> ViewRect {
        self.views[orientation.index()]
    }

    /// Full-height canvas column owned by a view: plane, margins and labels.
    pub fn column(&self, orientation: Orientation) -> ViewRect {
        let view = self.view(orientation);
        ViewRect {
            left: view.left,
            top: 0,
            width: view.width,
            height: self.canvas_height,
        }
    }

    pub fn height_max(&self) -> u32 {
        self.height_max
    }

    pub fn canvas_width(&self) -> u32 {
        self.canvas_width
    }

    pub fn canvas_height(&self) -> u32 {
        self.canvas_height
    }

    /// View under canvas x coordinate `x`. Points left of or beyond the
    /// canvas fall into the nearest view.
    pub fn classify(&self, x: f64) -> Orientation {
        let sagittal = self.view(Orientation::Sagittal);
        let coronal = self.view(Orientation::Coronal);
        if x < f64::from(sagittal.right()) {
            Orientation::Sagittal
        } else if x < f64::from(coronal.right()) {
            Orientation::Coronal
        } else {
            Orientation::Axial
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ten_slices_of_64_in_300px() {
        let layout = Layout::compute(SliceCounts::new(10, 64, 64), 300, 0.0);
        let sagittal = layout.view(Orientation::Sagittal);
        let coronal = layout.view(Orientation::Coronal);
        let axial = layout.view(Orientation::Axial);

        assert_eq!(sagittal.width, 300 * 64 / (2 * 10 + 64));
        assert_eq!(sagittal.width, 228);
        assert_eq!(coronal.width, 35);
        assert_eq!(axial.width, 35);
        assert_eq!(
            layout.canvas_width(),
            sagittal.width + coronal.width + axial.width
        );

        assert_eq!(sagittal.height, 228);
        assert_eq!(coronal.height, 35 * 64 / 10);
        assert_eq!(axial.height, 35 * 64 / 10);
        assert_eq!(layout.height_max(), 228);
        assert_eq!(layout.canvas_height(), 228);

        assert_eq!(coronal.left, 228);
        assert_eq!(axial.left, 263);
        assert_eq!(coronal.top, 2);
    }

    #[test]
    fn label_margin_extends_canvas() {
        let layout = Layout::compute(SliceCounts::new(10, 64, 64), 300, 0.1);
        assert_eq!(layout.canvas_height(), 251);
        assert_eq!(layout.column(Orientation::Axial).height, 251);
    }

    #[test]
    fn classify_by_cumulative_width() {
        let layout = Layout::compute(SliceCounts::new(10, 64, 64), 300, 0.0);
        assert_eq!(layout.classify(-10.0), Orientation::Sagittal);
        assert_eq!(layout.classify(227.9), Orientation::Sagittal);
        assert_eq!(layout.classify(228.0), Orientation::Coronal);
        assert_eq!(layout.classify(262.0), Orientation::Coronal);
        assert_eq!(layout.classify(263.0), Orientation::Axial);
        assert_eq!(layout.classify(1000.0), Orientation::Axial);
    }

    #[test]
    fn aspect_hint() {
        assert_relative_eq!(
            Layout::aspect_for(SliceCounts::new(10, 64, 32)),
            1.2 * 64.0 / 84.0
        );
    }
}
