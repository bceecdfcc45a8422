use thiserror::Error;

use crate::enums::Orientation;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, ViewerError>;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("atlas {dimension} of {atlas}px is not a multiple of the {tile}px tile {dimension}")]
    NonDivisibleAtlas {
        dimension: &'static str,
        atlas: u32,
        tile: u32,
    },

    #[error("depth of {depth} slices does not fit a {columns}x{rows} tile grid")]
    DepthExceedsGrid { depth: u32, columns: u32, rows: u32 },

    #[error("{0} must be non-zero")]
    EmptyDimension(&'static str),

    #[error("{orientation:?} slice {index} is out of range (0..{count})")]
    SliceOutOfRange {
        orientation: Orientation,
        index: u32,
        count: u32,
    },

    #[error("No background atlas supplied")]
    MissingBackground,

    #[error("Color map strip has no reference colors")]
    EmptyColorMap,

    #[error("overlay opacity {0} is outside [0, 1]")]
    InvalidOpacity(f64),

    #[error("crosshair size {0} is outside [0, 1]")]
    InvalidCrosshairSize(f64),

    #[error("Viewer has not been initialized")]
    NotInitialized,

    #[error("pixel ({x}, {y}) is outside the {width}x{height} atlas")]
    PixelRead {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("Invalid font data")]
    Font,
}
