//! # Sprite-volume library
//!
//! This crate shows a 3D volume as three orthogonal slices (sagittal, coronal
//! and axial) reconstructed from a single 2D sprite: every sagittal slice of
//! the volume is a tile in a grid packed into one bitmap.
//!
//! The sagittal plane is a plain tile copy. The coronal and axial planes cut
//! across every tile and are reassembled from one pixel strip per slice,
//! either on every navigation or once up front into lookup atlases (see
//! [`ReconstructionMode`]). The three planes are composited side by side into
//! one canvas together with:
//!  - an optional overlay sprite, blended with a configurable opacity
//!  - a crosshair at the cursor
//!  - a colorbar and the overlay value under the cursor, read back from the
//!    overlay colors through a color map
//!  - coordinate, title and L/R labels
//!
//! Pointer events map back onto voxel indices, and only views whose content
//! changed are redrawn. Atlases are already decoded [`image::RgbaImage`]s; a
//! volume held in an [`ndarray::Array3`] can be turned into one with
//! [`SpritePacker`].
//!
//! # Examples
//!
//! ## Viewing a packed volume
//!
//! ```no_run
//! # use sprite_volume::{PositionUpdate, SpritePacker, SpriteViewer, ViewerConfig};
//! # use ndarray::Array3;
//! let volume = Array3::<u8>::zeros((91, 109, 91));
//! let atlas = SpritePacker::pack(volume.view()).expect("should have packed volume");
//! let config = ViewerConfig::new(109, 91)
//!     .with_depth(91)
//!     .with_coordinates(true);
//! let mut viewer = SpriteViewer::builder(config)
//!     .background(atlas.image().clone())
//!     .build()
//!     .expect("should have built viewer");
//! viewer.initialize().expect("should have rendered views");
//! viewer
//!     .move_to(PositionUpdate::new().with_x(20))
//!     .expect("should have moved cursor");
//! if let Some(canvas) = viewer.canvas() {
//!     canvas.save("result.png").expect("should have written result.png");
//! }
//! ```

pub mod affine;
pub mod atlas;
pub mod colormap;
pub mod compositor;
pub mod config;
pub mod enums;
pub mod error;
pub mod geometry;
mod interpolator;
pub mod layout;
pub mod reconstruct;
pub mod sampler;
pub mod sprite;
pub mod text;
pub mod viewer;

pub use affine::AffineTransform;
pub use atlas::Atlas;
pub use colormap::ColorMap;
pub use compositor::{ViewRender, crosshair_lines};
pub use config::{ColorMapConfig, OverlayConfig, ViewerConfig, parse_hex_color};
pub use enums::{Interpolation, Orientation, ReconstructionMode};
pub use error::{Result, ViewerError};
pub use geometry::{Position, SliceCounts, TileRect, VolumeGeometry};
pub use layout::{Layout, ViewRect};
pub use reconstruct::PlaneReconstructor;
pub use sampler::VoxelSampler;
pub use sprite::{SpritePacker, Window};
pub use text::{GlyphPainter, TextLabel, TextPainter};
pub use viewer::{
    DirtyViews, ListenerId, PositionChange, PositionUpdate, SpriteViewer, SpriteViewerBuilder,
};
