//! Viewer configuration.
//!
//! Every option has its default listed once in the [`Default`] impls below.
//! Configurations deserialize from the JSON handed over by widget glue, with
//! colors written as `"#RRGGBB"` or `"#RRGGBBAA"`.

use image::Rgba;
use serde::{Deserialize, Deserializer};

use crate::enums::ReconstructionMode;
use crate::error::{Result, ViewerError};

/// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
pub fn parse_hex_color(text: &str) -> Option<Rgba<u8>> {
    let hex = text.trim().trim_start_matches('#');
    if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}

fn hex_color<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Rgba<u8>, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_hex_color(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid color {text:?}")))
}

/// In-plane pixel size of one background tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct TileSize {
    pub y: u32,
    pub z: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub tile: TileSize,
    /// Explicit number of sagittal slices, when the last grid row is not full.
    pub depth: Option<u32>,
    pub container_width: u32,
    pub smooth: bool,
    pub mode: ReconstructionMode,
    #[serde(deserialize_with = "hex_color")]
    pub background_color: Rgba<u8>,
    #[serde(deserialize_with = "hex_color")]
    pub font_color: Rgba<u8>,
    pub show_coordinates: bool,
    pub show_value: bool,
    pub title: Option<String>,
    pub crosshair: bool,
    #[serde(deserialize_with = "hex_color")]
    pub crosshair_color: Rgba<u8>,
    /// Fraction of each plane spanned by the crosshair lines.
    pub crosshair_size: f64,
    pub show_lr: bool,
    /// Swap the L/R labels (radiological convention).
    pub radiological: bool,
    /// Significant digits of displayed values.
    pub decimals: u32,
    pub origin: [f64; 3],
    pub voxel_size: f64,
    /// Row-major voxel to world matrix, takes precedence over origin and
    /// voxel size.
    pub affine: Option<[[f64; 4]; 4]>,
    /// Starting cursor, clamped into the volume. Defaults to the center.
    pub initial_position: Option<[i64; 3]>,
    /// Starting cursor in world space, mapped through the inverse affine.
    /// Ignored when `initial_position` is set.
    pub initial_world: Option<[f64; 3]>,
    /// Font size as a fraction of the tallest view.
    pub font_size: f64,
    /// Colorbar height as a fraction of the tallest view.
    pub colorbar_height: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            tile: TileSize::default(),
            depth: None,
            container_width: 600,
            smooth: false,
            mode: ReconstructionMode::Incremental,
            background_color: Rgba([0, 0, 0, 255]),
            font_color: Rgba([255, 255, 255, 255]),
            show_coordinates: false,
            show_value: false,
            title: None,
            crosshair: false,
            crosshair_color: Rgba([0, 0, 255, 255]),
            crosshair_size: 0.9,
            show_lr: false,
            radiological: false,
            decimals: 3,
            origin: [0.0; 3],
            voxel_size: 1.0,
            affine: None,
            initial_position: None,
            initial_world: None,
            font_size: 0.075,
            colorbar_height: 0.04,
        }
    }
}

impl ViewerConfig {
    pub fn new(tile_y: u32, tile_z: u32) -> Self {
        Self {
            tile: TileSize {
                y: tile_y,
                z: tile_z,
            },
            ..Self::default()
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_container_width(mut self, width: u32) -> Self {
        self.container_width = width;
        self
    }

    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    pub fn with_mode(mut self, mode: ReconstructionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_background_color(mut self, color: Rgba<u8>) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_font_color(mut self, color: Rgba<u8>) -> Self {
        self.font_color = color;
        self
    }

    pub fn with_coordinates(mut self, show: bool) -> Self {
        self.show_coordinates = show;
        self
    }

    pub fn with_value(mut self, show: bool) -> Self {
        self.show_value = show;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_crosshair(mut self, color: Rgba<u8>, size: f64) -> Self {
        self.crosshair = true;
        self.crosshair_color = color;
        self.crosshair_size = size;
        self
    }

    pub fn with_lr_labels(mut self, radiological: bool) -> Self {
        self.show_lr = true;
        self.radiological = radiological;
        self
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_origin(mut self, origin: [f64; 3], voxel_size: f64) -> Self {
        self.origin = origin;
        self.voxel_size = voxel_size;
        self
    }

    pub fn with_affine(mut self, rows: [[f64; 4]; 4]) -> Self {
        self.affine = Some(rows);
        self
    }

    pub fn with_initial_position(mut self, x: i64, y: i64, z: i64) -> Self {
        self.initial_position = Some([x, y, z]);
        self
    }

    pub fn with_initial_world(mut self, x: f64, y: f64, z: f64) -> Self {
        self.initial_world = Some([x, y, z]);
        self
    }

    /// Space below the views reserved for coordinate labels.
    pub fn label_margin(&self) -> f64 {
        if self.show_coordinates { 0.1 } else { 0.0 }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.crosshair_size) {
            return Err(ViewerError::InvalidCrosshairSize(self.crosshair_size));
        }
        Ok(())
    }
}

/// Sprite tile size of the overlay, which may differ from the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct OverlayTile {
    pub x: Option<u32>,
    pub y: u32,
    pub z: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub tile: OverlayTile,
    pub opacity: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            tile: OverlayTile::default(),
            opacity: 1.0,
        }
    }
}

impl OverlayConfig {
    pub fn new(tile_y: u32, tile_z: u32) -> Self {
        Self {
            tile: OverlayTile {
                x: None,
                y: tile_y,
                z: tile_z,
            },
            ..Self::default()
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.tile.x = Some(depth);
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(ViewerError::InvalidOpacity(self.opacity));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ColorMapConfig {
    pub min: f64,
    pub max: f64,
    /// Leave the colorbar out while still using the map for value lookup.
    pub hide: bool,
}
