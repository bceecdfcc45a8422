use serde::Deserialize;

/// The three orthogonal views. Each view is named after the volume axis it
/// cuts across: sagittal slices are indexed by x, coronal by y, axial by z.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    Sagittal,
    Coronal,
    Axial,
}

impl Orientation {
    /// Screen order, left to right.
    pub const ALL: [Orientation; 3] = [
        Orientation::Sagittal,
        Orientation::Coronal,
        Orientation::Axial,
    ];

    pub fn index(self) -> usize {
        match self {
            Orientation::Sagittal => 0,
            Orientation::Coronal => 1,
            Orientation::Axial => 2,
        }
    }

    /// Lower-case name of the volume axis this view slices along.
    pub fn axis_name(self) -> &'static str {
        match self {
            Orientation::Sagittal => "x",
            Orientation::Coronal => "y",
            Orientation::Axial => "z",
        }
    }

    /// Orientations whose indices run along the horizontal and vertical
    /// screen axes of this view, in that order.
    pub fn in_plane(self) -> (Orientation, Orientation) {
        match self {
            Orientation::Sagittal => (Orientation::Coronal, Orientation::Axial),
            Orientation::Coronal => (Orientation::Sagittal, Orientation::Axial),
            Orientation::Axial => (Orientation::Sagittal, Orientation::Coronal),
        }
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Bilinear,
    #[default]
    None,
}

impl Interpolation {
    pub fn from_smooth(smooth: bool) -> Self {
        if smooth {
            Interpolation::Bilinear
        } else {
            Interpolation::None
        }
    }
}

/// How the coronal and axial planes are produced from the atlas.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionMode {
    /// Reassemble the plane from one strip per tile on every navigation.
    #[default]
    Incremental,
    /// Build lookup atlases holding every plane once, then blit a single tile.
    Precomputed,
}
