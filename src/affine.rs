//! Voxel to world coordinate mapping.
//!
//! Voxel indices enter the transform 1-based: voxel `(0, 0, 0)` is multiplied
//! as `(1, 1, 1, 1)`.

use glam::{DMat4, DVec3, DVec4};

use crate::geometry::Position;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    matrix: DMat4,
}

impl AffineTransform {
    /// Build from a row-major 4x4 matrix.
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Self {
            matrix: DMat4::from_cols_array_2d(&rows).transpose(),
        }
    }

    /// Diagonal transform scaling by `voxel_size` and shifting by `-origin`.
    pub fn from_origin(origin: [f64; 3], voxel_size: f64) -> Self {
        Self::from_rows([
            [voxel_size, 0.0, 0.0, -origin[0]],
            [0.0, voxel_size, 0.0, -origin[1]],
            [0.0, 0.0, voxel_size, -origin[2]],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn rows(&self) -> [[f64; 4]; 4] {
        self.matrix.transpose().to_cols_array_2d()
    }

    pub fn voxel_to_world(&self, position: Position) -> DVec3 {
        let voxel = DVec4::new(
            f64::from(position.x) + 1.0,
            f64::from(position.y) + 1.0,
            f64::from(position.z) + 1.0,
            1.0,
        );
        self.matrix.mul_vec4(voxel).truncate()
    }

    /// Continuous 0-based voxel coordinates of a world point, `None` if the
    /// transform cannot be inverted.
    pub fn world_to_voxel(&self, world: DVec3) -> Option<DVec3> {
        let determinant = self.matrix.determinant();
        if !determinant.is_finite() || determinant.abs() < f64::EPSILON {
            return None;
        }
        let voxel = self.matrix.inverse().mul_vec4(world.extend(1.0));
        Some(voxel.truncate() - DVec3::ONE)
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::from_origin([0.0; 3], 1.0)
    }
}
