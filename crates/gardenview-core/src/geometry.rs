//! Bounding boxes and raw mesh geometry

use glam::Vec3;

/// World up axis. Coordinates are Y-up.
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, `None` for an empty iterator
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |bounds, p| Self {
            min: bounds.min.min(p),
            max: bounds.max.max(p),
        }))
    }

    /// Midpoint of the two corners
    pub fn center_world(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Euclidean distance between the two corners
    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }

    /// True when the box has no extent at all
    pub fn is_degenerate(&self) -> bool {
        self.diagonal() == 0.0
    }

    /// Box of this geometry after scaling then translating it
    pub fn transformed(&self, position: Vec3, scale: Vec3) -> BoundingBox {
        let a = self.min * scale + position;
        let b = self.max * scale + position;
        // Negative scale swaps the corners
        BoundingBox {
            min: a.min(b),
            max: a.max(b),
        }
    }
}

/// Direction projected onto the ground plane and renormalized.
///
/// Returns zero when the direction is vertical.
pub fn ground_projected(direction: Vec3) -> Vec3 {
    Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero()
}

/// Decoded mesh geometry, independent of any rendering engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex normals when the source provides them
    pub normals: Option<Vec<[f32; 3]>>,
    /// Per-vertex RGBA colors in 0.0-1.0
    pub colors: Option<Vec<[f32; 4]>>,
    /// Triangle list indices; empty for point clouds
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// A mesh with vertices but no faces
    pub fn is_point_cloud(&self) -> bool {
        self.indices.is_empty()
    }

    /// Local-space bounds of all vertex positions
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.positions.iter().map(|p| Vec3::from_array(*p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_and_diagonal() {
        let bounds = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(bounds.center_world(), Vec3::ZERO);
        assert!((bounds.diagonal() - 2.0 * 3.0_f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_from_points() {
        let bounds = BoundingBox::from_points([
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(-4.0, 5.0, 0.5),
            Vec3::new(0.0, 0.0, 9.0),
        ])
        .unwrap();
        assert_eq!(bounds.min, Vec3::new(-4.0, -2.0, 0.5));
        assert_eq!(bounds.max, Vec3::new(1.0, 5.0, 9.0));

        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_degenerate_single_point() {
        let bounds = BoundingBox::from_points([Vec3::new(2.0, 2.0, 2.0)]).unwrap();
        assert!(bounds.is_degenerate());
        assert_eq!(bounds.diagonal(), 0.0);
    }

    #[test]
    fn test_transformed_negative_scale() {
        let bounds = BoundingBox::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 3.0));
        let moved = bounds.transformed(Vec3::new(10.0, 0.0, 0.0), Vec3::new(2.0, 1.0, -1.0));
        assert_eq!(moved.min, Vec3::new(10.0, 0.0, -3.0));
        assert_eq!(moved.max, Vec3::new(12.0, 2.0, 0.0));
    }

    #[test]
    fn test_ground_projection() {
        let dir = ground_projected(Vec3::new(3.0, -7.0, 4.0));
        assert!((dir - Vec3::new(0.6, 0.0, 0.8)).length() < 1e-6);

        // Looking straight down has no ground direction
        assert_eq!(ground_projected(Vec3::new(0.0, -1.0, 0.0)), Vec3::ZERO);
    }

    #[test]
    fn test_mesh_data_bounds() {
        let mesh = MeshData {
            positions: vec![[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 4.0, 0.0]],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.max, Vec3::new(2.0, 4.0, 0.0));
        assert_eq!(mesh.triangle_count(), 1);
        assert!(!mesh.is_point_cloud());
    }
}
