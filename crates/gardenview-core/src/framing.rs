//! Placement and camera framing of freshly imported meshes

use glam::Vec3;
use tracing::{debug, warn};

use crate::camera::OrbitCamera;
use crate::config::{CameraConfig, FramingConfig};
use crate::geometry::BoundingBox;
use crate::scene::{EntityId, MeshTransform, SceneBackend};

/// How an import is positioned once it finishes loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// Every mesh at the origin with a uniform scale, camera untouched
    Placement,
    /// Root mesh centered on the origin and the camera fitted to it
    Centering,
}

#[derive(Debug, Clone)]
pub struct AutoFramer {
    placement_scale: f32,
    radius_factor: f32,
    azimuth: f32,
    elevation: f32,
    radius_floor: Option<f32>,
}

impl AutoFramer {
    pub fn new(framing: &FramingConfig, camera: &CameraConfig) -> Self {
        Self {
            placement_scale: framing.placement_scale,
            radius_factor: framing.radius_factor,
            azimuth: camera.azimuth_deg.to_radians(),
            elevation: camera.elevation_deg.to_radians(),
            radius_floor: camera.radius_floor(),
        }
    }

    /// Position `meshes` and, when centering, re-aim the camera.
    ///
    /// Returns the root mesh's world bounds after centering, if known.
    pub fn frame<S: SceneBackend>(
        &self,
        scene: &mut S,
        meshes: &[EntityId],
        camera: Option<&mut OrbitCamera>,
        mode: FramingMode,
    ) -> Option<BoundingBox> {
        match mode {
            FramingMode::Placement => {
                self.place(scene, meshes);
                None
            }
            FramingMode::Centering => self.center(scene, meshes, camera),
        }
    }

    fn place<S: SceneBackend>(&self, scene: &mut S, meshes: &[EntityId]) {
        let transform = MeshTransform {
            position: Vec3::ZERO,
            scale: Vec3::splat(self.placement_scale),
        };
        for &id in meshes {
            scene.apply_transform(id, transform);
        }
        debug!(
            meshes = meshes.len(),
            scale = self.placement_scale,
            "Placed meshes at origin"
        );
    }

    fn center<S: SceneBackend>(
        &self,
        scene: &mut S,
        meshes: &[EntityId],
        camera: Option<&mut OrbitCamera>,
    ) -> Option<BoundingBox> {
        let &root = meshes.first()?;
        let Some(bounds) = scene.bounding_box(root) else {
            warn!(mesh = %root, "Root mesh has no bounds, skipping centering");
            return None;
        };

        let diagonal = bounds.diagonal();
        if !diagonal.is_finite() {
            warn!(mesh = %root, "Root mesh has non-finite bounds, skipping centering");
            return None;
        }

        let center = bounds.center_world();
        let mut transform = scene.transform(root).unwrap_or_default();
        transform.position -= center;
        scene.apply_transform(root, transform);

        let mut radius = diagonal * self.radius_factor;
        if bounds.is_degenerate() {
            radius = self.radius_floor.unwrap_or(0.0);
            warn!(mesh = %root, radius, "Mesh has zero extent");
        }

        if let Some(camera) = camera {
            camera.reset(Vec3::ZERO, self.azimuth, self.elevation, radius);
        }
        debug!(mesh = %root, ?center, diagonal, radius, "Centered mesh");

        scene.bounding_box(root)
    }
}

impl Default for AutoFramer {
    fn default() -> Self {
        Self::new(&FramingConfig::default(), &CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MeshData;
    use crate::scene::{ImportedMesh, Scene};

    fn cube(min: f32, max: f32) -> MeshData {
        MeshData {
            positions: vec![[min, min, min], [max, max, max], [min, max, min]],
            ..Default::default()
        }
    }

    #[test]
    fn test_centering_fits_camera() {
        let mut scene = Scene::new();
        let ids = scene.import_asset(vec![ImportedMesh::from_geometry("scan", cube(2.0, 5.0))]);
        let mut camera = OrbitCamera::default();
        camera.translate(Vec3::new(100.0, 0.0, 100.0));

        let bounds = AutoFramer::default()
            .frame(&mut scene, &ids, Some(&mut camera), FramingMode::Centering)
            .unwrap();

        // 3x3x3 box: diagonal 3 * sqrt(3)
        let diagonal = 27.0_f32.sqrt();
        assert!((bounds.diagonal() - diagonal).abs() < 1e-4);
        assert!(bounds.center_world().length() < 1e-5);
        assert!((camera.radius - 1.5 * diagonal).abs() < 1e-4);
        assert_eq!(camera.target, Vec3::ZERO);
        assert!((camera.azimuth - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_centering_only_moves_root() {
        let mut scene = Scene::new();
        let ids = scene.import_asset(vec![
            ImportedMesh::from_geometry("root", cube(1.0, 3.0)),
            ImportedMesh::from_geometry("child", cube(1.0, 3.0)),
        ]);
        AutoFramer::default().frame(&mut scene, &ids, None, FramingMode::Centering);

        assert_eq!(
            scene.transform(ids[0]).unwrap().position,
            Vec3::splat(-2.0)
        );
        assert_eq!(scene.transform(ids[1]).unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn test_placement_scales_every_mesh() {
        let mut scene = Scene::new();
        let ids = scene.import_asset(vec![
            ImportedMesh::from_asset("a", "models/a.glb"),
            ImportedMesh::from_asset("b", "models/b.glb"),
        ]);
        let mut camera = OrbitCamera::default();
        let before = camera;

        let bounds =
            AutoFramer::default().frame(&mut scene, &ids, Some(&mut camera), FramingMode::Placement);
        assert!(bounds.is_none());
        for id in ids {
            let transform = scene.transform(id).unwrap();
            assert_eq!(transform.position, Vec3::ZERO);
            assert_eq!(transform.scale, Vec3::splat(1.5));
        }
        assert_eq!(camera, before);
    }

    #[test]
    fn test_degenerate_bounds_use_floor() {
        let mut scene = Scene::new();
        let ids = scene.import_asset(vec![ImportedMesh::from_geometry(
            "dot",
            MeshData {
                positions: vec![[4.0, 4.0, 4.0]],
                ..Default::default()
            },
        )]);
        let mut camera = OrbitCamera::default();
        AutoFramer::default().frame(&mut scene, &ids, Some(&mut camera), FramingMode::Centering);

        assert_eq!(camera.radius, 0.1);
        assert_eq!(scene.transform(ids[0]).unwrap().position, Vec3::splat(-4.0));
    }

    #[test]
    fn test_nothing_to_center() {
        let mut scene = Scene::new();
        let mut camera = OrbitCamera::default();
        let framer = AutoFramer::default();
        assert!(framer
            .frame(&mut scene, &[], Some(&mut camera), FramingMode::Centering)
            .is_none());
        assert_eq!(camera, OrbitCamera::default());
    }

    #[test]
    fn test_non_finite_bounds_leave_camera_alone() {
        let mut scene = Scene::new();
        let ids = scene.import_asset(vec![ImportedMesh::from_geometry(
            "broken",
            MeshData {
                positions: vec![[0.0, 0.0, 0.0], [f32::INFINITY, 1.0, 1.0]],
                ..Default::default()
            },
        )]);
        let mut camera = OrbitCamera::default();

        let bounds =
            AutoFramer::default().frame(&mut scene, &ids, Some(&mut camera), FramingMode::Centering);
        assert!(bounds.is_none());
        assert_eq!(camera, OrbitCamera::default());
        assert!(camera.radius.is_finite());
        assert_eq!(scene.transform(ids[0]).unwrap().position, Vec3::ZERO);
    }
}
