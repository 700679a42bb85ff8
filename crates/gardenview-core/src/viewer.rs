//! Viewer surface: one mounted scene, camera and import pipeline

use tracing::{debug, info, warn};

use crate::bootstrap::{self, SurfaceSize};
use crate::camera::OrbitCamera;
use crate::config::ViewerConfig;
use crate::controls::{CameraController, PanDirection};
use crate::framing::{AutoFramer, FramingMode};
use crate::import::{
    decode_local, AssetSource, ImportError, ImportOutcome, ImportProgress, ImportTicket, Importer,
};
use crate::scene::{ImportedMesh, Scene};

/// Composition root tying scene, camera, importer and navigation together.
///
/// Everything is inert until [`Viewer::mount`] succeeds; navigation and
/// import calls on an unmounted viewer are no-ops.
#[derive(Debug)]
pub struct Viewer {
    config: ViewerConfig,
    scene: Scene,
    camera: Option<OrbitCamera>,
    surface: Option<SurfaceSize>,
    importer: Importer,
    controller: CameraController,
    framer: AutoFramer,
    pending: Option<(ImportTicket, FramingMode)>,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        let controller = CameraController::new(&config.navigation, &config.camera);
        let framer = AutoFramer::new(&config.framing, &config.camera);
        Self {
            config,
            scene: Scene::new(),
            camera: None,
            surface: None,
            importer: Importer::new(),
            controller,
            framer,
            pending: None,
        }
    }

    /// Bind to a surface and build a fresh scene.
    ///
    /// Remounting replaces the previous scene. An unavailable surface leaves
    /// the viewer unmounted and is only logged.
    pub fn mount(&mut self, surface: Option<SurfaceSize>) -> bool {
        if self.is_mounted() {
            self.unmount();
        }
        match bootstrap::initialize(surface, &self.config) {
            Ok((scene, camera)) => {
                self.scene = scene;
                self.camera = Some(camera);
                self.surface = surface;
                true
            }
            Err(e) => {
                warn!(error = %e, "Viewer not mounted");
                false
            }
        }
    }

    /// Release the scene and camera; outstanding imports become stale
    pub fn unmount(&mut self) {
        if !self.is_mounted() {
            return;
        }
        self.importer.invalidate();
        self.pending = None;
        self.scene.clear();
        self.camera = None;
        self.surface = None;
        info!("Viewer unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.camera.is_some()
    }

    pub fn resize(&mut self, surface: SurfaceSize) {
        if self.is_mounted() && self.surface != Some(surface) {
            debug!(width = surface.width, height = surface.height, "Surface resized");
            self.surface = Some(surface);
        }
    }

    /// Start importing `source`, disposing the previous model
    pub fn begin_import(&mut self, source: &AssetSource) -> Option<ImportTicket> {
        if !self.is_mounted() {
            warn!(source = %source.display_name(), "Import requested before mount");
            return None;
        }
        let ticket = self.importer.begin(source, &mut self.scene);
        self.pending = Some((ticket, source.framing_mode()));
        Some(ticket)
    }

    /// Begin importing a named model from the configured asset directory.
    ///
    /// The caller loads the returned source's path and completes the ticket.
    pub fn load_named(&mut self, name: &str) -> Option<(ImportTicket, AssetSource)> {
        let source = AssetSource::named(name, &self.config.assets);
        let ticket = self.begin_import(&source)?;
        Some((ticket, source))
    }

    pub fn report_progress(&mut self, ticket: ImportTicket, loaded: u64, total: Option<u64>) {
        self.importer.report_progress(ticket, loaded, total);
    }

    /// Apply a finished import and frame it
    pub fn complete_import(
        &mut self,
        ticket: ImportTicket,
        result: Result<Vec<ImportedMesh>, ImportError>,
    ) -> ImportOutcome {
        let outcome = self.importer.complete(ticket, result, &mut self.scene);

        let mode = match self.pending {
            Some((pending, mode)) if pending == ticket => mode,
            _ => return outcome,
        };
        if !matches!(outcome, ImportOutcome::Superseded) {
            self.pending = None;
        }
        if let ImportOutcome::Loaded(ids) = &outcome {
            self.framer.frame(&mut self.scene, ids, self.camera.as_mut(), mode);
        }
        outcome
    }

    /// Finish a local import once its bytes have been read
    pub fn complete_local(&mut self, ticket: ImportTicket, source: &AssetSource) -> ImportOutcome {
        if !self.importer.is_current(ticket) {
            debug!(ticket = ticket.0, "Skipping decode of superseded file");
            return ImportOutcome::Superseded;
        }
        let result = match decode_local(source) {
            Ok(Some(meshes)) => Ok(meshes),
            Ok(None) => Err(ImportError::Read {
                source_name: source.display_name().to_string(),
                reason: "not a local file".to_string(),
            }),
            Err(e) => Err(e),
        };
        self.complete_import(ticket, result)
    }

    /// Import a user-selected file whose bytes are already in memory
    pub fn import_local(&mut self, filename: &str, bytes: Vec<u8>) -> Option<ImportOutcome> {
        let source = AssetSource::local(filename, bytes);
        let ticket = self.begin_import(&source)?;
        Some(self.complete_local(ticket, &source))
    }

    pub fn pan(&mut self, direction: PanDirection) {
        self.controller.pan(self.camera.as_mut(), direction);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.controller.zoom(self.camera.as_mut(), delta);
    }

    pub fn zoom_in(&mut self) {
        self.controller.zoom_in(self.camera.as_mut());
    }

    pub fn zoom_out(&mut self) {
        self.controller.zoom_out(self.camera.as_mut());
    }

    /// Drag-orbit by pointer motion in pixels
    pub fn orbit(&mut self, drag_x: f32, drag_y: f32) {
        self.controller.orbit(self.camera.as_mut(), drag_x, drag_y);
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> Option<&OrbitCamera> {
        self.camera.as_ref()
    }

    pub fn surface(&self) -> Option<SurfaceSize> {
        self.surface
    }

    pub fn is_loading(&self) -> bool {
        self.importer.is_loading()
    }

    pub fn progress(&self) -> Option<ImportProgress> {
        self.importer.progress()
    }

    pub fn last_error(&self) -> Option<&ImportError> {
        self.importer.last_error()
    }

    pub fn is_current(&self, ticket: ImportTicket) -> bool {
        self.importer.is_current(ticket)
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{EntityPayload, MeshPayload, SceneBackend, GROUND_NAME};
    use glam::Vec3;

    const CUBE_PLY: &str = "ply
format ascii 1.0
element vertex 8
property float x
property float y
property float z
element face 6
property list uchar int vertex_indices
end_header
-1 -1 -1
1 -1 -1
1 1 -1
-1 1 -1
-1 -1 1
1 -1 1
1 1 1
-1 1 1
4 0 1 2 3
4 4 5 6 7
4 0 1 5 4
4 2 3 7 6
4 0 3 7 4
4 1 2 6 5
";

    fn mounted() -> Viewer {
        let mut viewer = Viewer::default();
        assert!(viewer.mount(Some(SurfaceSize::new(1280, 720))));
        viewer
    }

    fn shifted_cube() -> String {
        CUBE_PLY
            .lines()
            .map(|line| {
                let parts: Vec<f32> = line
                    .split_whitespace()
                    .filter_map(|t| t.parse().ok())
                    .collect();
                if parts.len() == 3 && !line.starts_with('4') {
                    format!("{} {} {}", parts[0] + 10.0, parts[1] + 3.0, parts[2] - 7.0)
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
            + "\n"
    }

    #[test]
    fn test_upload_frames_cube() {
        let mut viewer = mounted();
        let outcome = viewer
            .import_local("cube.ply", CUBE_PLY.as_bytes().to_vec())
            .unwrap();
        assert!(matches!(outcome, ImportOutcome::Loaded(ref ids) if ids.len() == 1));

        let camera = viewer.camera().unwrap();
        assert!((camera.radius - 5.196).abs() < 1e-3);
        assert_eq!(camera.target, Vec3::ZERO);
        assert!(!viewer.is_loading());
    }

    #[test]
    fn test_upload_centers_offset_mesh() {
        let mut viewer = mounted();
        let outcome = viewer
            .import_local("offset.ply", shifted_cube().into_bytes())
            .unwrap();
        let ImportOutcome::Loaded(ids) = outcome else {
            panic!("expected loaded outcome, got {:?}", outcome);
        };
        let bounds = viewer.scene().bounding_box(ids[0]).unwrap();
        assert!(bounds.center_world().length() < 1e-4);
    }

    #[test]
    fn test_reimport_replaces_meshes() {
        let mut viewer = mounted();
        viewer.import_local("a.ply", CUBE_PLY.as_bytes().to_vec());
        viewer.import_local("b.ply", CUBE_PLY.as_bytes().to_vec());

        let names: Vec<_> = viewer.scene().primaries().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["b".to_string()]);
        assert_eq!(viewer.scene().fixtures().count(), 2);
    }

    #[test]
    fn test_named_model_is_placed() {
        let mut viewer = mounted();
        let (ticket, source) = viewer.load_named("garden").unwrap();
        let AssetSource::Named { path, .. } = &source else {
            panic!("expected named source");
        };
        assert_eq!(path, "models/garden.glb");
        assert!(viewer.is_loading());

        let before = *viewer.camera().unwrap();
        let outcome = viewer.complete_import(
            ticket,
            Ok(vec![ImportedMesh::from_asset("garden", path.clone())]),
        );
        let ImportOutcome::Loaded(ids) = outcome else {
            panic!("expected loaded outcome");
        };
        let transform = viewer.scene().transform(ids[0]).unwrap();
        assert_eq!(transform.scale, Vec3::splat(1.5));
        assert_eq!(*viewer.camera().unwrap(), before);
    }

    #[test]
    fn test_empty_import_leaves_scene_unchanged() {
        let mut viewer = mounted();
        let fixtures = viewer.scene().len();
        let ticket = viewer
            .begin_import(&AssetSource::local("empty.ply", vec![]))
            .unwrap();
        let outcome = viewer.complete_import(ticket, Ok(vec![]));

        assert_eq!(outcome, ImportOutcome::Failed(ImportError::Empty));
        assert!(!viewer.is_loading());
        assert!(viewer.last_error().is_some());
        assert_eq!(viewer.scene().len(), fixtures);
    }

    #[test]
    fn test_broken_upload_reports_error() {
        let mut viewer = mounted();
        let outcome = viewer
            .import_local("broken.ply", b"ply\nformat ascii 1.0\n".to_vec())
            .unwrap();
        assert!(matches!(outcome, ImportOutcome::Failed(ImportError::Parse(_))));
        assert!(viewer.scene().find_by_name(GROUND_NAME).is_some());
    }

    #[test]
    fn test_stale_completion_discarded() {
        let mut viewer = mounted();
        let (slow, _) = viewer.load_named("slow").unwrap();
        let (fast, _) = viewer.load_named("fast").unwrap();

        viewer.complete_import(fast, Ok(vec![ImportedMesh::from_asset("fast", "models/fast.glb")]));
        let outcome =
            viewer.complete_import(slow, Ok(vec![ImportedMesh::from_asset("slow", "models/slow.glb")]));

        assert_eq!(outcome, ImportOutcome::Superseded);
        let names: Vec<_> = viewer.scene().primaries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["fast"]);
    }

    #[test]
    fn test_unmounted_viewer_is_inert() {
        let mut viewer = Viewer::default();
        assert!(!viewer.mount(None));
        viewer.pan(PanDirection::Forward);
        viewer.zoom_in();
        assert!(viewer.camera().is_none());
        assert!(viewer.load_named("garden").is_none());
        assert!(viewer.import_local("a.ply", CUBE_PLY.as_bytes().to_vec()).is_none());
    }

    #[test]
    fn test_unmount_invalidates_pending_import() {
        let mut viewer = mounted();
        let (ticket, _) = viewer.load_named("garden").unwrap();
        viewer.unmount();
        assert!(!viewer.is_loading());
        assert!(viewer.scene().is_empty());

        viewer.mount(Some(SurfaceSize::new(640, 480)));
        let outcome =
            viewer.complete_import(ticket, Ok(vec![ImportedMesh::from_asset("garden", "g.glb")]));
        assert_eq!(outcome, ImportOutcome::Superseded);
        assert_eq!(viewer.scene().primaries().count(), 0);
    }

    #[test]
    fn test_navigation_after_mount() {
        let mut viewer = mounted();
        let start = viewer.camera().unwrap().position();
        viewer.pan(PanDirection::Left);
        viewer.pan(PanDirection::Right);
        assert!((viewer.camera().unwrap().position() - start).length() < 1e-3);

        viewer.zoom_out();
        assert_eq!(viewer.camera().unwrap().radius, 65.0);
        viewer.zoom(-5.0);
        assert_eq!(viewer.camera().unwrap().radius, 60.0);
    }

    #[test]
    fn test_point_cloud_upload() {
        let mut viewer = mounted();
        let ply = "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n2 2 2\n";
        let outcome = viewer.import_local("points.ply", ply.as_bytes().to_vec()).unwrap();
        assert!(matches!(outcome, ImportOutcome::Loaded(_)));
        let mesh = viewer.scene().primaries().next().unwrap();
        let EntityPayload::Mesh(MeshPayload::Geometry(data)) = &mesh.payload else {
            panic!("expected decoded geometry");
        };
        assert!(data.is_point_cloud());
        assert_eq!(data.vertex_count(), 2);
    }

    #[test]
    fn test_resize_tracks_surface() {
        let mut viewer = mounted();
        assert_eq!(viewer.surface(), Some(SurfaceSize::new(1280, 720)));

        viewer.resize(SurfaceSize::new(800, 600));
        assert_eq!(viewer.surface(), Some(SurfaceSize::new(800, 600)));

        // Resizing leaves the camera where it was
        let camera = *viewer.camera().unwrap();
        viewer.resize(SurfaceSize::new(1024, 768));
        assert_eq!(*viewer.camera().unwrap(), camera);
    }

    #[test]
    fn test_resize_ignored_while_unmounted() {
        let mut viewer = Viewer::default();
        viewer.resize(SurfaceSize::new(800, 600));
        assert_eq!(viewer.surface(), None);

        let mut viewer = mounted();
        viewer.unmount();
        viewer.resize(SurfaceSize::new(800, 600));
        assert_eq!(viewer.surface(), None);
        assert!(!viewer.is_mounted());

        assert!(viewer.mount(Some(SurfaceSize::new(640, 480))));
        viewer.resize(SurfaceSize::new(320, 240));
        assert_eq!(viewer.surface(), Some(SurfaceSize::new(320, 240)));
    }

    #[test]
    fn test_oversized_header_is_an_import_error() {
        let mut viewer = mounted();
        let ply = "ply\nformat ascii 1.0\nelement vertex 2305843009213693951\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n";
        let outcome = viewer.import_local("huge.ply", ply.as_bytes().to_vec()).unwrap();
        assert!(matches!(outcome, ImportOutcome::Failed(ImportError::Parse(_))));
        assert!(!viewer.is_loading());
        assert_eq!(viewer.scene().primaries().count(), 0);
    }

    #[test]
    fn test_nan_vertex_keeps_camera_finite() {
        let mut viewer = mounted();
        let ply = "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\nnan 1 1\n2 2 2\n";
        let outcome = viewer.import_local("nan.ply", ply.as_bytes().to_vec()).unwrap();
        assert!(matches!(outcome, ImportOutcome::Failed(ImportError::Parse(_))));
        let camera = viewer.camera().unwrap();
        assert!(camera.radius.is_finite() && camera.radius > 0.0);
    }
}
