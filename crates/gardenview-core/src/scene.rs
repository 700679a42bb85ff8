//! Scene model - fixtures and the primary imported mesh set

use glam::Vec3;
use std::sync::Arc;

use crate::geometry::{BoundingBox, MeshData};

/// Reserved name of the ground fixture
pub const GROUND_NAME: &str = "ground";
/// Reserved name of the ambient light fixture
pub const AMBIENT_LIGHT_NAME: &str = "light";

/// Identifier of an entity within one scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether an entity survives model reloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Ground and lights, kept across reloads
    Fixture,
    /// Meshes from the current import
    Primary,
}

/// Position and scale of an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshTransform {
    pub position: Vec3,
    pub scale: Vec3,
}

impl Default for MeshTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Where a mesh's renderable content comes from
#[derive(Debug, Clone, PartialEq)]
pub enum MeshPayload {
    /// Geometry decoded in-process
    Geometry(Arc<MeshData>),
    /// Asset the rendering engine loads itself (e.g. a GLB scene)
    Asset { path: String },
}

/// What an entity renders as
#[derive(Debug, Clone, PartialEq)]
pub enum EntityPayload {
    Mesh(MeshPayload),
    AmbientLight { intensity: f32 },
    Ground { size: f32 },
}

/// A single mesh produced by an import, before it is added to a scene
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedMesh {
    pub name: String,
    pub payload: MeshPayload,
    /// Local-space bounds, when the geometry is known in-process
    pub bounds: Option<BoundingBox>,
}

impl ImportedMesh {
    pub fn from_geometry(name: impl Into<String>, data: MeshData) -> Self {
        let bounds = data.bounds();
        Self {
            name: name.into(),
            payload: MeshPayload::Geometry(Arc::new(data)),
            bounds,
        }
    }

    pub fn from_asset(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: MeshPayload::Asset { path: path.into() },
            bounds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneEntity {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub transform: MeshTransform,
    pub payload: EntityPayload,
    bounds: Option<BoundingBox>,
}

impl SceneEntity {
    pub fn is_fixture(&self) -> bool {
        self.kind == EntityKind::Fixture
    }

    /// Bounds with the current transform applied
    pub fn world_bounds(&self) -> Option<BoundingBox> {
        self.bounds
            .map(|b| b.transformed(self.transform.position, self.transform.scale))
    }
}

/// Capabilities the import and framing logic needs from a scene.
///
/// Keeps centering and navigation math independent of the rendering engine.
pub trait SceneBackend {
    /// Add imported meshes as primary entities, in order
    fn import_asset(&mut self, meshes: Vec<ImportedMesh>) -> Vec<EntityId>;
    /// Remove every non-fixture entity, returning how many were removed
    fn dispose_non_fixtures(&mut self) -> usize;
    /// World-space bounds of an entity, if its geometry is known
    fn bounding_box(&self, id: EntityId) -> Option<BoundingBox>;
    fn transform(&self, id: EntityId) -> Option<MeshTransform>;
    fn apply_transform(&mut self, id: EntityId, transform: MeshTransform);
}

/// In-memory scene owned by one mounted viewer
#[derive(Debug, Clone, Default)]
pub struct Scene {
    entities: Vec<SceneEntity>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId(self.next_id)
    }

    /// Add an entity that persists across reloads
    pub fn spawn_fixture(&mut self, name: impl Into<String>, payload: EntityPayload) -> EntityId {
        let id = self.allocate_id();
        self.entities.push(SceneEntity {
            id,
            name: name.into(),
            kind: EntityKind::Fixture,
            transform: MeshTransform::default(),
            payload,
            bounds: None,
        });
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&SceneEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entities(&self) -> &[SceneEntity] {
        &self.entities
    }

    pub fn fixtures(&self) -> impl Iterator<Item = &SceneEntity> {
        self.entities.iter().filter(|e| e.is_fixture())
    }

    /// Meshes of the live import, in import order
    pub fn primaries(&self) -> impl Iterator<Item = &SceneEntity> {
        self.entities.iter().filter(|e| !e.is_fixture())
    }

    pub fn find_by_name(&self, name: &str) -> Option<&SceneEntity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Ambient light intensity from the light fixture
    pub fn ambient_intensity(&self) -> Option<f32> {
        self.fixtures().find_map(|e| match e.payload {
            EntityPayload::AmbientLight { intensity } => Some(intensity),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Drop everything, fixtures included
    pub fn clear(&mut self) {
        self.entities.clear();
    }
}

impl SceneBackend for Scene {
    fn import_asset(&mut self, meshes: Vec<ImportedMesh>) -> Vec<EntityId> {
        meshes
            .into_iter()
            .map(|mesh| {
                let id = self.allocate_id();
                self.entities.push(SceneEntity {
                    id,
                    name: mesh.name,
                    kind: EntityKind::Primary,
                    transform: MeshTransform::default(),
                    payload: EntityPayload::Mesh(mesh.payload),
                    bounds: mesh.bounds,
                });
                id
            })
            .collect()
    }

    fn dispose_non_fixtures(&mut self) -> usize {
        let before = self.entities.len();
        self.entities.retain(SceneEntity::is_fixture);
        before - self.entities.len()
    }

    fn bounding_box(&self, id: EntityId) -> Option<BoundingBox> {
        self.get(id).and_then(SceneEntity::world_bounds)
    }

    fn transform(&self, id: EntityId) -> Option<MeshTransform> {
        self.get(id).map(|e| e.transform)
    }

    fn apply_transform(&mut self, id: EntityId, transform: MeshTransform) {
        if let Some(entity) = self.entities.iter_mut().find(|e| e.id == id) {
            entity.transform = transform;
        }
    }
}
