//! Model loading and scene mirroring
//!
//! Named GLB models are loaded through the asset server and handed back to
//! the viewer when their load settles. Every frame the viewer's scene is
//! reconciled with bevy entities: new entities are spawned, disposed ones
//! despawned and transforms kept in sync.

use bevy::asset::{LoadState, RenderAssetUsages};
use bevy::gltf::{Gltf, GltfAssetLabel};
use bevy::mesh::Indices;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;
use gardenview_core::{
    AssetSource, EntityId, EntityPayload, ImportError, ImportTicket, ImportedMesh, MeshData,
    MeshPayload, SceneEntity,
};
use std::collections::{HashMap, HashSet};

use crate::coords::{to_render_array, to_render_transform};
use crate::ActiveViewer;

/// Ambient brightness per unit of configured light intensity
const AMBIENT_BRIGHTNESS_SCALE: f32 = 500.0;

/// Plugin for model loading and scene mirroring
pub struct ModelsPlugin;

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ModelCache>()
            .add_message::<LoadModelRequest>()
            .add_systems(
                Update,
                (request_named_models, load_models, sync_scene_entities).chain(),
            );
    }
}

/// Message asking the viewer to replace its model with a named one
#[derive(Message, Debug, Clone)]
pub struct LoadModelRequest {
    pub name: String,
}

/// Links a bevy entity to the viewer scene entity it renders
#[derive(Component, Debug, Clone, Copy)]
pub struct SceneEntityLink {
    pub id: EntityId,
}

/// A GLB load that still has to be reported to the viewer
struct PendingLoad {
    ticket: ImportTicket,
    name: String,
    path: String,
    handle: Handle<Gltf>,
}

/// Cache of loaded model handles
#[derive(Resource, Default)]
pub struct ModelCache {
    /// Scenes of fully loaded GLB files, by asset path
    pub scenes: HashMap<String, Handle<Scene>>,
    loading: Vec<PendingLoad>,
}

impl ModelCache {
    /// Drop scenes no asset entity in `scene` still renders
    pub fn evict_unused(&mut self, scene: &gardenview_core::Scene) {
        let live: HashSet<&str> = scene
            .entities()
            .iter()
            .filter_map(|entity| match &entity.payload {
                EntityPayload::Mesh(MeshPayload::Asset { path }) => Some(path.as_str()),
                _ => None,
            })
            .collect();
        self.scenes.retain(|path, _| {
            let keep = live.contains(path.as_str());
            if !keep {
                tracing::debug!("Evicting cached model: {}", path);
            }
            keep
        });
    }

    /// Forget every cached scene and pending load
    pub fn clear(&mut self) {
        self.scenes.clear();
        self.loading.clear();
    }
}

/// Start loading requested models
fn request_named_models(
    mut requests: MessageReader<LoadModelRequest>,
    mut viewer: ResMut<ActiveViewer>,
    mut model_cache: ResMut<ModelCache>,
    asset_server: Res<AssetServer>,
) {
    for request in requests.read() {
        let Some((ticket, source)) = viewer.load_named(&request.name) else {
            continue;
        };
        let AssetSource::Named { name, path } = source else {
            continue;
        };

        tracing::info!("Starting to load model: {}", path);
        let handle: Handle<Gltf> = asset_server.load(path.clone());
        model_cache.loading.push(PendingLoad {
            ticket,
            name,
            path,
            handle,
        });
    }
}

/// Check loading state and hand finished GLB loads to the viewer
fn load_models(
    mut viewer: ResMut<ActiveViewer>,
    mut model_cache: ResMut<ModelCache>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
) {
    // A newer request makes older loads irrelevant
    model_cache.loading.retain(|pending| viewer.is_current(pending.ticket));

    let mut settled = Vec::new();
    for (index, pending) in model_cache.loading.iter().enumerate() {
        let result = match asset_server.get_load_state(pending.handle.id()) {
            Some(LoadState::Loaded) => {
                // Prefer the default scene, fall back to the first one
                Ok(gltf_assets.get(&pending.handle).and_then(|gltf| {
                    gltf.default_scene
                        .clone()
                        .or_else(|| gltf.scenes.first().cloned())
                }))
            }
            Some(LoadState::Failed(err)) => Err(ImportError::Read {
                source_name: pending.path.clone(),
                reason: err.to_string(),
            }),
            _ => continue,
        };
        settled.push((index, result));
    }

    // Remove from the back so earlier indices stay valid
    for (index, result) in settled.into_iter().rev() {
        let pending = model_cache.loading.remove(index);
        let meshes = result.map(|scene| match scene {
            Some(scene) => {
                tracing::info!("Model loaded: {}", pending.path);
                model_cache.scenes.insert(pending.path.clone(), scene);
                vec![ImportedMesh::from_asset(pending.name.clone(), pending.path.clone())]
            }
            None => Vec::new(),
        });
        viewer.complete_import(pending.ticket, meshes);
    }
}

/// Reconcile bevy entities with the viewer scene
fn sync_scene_entities(
    mut commands: Commands,
    viewer: Res<ActiveViewer>,
    mut model_cache: ResMut<ModelCache>,
    asset_server: Res<AssetServer>,
    mut existing: Query<(Entity, &SceneEntityLink, &mut Transform)>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let scene = viewer.scene();
    let mut spawned: HashMap<EntityId, Entity> = HashMap::new();

    for (entity, link, mut transform) in &mut existing {
        match scene.get(link.id) {
            Some(scene_entity) => {
                let wanted = to_render_transform(&scene_entity.transform);
                if *transform != wanted {
                    *transform = wanted;
                }
                spawned.insert(link.id, entity);
            }
            None => commands.entity(entity).despawn(),
        }
    }
    model_cache.evict_unused(scene);

    for scene_entity in scene.entities() {
        if spawned.contains_key(&scene_entity.id) {
            continue;
        }
        spawn_scene_entity(
            &mut commands,
            scene_entity,
            &model_cache,
            &asset_server,
            &mut meshes,
            &mut materials,
        );
    }
}

fn spawn_scene_entity(
    commands: &mut Commands,
    scene_entity: &SceneEntity,
    model_cache: &ModelCache,
    asset_server: &AssetServer,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) {
    let link = SceneEntityLink {
        id: scene_entity.id,
    };
    let transform = to_render_transform(&scene_entity.transform);
    let name = Name::new(scene_entity.name.clone());

    match &scene_entity.payload {
        EntityPayload::Mesh(MeshPayload::Geometry(data)) => {
            let material = if data.is_point_cloud() {
                StandardMaterial {
                    base_color: Color::WHITE,
                    unlit: true,
                    ..default()
                }
            } else {
                StandardMaterial {
                    base_color: Color::srgb(0.8, 0.8, 0.8),
                    perceptual_roughness: 0.8,
                    double_sided: true,
                    cull_mode: None,
                    ..default()
                }
            };
            tracing::info!(
                "Spawning mesh {} ({} vertices)",
                scene_entity.name,
                data.vertex_count()
            );
            commands.spawn((
                Mesh3d(meshes.add(mesh_from_data(data))),
                MeshMaterial3d(materials.add(material)),
                transform,
                name,
                link,
            ));
        }
        EntityPayload::Mesh(MeshPayload::Asset { path }) => {
            let scene_handle = model_cache.scenes.get(path).cloned().unwrap_or_else(|| {
                asset_server.load(GltfAssetLabel::Scene(0).from_asset(path.clone()))
            });
            tracing::info!("Spawning model {} from {}", scene_entity.name, path);
            commands.spawn((SceneRoot(scene_handle), transform, name, link));
        }
        EntityPayload::Ground { size } => {
            commands.spawn((
                Mesh3d(meshes.add(Plane3d::default().mesh().size(*size, *size))),
                MeshMaterial3d(materials.add(StandardMaterial {
                    base_color: Color::srgb(0.35, 0.45, 0.3),
                    perceptual_roughness: 1.0,
                    ..default()
                })),
                transform,
                name,
                link,
            ));
        }
        EntityPayload::AmbientLight { intensity } => {
            commands.insert_resource(AmbientLight {
                color: Color::WHITE,
                brightness: intensity * AMBIENT_BRIGHTNESS_SCALE,
                ..default()
            });
            commands.spawn((transform, name, link));
        }
    }
}

/// Build a render mesh from decoded geometry.
///
/// Positions and normals are mirrored into render space, which flips the
/// handedness, so triangle winding is reversed to keep faces outward.
pub fn mesh_from_data(data: &MeshData) -> Mesh {
    let positions: Vec<[f32; 3]> = data.positions.iter().copied().map(to_render_array).collect();

    let topology = if data.is_point_cloud() {
        PrimitiveTopology::PointList
    } else {
        PrimitiveTopology::TriangleList
    };
    let mut mesh = Mesh::new(topology, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions);

    if let Some(colors) = &data.colors {
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors.clone());
    }

    if data.is_point_cloud() {
        return mesh;
    }

    let mut indices = data.indices.clone();
    for triangle in indices.chunks_exact_mut(3) {
        triangle.swap(1, 2);
    }
    mesh.insert_indices(Indices::U32(indices));

    match &data.normals {
        Some(normals) => {
            let normals: Vec<[f32; 3]> = normals.iter().copied().map(to_render_array).collect();
            mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        }
        None => mesh.compute_normals(),
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::mesh::VertexAttributeValues;
    use gardenview_core::{SurfaceSize, Viewer, ViewerConfig};

    #[test]
    fn test_mesh_from_data_mirrors_and_rewinds() {
        let data = MeshData {
            positions: vec![[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let mesh = mesh_from_data(&data);

        let Some(VertexAttributeValues::Float32x3(positions)) =
            mesh.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            panic!("missing positions");
        };
        assert_eq!(positions[1], [1.0, 0.0, -1.0]);

        let Some(Indices::U32(indices)) = mesh.indices() else {
            panic!("missing indices");
        };
        assert_eq!(indices, &vec![0, 2, 1]);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
    }

    #[test]
    fn test_cache_follows_scene_assets() {
        let mut viewer = Viewer::new(ViewerConfig::default());
        assert!(viewer.mount(Some(SurfaceSize::new(800, 600))));
        let mut cache = ModelCache::default();

        let (ticket, source) = viewer.load_named("bed").unwrap();
        let AssetSource::Named { name, path } = source else {
            panic!("named source expected");
        };
        viewer.complete_import(ticket, Ok(vec![ImportedMesh::from_asset(name, path.clone())]));
        cache.scenes.insert(path.clone(), Handle::default());
        cache.scenes.insert("models/old.glb".to_string(), Handle::default());

        cache.evict_unused(viewer.scene());
        assert_eq!(cache.scenes.len(), 1);
        assert!(cache.scenes.contains_key(&path));

        // Loading another model disposes the bed
        viewer.load_named("tree").unwrap();
        cache.evict_unused(viewer.scene());
        assert!(cache.scenes.is_empty());
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut cache = ModelCache::default();
        cache.scenes.insert("models/bed.glb".to_string(), Handle::default());
        cache.clear();
        assert!(cache.scenes.is_empty());
        assert!(cache.loading.is_empty());
    }

    #[test]
    fn test_point_cloud_mesh() {
        let data = MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]],
            colors: Some(vec![[1.0, 0.0, 0.0, 1.0]; 2]),
            ..Default::default()
        };
        let mesh = mesh_from_data(&data);
        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::PointList);
        assert!(mesh.indices().is_none());
        assert!(mesh.attribute(Mesh::ATTRIBUTE_COLOR).is_some());
    }
}
