//! Gardenview Core - Scene model, mesh import and camera navigation
//!
//! This crate holds everything the viewer does that is independent of the
//! rendering engine:
//! - Bounding boxes and mesh geometry
//! - PLY decoding for locally selected files
//! - The orbit camera and discrete pan/zoom navigation
//! - The scene model with explicit fixture tagging
//! - Import sequencing and auto-framing of freshly imported meshes
//! - Viewer configuration

pub mod bootstrap;
pub mod camera;
pub mod config;
pub mod controls;
pub mod framing;
pub mod geometry;
pub mod import;
pub mod ply;
pub mod scene;
pub mod viewer;

pub use glam;

pub use bootstrap::{InitError, SurfaceSize};
pub use camera::OrbitCamera;
pub use config::{ConfigError, ViewerConfig};
pub use controls::{CameraController, PanDirection};
pub use framing::{AutoFramer, FramingMode};
pub use geometry::{BoundingBox, MeshData};
pub use import::{
    AssetFormat, AssetSource, ImportError, ImportOutcome, ImportProgress, ImportTicket, Importer,
};
pub use ply::PlyError;
pub use scene::{
    EntityId, EntityKind, EntityPayload, ImportedMesh, MeshPayload, MeshTransform, Scene,
    SceneBackend, SceneEntity,
};
pub use viewer::Viewer;
