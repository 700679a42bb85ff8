//! Asset import sequencing
//!
//! Imports are asynchronous. Every request gets an [`ImportTicket`]; only the
//! result for the most recent ticket is applied to the scene, anything older
//! is reported as superseded and dropped.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::AssetsConfig;
use crate::framing::FramingMode;
use crate::ply::{self, PlyError};
use crate::scene::{EntityId, ImportedMesh, SceneBackend};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("Failed to read {source_name}: {reason}")]
    Read { source_name: String, reason: String },
    #[error("Failed to parse model: {0}")]
    Parse(#[from] PlyError),
    #[error("Model contains no meshes")]
    Empty,
}

/// Supported model container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFormat {
    Glb,
    Gltf,
    Ply,
}

impl AssetFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "glb" => Some(Self::Glb),
            "gltf" => Some(Self::Gltf),
            "ply" => Some(Self::Ply),
            _ => None,
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        // Ignore query strings on URLs
        let path = path.split(['?', '#']).next().unwrap_or(path);
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Where a model comes from
#[derive(Debug, Clone, PartialEq)]
pub enum AssetSource {
    /// A model served by the application, placed as-is
    Named { name: String, path: String },
    /// A file picked by the user, always decoded as PLY
    Local {
        filename: String,
        bytes: Arc<Vec<u8>>,
    },
}

impl AssetSource {
    /// Resolve a model name against the configured asset directory.
    ///
    /// Names without an extension get the default one appended. Absolute URLs
    /// and paths starting with `/` are used unchanged.
    pub fn named(name: &str, assets: &AssetsConfig) -> Self {
        let name = name.trim();
        let has_extension = AssetFormat::from_path(name).is_some();
        let file = if has_extension {
            name.to_string()
        } else {
            format!("{}.{}", name, assets.default_extension)
        };

        let absolute = name.contains("://") || name.starts_with('/');
        let path = if absolute || assets.models_dir.is_empty() {
            file
        } else {
            format!("{}/{}", assets.models_dir.trim_end_matches('/'), file)
        };

        Self::Named {
            name: name.to_string(),
            path,
        }
    }

    /// A user-selected file. Its extension is ignored.
    pub fn local(filename: &str, bytes: Vec<u8>) -> Self {
        Self::Local {
            filename: filename.to_string(),
            bytes: Arc::new(bytes),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Named { name, .. } => name,
            Self::Local { filename, .. } => filename,
        }
    }

    /// Named models keep their authored placement, uploads get centered
    pub fn framing_mode(&self) -> FramingMode {
        match self {
            Self::Named { .. } => FramingMode::Placement,
            Self::Local { .. } => FramingMode::Centering,
        }
    }
}

/// Decode a local source in-process.
///
/// Returns `Ok(None)` for named sources, which the rendering engine loads.
pub fn decode_local(source: &AssetSource) -> Result<Option<Vec<ImportedMesh>>, ImportError> {
    let AssetSource::Local { filename, bytes } = source else {
        return Ok(None);
    };

    let data = ply::decode(bytes)?;
    debug!(
        file = %filename,
        vertices = data.vertex_count(),
        triangles = data.triangle_count(),
        "Decoded PLY"
    );
    if data.vertex_count() == 0 {
        return Ok(Some(Vec::new()));
    }
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    Ok(Some(vec![ImportedMesh::from_geometry(stem, data)]))
}

/// Sequence number of one import request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImportTicket(pub u64);

/// Byte progress of the current import
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl ImportProgress {
    /// Completed fraction, when the total size is known
    pub fn fraction(&self) -> Option<f32> {
        self.total
            .filter(|&t| t > 0)
            .map(|t| (self.loaded as f32 / t as f32).min(1.0))
    }
}

/// Result of completing an import
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// Meshes added to the scene, in import order
    Loaded(Vec<EntityId>),
    Failed(ImportError),
    /// A newer import started before this one finished
    Superseded,
}

/// Tracks in-flight imports and applies their results
#[derive(Debug, Default)]
pub struct Importer {
    latest: u64,
    loading: bool,
    progress: Option<ImportProgress>,
    last_error: Option<ImportError>,
}

impl Importer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an import: clear previous primaries and issue a new ticket
    pub fn begin<S: SceneBackend>(&mut self, source: &AssetSource, scene: &mut S) -> ImportTicket {
        let disposed = scene.dispose_non_fixtures();
        self.latest += 1;
        self.loading = true;
        self.progress = None;
        self.last_error = None;
        info!(
            ticket = self.latest,
            source = %source.display_name(),
            disposed,
            "Import started"
        );
        ImportTicket(self.latest)
    }

    /// Make every outstanding ticket stale without starting a new import
    pub fn invalidate(&mut self) {
        self.latest += 1;
        self.loading = false;
        self.progress = None;
    }

    pub fn is_current(&self, ticket: ImportTicket) -> bool {
        ticket.0 == self.latest
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn progress(&self) -> Option<ImportProgress> {
        self.progress
    }

    pub fn last_error(&self) -> Option<&ImportError> {
        self.last_error.as_ref()
    }

    /// Record byte progress; ignored for stale tickets
    pub fn report_progress(&mut self, ticket: ImportTicket, loaded: u64, total: Option<u64>) {
        if self.is_current(ticket) && self.loading {
            debug!(ticket = ticket.0, loaded, ?total, "Import progress");
            self.progress = Some(ImportProgress { loaded, total });
        }
    }

    /// Apply an import result if its ticket is still the latest
    pub fn complete<S: SceneBackend>(
        &mut self,
        ticket: ImportTicket,
        result: Result<Vec<ImportedMesh>, ImportError>,
        scene: &mut S,
    ) -> ImportOutcome {
        if !self.is_current(ticket) {
            warn!(
                ticket = ticket.0,
                latest = self.latest,
                "Discarding result of superseded import"
            );
            return ImportOutcome::Superseded;
        }
        if !self.loading {
            warn!(ticket = ticket.0, "Import already completed");
            return ImportOutcome::Superseded;
        }

        self.loading = false;
        self.progress = None;

        let result = result.and_then(|meshes| {
            if meshes.is_empty() {
                Err(ImportError::Empty)
            } else {
                Ok(meshes)
            }
        });

        match result {
            Ok(meshes) => {
                let ids = scene.import_asset(meshes);
                info!(ticket = ticket.0, meshes = ids.len(), "Import finished");
                ImportOutcome::Loaded(ids)
            }
            Err(e) => {
                error!(ticket = ticket.0, error = %e, "Import failed");
                self.last_error = Some(e.clone());
                ImportOutcome::Failed(e)
            }
        }
    }
}
