//! Local model files chosen by the user
//!
//! Files arrive either through the overlay's upload button (a hidden
//! `<input type=file>`) or through the exported `on_file_selected` function.
//! Browser callbacks only push [`FileEvent`]s onto a queue; a system drains
//! it and drives the viewer's import sequence.

use bevy::prelude::*;
use gardenview_core::{AssetSource, ImportError, ImportOutcome, ImportTicket};
use gardenview_scene::ActiveViewer;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Accepted by the hidden file input
const ACCEPT: &str = ".ply";

/// File import plugin
pub struct FilePickerPlugin;

impl Plugin for FilePickerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FileImports>()
            .add_systems(PreUpdate, process_file_events);
    }
}

/// Progress of one browser file read
#[derive(Debug, Clone, PartialEq)]
pub enum FileEvent {
    Selected {
        request: u64,
        filename: String,
        size: u64,
    },
    Progress {
        request: u64,
        loaded: u64,
        total: Option<u64>,
    },
    Loaded {
        request: u64,
        bytes: Vec<u8>,
    },
    Failed {
        request: u64,
        reason: String,
    },
}

static FILE_EVENTS: Mutex<VecDeque<FileEvent>> = Mutex::new(VecDeque::new());
static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

fn next_request() -> u64 {
    NEXT_REQUEST.fetch_add(1, Ordering::Relaxed)
}

fn push_event(event: FileEvent) {
    if let Ok(mut queue) = FILE_EVENTS.lock() {
        queue.push_back(event);
    }
}

fn drain_events() -> Vec<FileEvent> {
    FILE_EVENTS
        .lock()
        .map(|mut queue| queue.drain(..).collect())
        .unwrap_or_default()
}

/// File reads in flight and the last file shown
#[derive(Resource, Default)]
pub struct FileImports {
    reads: HashMap<u64, (ImportTicket, String)>,
    /// The most recent file that loaded successfully
    pub last_loaded: Option<AssetSource>,
}

impl FileImports {
    pub fn is_reading(&self) -> bool {
        !self.reads.is_empty()
    }
}

/// Apply queued file events to the viewer
fn process_file_events(mut viewer: ResMut<ActiveViewer>, mut imports: ResMut<FileImports>) {
    for event in drain_events() {
        apply_event(&mut viewer, &mut imports, event);
    }
}

fn apply_event(viewer: &mut ActiveViewer, imports: &mut FileImports, event: FileEvent) {
    match event {
        FileEvent::Selected {
            request,
            filename,
            size,
        } => {
            // Starting the import disposes the current model right away
            let placeholder = AssetSource::local(&filename, Vec::new());
            let Some(ticket) = viewer.begin_import(&placeholder) else {
                return;
            };
            viewer.report_progress(ticket, 0, Some(size));
            imports.reads.insert(request, (ticket, filename));
        }
        FileEvent::Progress {
            request,
            loaded,
            total,
        } => {
            if let Some((ticket, _)) = imports.reads.get(&request) {
                viewer.report_progress(*ticket, loaded, total);
            }
        }
        FileEvent::Loaded { request, bytes } => {
            let Some((ticket, filename)) = imports.reads.remove(&request) else {
                return;
            };
            let source = AssetSource::local(&filename, bytes);
            if let ImportOutcome::Loaded(_) = viewer.complete_local(ticket, &source) {
                imports.last_loaded = Some(source);
            }
        }
        FileEvent::Failed { request, reason } => {
            let Some((ticket, filename)) = imports.reads.remove(&request) else {
                tracing::error!("File read {} failed: {}", request, reason);
                return;
            };
            viewer.complete_import(
                ticket,
                Err(ImportError::Read {
                    source_name: filename,
                    reason,
                }),
            );
        }
    }
}

// ============================================================================
// JavaScript Interop (WASM only)
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod js_interop {
    use super::*;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{FileReader, HtmlInputElement, ProgressEvent};

    /// Open the browser file dialog through a hidden input element
    pub fn open_file_picker(accept: &str) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            tracing::error!("open_file_picker: no document object");
            return;
        };

        let input: HtmlInputElement = match document
            .create_element("input")
            .map(|el| el.dyn_into::<HtmlInputElement>())
        {
            Ok(Ok(input)) => input,
            _ => {
                tracing::error!("open_file_picker: failed to create file input");
                return;
            }
        };

        input.set_type("file");
        input.set_accept(accept);
        input.style().set_property("display", "none").ok();

        let Some(body) = document.body() else {
            tracing::error!("open_file_picker: no document body");
            return;
        };
        if let Err(e) = body.append_child(&input) {
            tracing::error!("open_file_picker: failed to append input: {:?}", e);
            return;
        }

        let input_clone = input.clone();
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            match input_clone.files().and_then(|files| files.get(0)) {
                Some(file) => read_file(&file),
                None => tracing::debug!("open_file_picker: no file selected"),
            }

            if let Some(parent) = input_clone.parent_node() {
                parent.remove_child(&input_clone).ok();
            }
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(closure.as_ref().unchecked_ref()));
        closure.forget();

        input.click();
    }

    /// Read a file into memory, reporting progress along the way
    pub fn read_file(file: &web_sys::File) {
        let request = next_request();
        let filename = file.name();
        tracing::info!("Reading local file: {}", filename);

        // Registered first so any failure below reaches the viewer
        push_event(FileEvent::Selected {
            request,
            filename,
            size: file.size() as u64,
        });

        let reader = match FileReader::new() {
            Ok(reader) => reader,
            Err(e) => {
                push_event(FileEvent::Failed {
                    request,
                    reason: format!("{:?}", e),
                });
                return;
            }
        };

        let onprogress = Closure::wrap(Box::new(move |event: ProgressEvent| {
            let total = event.length_computable().then(|| event.total() as u64);
            push_event(FileEvent::Progress {
                request,
                loaded: event.loaded() as u64,
                total,
            });
        }) as Box<dyn FnMut(_)>);
        reader.set_onprogress(Some(onprogress.as_ref().unchecked_ref()));
        onprogress.forget();

        let reader_clone = reader.clone();
        let onload = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let event = match reader_clone
                .result()
                .ok()
                .and_then(|result| result.dyn_into::<js_sys::ArrayBuffer>().ok())
            {
                Some(buffer) => FileEvent::Loaded {
                    request,
                    bytes: js_sys::Uint8Array::new(&buffer).to_vec(),
                },
                None => FileEvent::Failed {
                    request,
                    reason: "reader returned no data".to_string(),
                },
            };
            push_event(event);
        }) as Box<dyn FnMut(_)>);
        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        onload.forget();

        let onerror = Closure::wrap(Box::new(move |_: web_sys::Event| {
            push_event(FileEvent::Failed {
                request,
                reason: "file could not be read".to_string(),
            });
        }) as Box<dyn FnMut(_)>);
        reader.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();

        if let Err(e) = reader.read_as_array_buffer(file) {
            push_event(FileEvent::Failed {
                request,
                reason: format!("{:?}", e),
            });
        }
    }
}

// Non-WASM stubs
#[cfg(not(target_arch = "wasm32"))]
mod js_interop {
    use super::*;

    pub fn open_file_picker(_accept: &str) {
        tracing::warn!("File picker not supported on this platform");
    }

    pub fn read_file(_file: &web_sys::File) {
        push_event(FileEvent::Failed {
            request: next_request(),
            reason: "File reading not supported on this platform".to_string(),
        });
    }
}

pub use js_interop::read_file;

/// Helper to trigger the upload dialog from the UI
pub fn trigger_file_open() {
    js_interop::open_file_picker(ACCEPT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use gardenview_core::{SurfaceSize, Viewer, ViewerConfig};

    const TRIANGLE_PLY: &str = "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n0 0 0\n2 0 0\n0 2 0\n3 0 1 2\n";

    fn mounted_viewer() -> ActiveViewer {
        let mut viewer = Viewer::new(ViewerConfig::default());
        assert!(viewer.mount(Some(SurfaceSize::new(800, 600))));
        ActiveViewer(viewer)
    }

    fn select(viewer: &mut ActiveViewer, imports: &mut FileImports, request: u64, name: &str) {
        apply_event(
            viewer,
            imports,
            FileEvent::Selected {
                request,
                filename: name.to_string(),
                size: 100,
            },
        );
    }

    #[test]
    fn test_selected_file_loads_and_is_remembered() {
        let mut viewer = mounted_viewer();
        let mut imports = FileImports::default();

        select(&mut viewer, &mut imports, 1, "bed.ply");
        assert!(viewer.is_loading());
        assert!(imports.is_reading());

        apply_event(
            &mut viewer,
            &mut imports,
            FileEvent::Progress {
                request: 1,
                loaded: 50,
                total: Some(100),
            },
        );
        assert_eq!(viewer.progress().and_then(|p| p.fraction()), Some(0.5));

        apply_event(
            &mut viewer,
            &mut imports,
            FileEvent::Loaded {
                request: 1,
                bytes: TRIANGLE_PLY.as_bytes().to_vec(),
            },
        );
        assert!(!viewer.is_loading());
        assert!(!imports.is_reading());
        assert!(viewer.scene().find_by_name("bed").is_some());
        assert_eq!(
            imports.last_loaded.as_ref().map(|s| s.display_name()),
            Some("bed.ply")
        );
    }

    #[test]
    fn test_earlier_file_finishing_late_is_ignored() {
        let mut viewer = mounted_viewer();
        let mut imports = FileImports::default();

        select(&mut viewer, &mut imports, 1, "first.ply");
        select(&mut viewer, &mut imports, 2, "second.ply");

        apply_event(
            &mut viewer,
            &mut imports,
            FileEvent::Loaded {
                request: 2,
                bytes: TRIANGLE_PLY.as_bytes().to_vec(),
            },
        );
        apply_event(
            &mut viewer,
            &mut imports,
            FileEvent::Loaded {
                request: 1,
                bytes: TRIANGLE_PLY.as_bytes().to_vec(),
            },
        );

        assert!(viewer.scene().find_by_name("second").is_some());
        assert!(viewer.scene().find_by_name("first").is_none());
        assert_eq!(
            imports.last_loaded.as_ref().map(|s| s.display_name()),
            Some("second.ply")
        );
    }

    #[test]
    fn test_failed_read_surfaces_error() {
        let mut viewer = mounted_viewer();
        let mut imports = FileImports::default();

        select(&mut viewer, &mut imports, 7, "broken.ply");
        apply_event(
            &mut viewer,
            &mut imports,
            FileEvent::Failed {
                request: 7,
                reason: "permission denied".to_string(),
            },
        );

        assert!(!viewer.is_loading());
        assert!(matches!(
            viewer.last_error(),
            Some(ImportError::Read { source_name, .. }) if source_name == "broken.ply"
        ));
        assert!(imports.last_loaded.is_none());
    }

    #[test]
    fn test_failure_for_unknown_read_is_dropped() {
        let mut viewer = mounted_viewer();
        let mut imports = FileImports::default();

        apply_event(
            &mut viewer,
            &mut imports,
            FileEvent::Failed {
                request: 42,
                reason: "reader unavailable".to_string(),
            },
        );
        assert!(viewer.last_error().is_none());
        assert!(!viewer.is_loading());
        assert_eq!(viewer.scene().fixtures().count(), viewer.scene().len());
    }
}
