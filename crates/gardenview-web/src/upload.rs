//! Gallery upload client
//!
//! Sends the model currently on screen to the gallery backend and asks it to
//! render a preview. The viewer itself never waits on the outcome.

use bevy::prelude::*;
use gardenview_core::config::UploadConfig;
use gardenview_core::AssetSource;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("Gallery upload is disabled")]
    Disabled,
    #[error("No uploaded model to save")]
    NothingToUpload,
    #[error("Request to {endpoint} failed: {reason}")]
    Network { endpoint: String, reason: String },
    #[error("{endpoint} responded with status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("Gallery upload is not supported on this platform")]
    Unsupported,
}

/// What the overlay shows about the last gallery upload
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading { filename: String },
    Saved { filename: String },
    Failed(UploadError),
}

/// Result slot filled by the async upload task
type PendingUpload = Arc<Mutex<Option<Result<String, UploadError>>>>;

/// Gallery upload state
#[derive(Resource, Default)]
pub struct GalleryUpload {
    status: UploadStatus,
    pending: PendingUpload,
}

impl GalleryUpload {
    pub fn status(&self) -> &UploadStatus {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.status, UploadStatus::Uploading { .. })
    }

    /// Upload `source` and request its preview
    pub fn start(&mut self, config: &UploadConfig, source: Option<&AssetSource>) {
        if self.is_busy() {
            return;
        }
        if !config.enabled {
            self.status = UploadStatus::Failed(UploadError::Disabled);
            return;
        }
        let Some(AssetSource::Local { filename, bytes }) = source else {
            self.status = UploadStatus::Failed(UploadError::NothingToUpload);
            return;
        };

        tracing::info!("Uploading {} to gallery", filename);
        self.status = UploadStatus::Uploading {
            filename: filename.clone(),
        };
        spawn_upload(
            config.clone(),
            filename.clone(),
            bytes.clone(),
            self.pending.clone(),
        );
    }

    /// Pick up a finished upload, if any
    fn poll(&mut self) {
        let finished = self.pending.lock().ok().and_then(|mut slot| slot.take());
        match finished {
            Some(Ok(filename)) => {
                tracing::info!("Saved {} to gallery", filename);
                self.status = UploadStatus::Saved { filename };
            }
            Some(Err(e)) => {
                tracing::error!("Gallery upload failed: {}", e);
                self.status = UploadStatus::Failed(e);
            }
            None => {}
        }
    }
}

/// Gallery upload plugin
pub struct UploadPlugin;

impl Plugin for UploadPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GalleryUpload>()
            .add_systems(Update, poll_upload);
    }
}

fn poll_upload(mut upload: ResMut<GalleryUpload>) {
    upload.poll();
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    filename: Option<String>,
}

/// Stored filename reported by the upload endpoint, or `fallback`
fn parse_upload_response(text: &str, fallback: &str) -> String {
    serde_json::from_str::<UploadResponse>(text)
        .ok()
        .and_then(|response| response.filename)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// JSON body for the preview request
fn preview_body(filename: &str) -> String {
    serde_json::json!({ "filename": filename }).to_string()
}

#[cfg(target_arch = "wasm32")]
fn spawn_upload(config: UploadConfig, filename: String, bytes: Arc<Vec<u8>>, pending: PendingUpload) {
    use wasm_bindgen_futures::spawn_local;

    spawn_local(async move {
        let result = upload_model(&config, &filename, &bytes).await;
        if let Ok(mut slot) = pending.lock() {
            *slot = Some(result);
        }
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_upload(
    _config: UploadConfig,
    _filename: String,
    _bytes: Arc<Vec<u8>>,
    pending: PendingUpload,
) {
    if let Ok(mut slot) = pending.lock() {
        *slot = Some(Err(UploadError::Unsupported));
    }
}

#[cfg(target_arch = "wasm32")]
async fn upload_model(
    config: &UploadConfig,
    filename: &str,
    bytes: &[u8],
) -> Result<String, UploadError> {
    use gloo_net::http::Request;

    let network = |endpoint: &str| {
        let endpoint = endpoint.to_string();
        move |e: gloo_net::Error| UploadError::Network {
            endpoint,
            reason: e.to_string(),
        }
    };

    let form = build_form(filename, bytes).map_err(|reason| UploadError::Network {
        endpoint: config.endpoint.clone(),
        reason,
    })?;
    let response = Request::post(&config.endpoint)
        .body(form)
        .map_err(network(&config.endpoint))?
        .send()
        .await
        .map_err(network(&config.endpoint))?;
    if !response.ok() {
        return Err(UploadError::Status {
            endpoint: config.endpoint.clone(),
            status: response.status(),
        });
    }
    let text = response.text().await.unwrap_or_default();
    let stored = parse_upload_response(&text, filename);

    let response = Request::post(&config.preview_endpoint)
        .header("Content-Type", "application/json")
        .body(preview_body(filename))
        .map_err(network(&config.preview_endpoint))?
        .send()
        .await
        .map_err(network(&config.preview_endpoint))?;
    if !response.ok() {
        return Err(UploadError::Status {
            endpoint: config.preview_endpoint.clone(),
            status: response.status(),
        });
    }

    Ok(stored)
}

/// Multipart form with the model bytes under the `file` field
#[cfg(target_arch = "wasm32")]
fn build_form(filename: &str, bytes: &[u8]) -> Result<web_sys::FormData, String> {
    let uint8_array = js_sys::Uint8Array::from(bytes);
    let array = js_sys::Array::new();
    array.push(&uint8_array.buffer());

    let blob_options = web_sys::BlobPropertyBag::new();
    blob_options.set_type("application/octet-stream");

    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&array, &blob_options)
        .map_err(|e| format!("{:?}", e))?;
    let form = web_sys::FormData::new().map_err(|e| format!("{:?}", e))?;
    form.append_with_blob_and_filename("file", &blob, filename)
        .map_err(|e| format!("{:?}", e))?;
    Ok(form)
}
