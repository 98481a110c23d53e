// Request and response bodies for the HTTP and WebSocket endpoints.

use serde::{Deserialize, Serialize};

use crate::batch::FileReport;
use crate::bridge::BatchDelivery;
use crate::imaging::ImageBounds;
use crate::session::SessionRole;

/// Sentinel the editor sends instead of a mask when nothing is selected.
pub const NO_MASK: &str = "nomask";

/// Query parameters for GET /ps/renderbatch
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RenderBatchQuery {
    #[serde(rename = "cmUID", default)]
    pub cm_uid: String,
    // Comma-delimited list of filenames in the temp directory.
    #[serde(default)]
    pub filenames: String,
}

impl RenderBatchQuery {
    pub fn filename_list(&self) -> Vec<String> {
        split_filenames(&self.filenames)
    }
}

// Empty segments (including a missing parameter) are dropped.
pub fn split_filenames(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Body of POST /ps/render_complete, sent when the pipeline finishes a render.
#[derive(Deserialize, Debug, Clone)]
pub struct RenderCompleteRequest {
    #[serde(default)]
    pub filenames: Vec<String>,
    #[serde(default, alias = "cmUID")]
    pub cm_uid: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Ready,
    Skipped,
}

#[derive(Serialize, Debug, Clone)]
pub struct FileStatusDesc {
    pub filename: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&FileReport> for FileStatusDesc {
    fn from(report: &FileReport) -> Self {
        Self {
            filename: report.filename.clone(),
            status: if report.skipped.is_some() {
                FileStatus::Skipped
            } else {
                FileStatus::Ready
            },
            reason: report.skipped.as_ref().map(ToString::to_string),
        }
    }
}

/// Acknowledgment returned once the broadcast attempt has completed.
#[derive(Serialize, Debug, Clone)]
pub struct BatchAck {
    pub message: String,
    pub requested: usize,
    pub cm_uid: String,
    pub sent: bool,
    pub recipients: usize,
    pub delivered: usize,
    pub files: Vec<FileStatusDesc>,
}

impl From<BatchDelivery> for BatchAck {
    fn from(delivery: BatchDelivery) -> Self {
        Self {
            message: format!(
                "Batch of {} images sent to ps with cmUID: {}",
                delivery.requested, delivery.cm_uid
            ),
            requested: delivery.requested,
            sent: delivery.sent,
            recipients: delivery.delivery.recipients,
            delivered: delivery.delivery.delivered,
            files: delivery.files.iter().map(FileStatusDesc::from).collect(),
            cm_uid: delivery.cm_uid,
        }
    }
}

/// Body of POST /ps/mask
#[derive(Deserialize, Debug, Clone)]
pub struct MaskSaveRequest {
    pub filename: String,
    // Either NO_MASK or a base64 encoded image (a data URL prefix is allowed).
    pub mask: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub bounds: Option<ImageBounds>,
}

#[derive(Serialize, Debug, Clone)]
pub struct SavedFileResponse {
    pub filename: String,
    pub bytes: u64,
}

/// JSON form of PUT /ps/inputs/{filename}
#[derive(Deserialize, Debug, Clone)]
pub struct UploadBody {
    // Base64 encoded file contents.
    pub data: String,
}

/// Query parameters for the WebSocket upgrade
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SocketQuery {
    #[serde(default)]
    pub role: SessionRole,
    #[serde(default, alias = "clientId")]
    pub client_id: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct SessionCounts {
    pub editor: usize,
    pub pipeline: usize,
}

#[derive(Serialize, Debug, Clone)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: SessionCounts,
}
