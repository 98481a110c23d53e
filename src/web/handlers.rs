// API handlers for the web server

use super::{
    SharedBridge,
    error::ApiError,
    extract_request_data::{decode_base64_payload, extract_upload},
    files::serve_contained,
    models::*,
};
use crate::imaging::{MaskRequest, MaskSource, codec::image_format_from_content_type};
use crate::session::SessionRole;
use axum::{
    Json,
    extract::{Path, Query, Request, State},
    response::Response,
};
use tracing::{debug, error, info};

// --- GET /ps/renderbatch?cmUID=..&filenames=a.png,b.png ---
// Sends the listed temp images to every connected editor as one batch
pub async fn render_batch(
    State(bridge): State<SharedBridge>,
    Query(query): Query<RenderBatchQuery>,
) -> Result<Json<BatchAck>, ApiError> {
    let filenames = query.filename_list();
    info!(cm_uid = %query.cm_uid, ?filenames, "Render batch request");
    deliver(&bridge, filenames, query.cm_uid).await
}

// --- POST /ps/render_complete ---
// Called by the pipeline once a render has written its images
pub async fn render_complete(
    State(bridge): State<SharedBridge>,
    Json(payload): Json<RenderCompleteRequest>,
) -> Result<Json<BatchAck>, ApiError> {
    let filenames = payload
        .filenames
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>();
    info!(cm_uid = %payload.cm_uid, ?filenames, "Render complete notification");
    deliver(&bridge, filenames, payload.cm_uid).await
}

async fn deliver(
    bridge: &SharedBridge,
    filenames: Vec<String>,
    cm_uid: String,
) -> Result<Json<BatchAck>, ApiError> {
    if filenames.is_empty() {
        return Err(ApiError::BadRequest("No filenames provided".to_string()));
    }

    let delivery = bridge.deliver_batch(&filenames, &cm_uid).await.map_err(|e| {
        error!(cm_uid = %cm_uid, error = %e, "Critical error while sending batch");
        ApiError::InternalServerError(format!("Error: {}", e))
    })?;

    Ok(Json(BatchAck::from(delivery)))
}

// --- POST /ps/mask ---
// Rebuilds a full-size mask from the editor's crop and stores it
pub async fn save_mask(
    State(bridge): State<SharedBridge>,
    Json(payload): Json<MaskSaveRequest>,
) -> Result<Json<SavedFileResponse>, ApiError> {
    let source = if payload.mask == NO_MASK {
        MaskSource::NoMask
    } else {
        MaskSource::Encoded(decode_base64_payload(&payload.mask)?)
    };
    debug!(
        filename = %payload.filename,
        no_mask = matches!(source, MaskSource::NoMask),
        "Mask save request: {}x{}",
        payload.width,
        payload.height
    );

    let path = bridge
        .save_mask(MaskRequest {
            source,
            target_width: payload.width,
            target_height: payload.height,
            bounds: payload.bounds,
            filename: payload.filename.clone(),
        })
        .await?;

    let bytes = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
    Ok(Json(SavedFileResponse {
        filename: payload.filename,
        bytes,
    }))
}

// --- PUT /ps/inputs/{filename} ---
// Stores an image from the editor verbatim for the pipeline to read
pub async fn upload_input(
    State(bridge): State<SharedBridge>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Json<SavedFileResponse>, ApiError> {
    let (data, content_type) = extract_upload(request).await?;
    debug!(filename = %filename, ?content_type, "Upload of {} bytes", data.len());

    let declared = content_type
        .as_deref()
        .and_then(image_format_from_content_type);
    let bytes = data.len() as u64;
    bridge.save_input(&filename, data, declared).await?;
    Ok(Json(SavedFileResponse { filename, bytes }))
}

// --- GET /ps/inputs/{filename} ---
pub async fn get_input(
    State(bridge): State<SharedBridge>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    serve_contained(&bridge.dirs().inputs, &filename).await
}

// --- GET /ps/workflows/{*name} ---
pub async fn get_workflow(
    State(bridge): State<SharedBridge>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    serve_contained(&bridge.dirs().workflows, &format!("{}.json", name)).await
}

// --- GET /ps/icons/{filename} ---
// Only SVG icons are served
pub async fn get_icon(
    State(bridge): State<SharedBridge>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if !filename.ends_with(".svg") {
        return Err(ApiError::NotFound(format!("Icon not found: {}", filename)));
    }
    serve_contained(&bridge.dirs().icons, &filename).await
}

// --- GET /ps/error.png ---
// Placeholder the editor shows when an input image is missing
pub async fn get_error_image(State(bridge): State<SharedBridge>) -> Result<Response, ApiError> {
    let placeholder = &bridge.dirs().placeholder_image;
    let (root, name) = match (placeholder.parent(), placeholder.file_name()) {
        (Some(root), Some(name)) => (root, name.to_string_lossy()),
        _ => {
            return Err(ApiError::NotFound(
                "No placeholder image configured".to_string(),
            ));
        }
    };
    serve_contained(root, &name).await
}

// --- GET /ps/health ---
pub async fn health(State(bridge): State<SharedBridge>) -> Json<HealthResponse> {
    let registry = bridge.registry();
    Json(HealthResponse {
        status: "ok",
        sessions: SessionCounts {
            editor: registry.count_with_role(SessionRole::Editor).await,
            pipeline: registry.count_with_role(SessionRole::Pipeline).await,
        },
    })
}
