// Rebuilds a full-canvas selection mask from the crop an editor client sends
// back, and stores it where the generation pipeline picks up its inputs.

use image::{GrayImage, Luma, imageops};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::bounds::ImageBounds;
use super::codec::{decode_luma, encode_png_luma};
use crate::error::{BridgeError, BridgeResult, validate_filename};

pub const SELECTED: Luma<u8> = Luma([255]);
pub const UNSELECTED: Luma<u8> = Luma([0]);

// Largest canvas a mask may cover (one byte per pixel).
pub const MAX_MASK_PIXELS: u64 = 16_384 * 16_384;

/// What the client sent as the mask content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskSource {
    /// No selection: the whole canvas counts as selected.
    NoMask,
    /// An encoded crop covering `bounds` of the target canvas.
    Encoded(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct MaskRequest {
    pub source: MaskSource,
    pub target_width: u32,
    pub target_height: u32,
    /// Where the crop sits; ignored for `MaskSource::NoMask`.
    pub bounds: Option<ImageBounds>,
    pub filename: String,
}

/// Produces the `target_width x target_height` single-channel mask.
pub fn compose_mask(request: &MaskRequest) -> BridgeResult<GrayImage> {
    if request.target_width == 0 || request.target_height == 0 {
        return Err(BridgeError::InvalidMask(format!(
            "target size must be positive, got {}x{}",
            request.target_width, request.target_height
        )));
    }
    let pixels = u64::from(request.target_width) * u64::from(request.target_height);
    if pixels > MAX_MASK_PIXELS {
        return Err(BridgeError::InvalidMask(format!(
            "target size {}x{} exceeds the {} pixel limit",
            request.target_width, request.target_height, MAX_MASK_PIXELS
        )));
    }

    let data = match &request.source {
        MaskSource::NoMask => {
            return Ok(GrayImage::from_pixel(
                request.target_width,
                request.target_height,
                SELECTED,
            ));
        }
        MaskSource::Encoded(data) => data,
    };

    let bounds = request
        .bounds
        .ok_or_else(|| BridgeError::InvalidMask("bounds are required with a mask".to_string()))?;

    let crop = decode_luma(data)?;
    if crop.dimensions() != (bounds.width(), bounds.height()) {
        return Err(BridgeError::InvalidMask(format!(
            "crop is {}x{} but bounds describe {}x{}",
            crop.width(),
            crop.height(),
            bounds.width(),
            bounds.height()
        )));
    }

    let mut canvas = GrayImage::from_pixel(request.target_width, request.target_height, UNSELECTED);
    // Straight overwrite; anything past the canvas edge is clipped.
    imageops::replace(&mut canvas, &crop, i64::from(bounds.left), i64::from(bounds.top));
    Ok(canvas)
}

/// Composes the mask and writes it as PNG into `dir`, replacing any file of
/// the same name. Returns the written path.
pub async fn save_mask(request: MaskRequest, dir: &Path) -> BridgeResult<PathBuf> {
    let path = dir.join(validate_filename(&request.filename)?);

    let (png, width, height) = tokio::task::spawn_blocking(move || {
        let canvas = compose_mask(&request)?;
        let (width, height) = canvas.dimensions();
        encode_png_luma(&canvas).map(|png| (png, width, height))
    })
    .await??;

    debug!("Encoded {}x{} mask ({} bytes)", width, height, png.len());
    tokio::fs::write(&path, png).await?;
    info!(path = %path.display(), "Saved {}x{} mask", width, height);
    Ok(path)
}
