use image::{DynamicImage, GrayImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};

// Maps a Content-Type (parameters ignored) onto the codec's format hint.
pub fn image_format_from_content_type(content_type: &str) -> Option<ImageFormat> {
    let media_type = content_type[0..content_type.find(';').unwrap_or(content_type.len())].trim();
    match media_type {
        "image/jpeg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        "image/webp" => Some(ImageFormat::WebP),
        _ => None,
    }
}

// Decodes an encoded image, using the hint when one is known and sniffing the
// magic bytes otherwise.
pub fn decode_image(data: &[u8], format_hint: Option<ImageFormat>) -> BridgeResult<DynamicImage> {
    match format_hint {
        Some(format) => image::load_from_memory_with_format(data, format).map_err(|e| {
            BridgeError::Decode(format!("format {:?}: {}", format, e))
        }),
        None => image::load_from_memory(data)
            .map_err(|e| BridgeError::Decode(format!("auto-detect: {}", e))),
    }
}

/// Decodes any supported format into 8-bit RGBA, whatever channels it had.
pub fn decode_rgba(data: &[u8]) -> BridgeResult<RgbaImage> {
    let image = decode_image(data, None)?;
    debug!(
        "Decoded {}x{} image with color type {:?}",
        image.width(),
        image.height(),
        image.color()
    );
    Ok(image.into_rgba8())
}

/// Decodes a mask into a single luminance channel.
pub fn decode_luma(data: &[u8]) -> BridgeResult<GrayImage> {
    Ok(decode_image(data, None)?.into_luma8())
}

// Checks that the bytes look like an image this service can read back later.
pub fn sniff_format(data: &[u8]) -> BridgeResult<ImageFormat> {
    let format = image::guess_format(data)
        .map_err(|e| BridgeError::Decode(format!("unrecognized image data: {}", e)))?;
    match format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP => Ok(format),
        other => Err(BridgeError::Decode(format!(
            "unsupported image format {:?}",
            other
        ))),
    }
}

/// Encodes a single-channel canvas as PNG.
pub fn encode_png_luma(canvas: &GrayImage) -> BridgeResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    canvas
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| BridgeError::Encode(format!("PNG encoding failed: {}", e)))?;
    Ok(buffer.into_inner())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use image::Luma;

    #[test]
    fn test_content_type_hint_ignores_parameters() {
        assert_eq!(
            image_format_from_content_type("image/png; charset=binary"),
            Some(ImageFormat::Png)
        );
        assert_eq!(image_format_from_content_type("image/jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(image_format_from_content_type("text/plain"), None);
    }

    #[test]
    fn test_decode_rgba_converts_channels() {
        let png = gradient_luma_png(4, 3);
        let rgba = decode_rgba(&png).unwrap();
        assert_eq!(rgba.dimensions(), (4, 3));
        assert_eq!(rgba.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_decode_garbage_is_a_decode_error() {
        assert!(matches!(
            decode_rgba(b"definitely not an image"),
            Err(BridgeError::Decode(_))
        ));
        assert!(matches!(
            decode_image(b"\x89PNG broken", Some(ImageFormat::Png)),
            Err(BridgeError::Decode(_))
        ));
    }

    #[test]
    fn test_luma_png_survives_encoding() {
        let canvas = GrayImage::from_pixel(3, 2, Luma([77]));
        let bytes = encode_png_luma(&canvas).unwrap();
        assert_eq!(sniff_format(&bytes).unwrap(), ImageFormat::Png);
        assert_eq!(decode_luma(&bytes).unwrap(), canvas);
    }

    #[test]
    fn test_sniff_rejects_non_images() {
        assert!(sniff_format(b"GIF89a....").is_err());
        assert!(sniff_format(b"hello").is_err());
    }
}
