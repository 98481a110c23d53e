// Locates the non-transparent content of a generated image so the editor
// can place it inside its canvas.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates, right/bottom exclusive.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl ImageBounds {
    /// The whole `width x height` canvas.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

/// Tightest rectangle covering every pixel with a nonzero alpha.
///
/// A fully transparent image yields the full canvas rather than an empty
/// rectangle; callers treat that as a normal result.
pub fn extract_bounds(image: &RgbaImage) -> ImageBounds {
    let (width, height) = image.dimensions();

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        found = true;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    if !found {
        return ImageBounds::full(width, height);
    }

    ImageBounds {
        left: min_x,
        top: min_y,
        right: max_x + 1,
        bottom: max_y + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn filled(width: u32, height: u32, alpha: u8) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, alpha]))
    }

    #[test]
    fn test_opaque_image_covers_full_canvas() {
        assert_eq!(extract_bounds(&filled(7, 5, 255)), ImageBounds::full(7, 5));
    }

    #[test]
    fn test_transparent_image_falls_back_to_full_canvas() {
        assert_eq!(extract_bounds(&filled(7, 5, 0)), ImageBounds::full(7, 5));
    }

    #[test]
    fn test_single_pixel_is_minimal() {
        for (x, y) in [(0, 0), (3, 2), (6, 4)] {
            let mut image = filled(7, 5, 0);
            image.put_pixel(x, y, Rgba([0, 0, 0, 1]));

            let bounds = extract_bounds(&image);
            assert!(bounds.contains(x, y));
            assert_eq!((bounds.width(), bounds.height()), (1, 1));
        }
    }

    #[test]
    fn test_partial_alpha_region() {
        let mut image = filled(10, 8, 0);
        for y in 2..6 {
            for x in 3..9 {
                image.put_pixel(x, y, Rgba([255, 255, 255, 128]));
            }
        }

        assert_eq!(
            extract_bounds(&image),
            ImageBounds {
                left: 3,
                top: 2,
                right: 9,
                bottom: 6,
            }
        );
    }

    #[test]
    fn test_bounds_serialize_with_edge_names() {
        let json = serde_json::to_value(ImageBounds::full(4, 3)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"left": 0, "top": 0, "right": 4, "bottom": 3})
        );
    }
}
