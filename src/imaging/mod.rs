// Pixel-level work: content bounds of generated images, selection masks, and
// the thin codec layer both rely on.

pub mod bounds;
pub mod codec;
pub mod mask;

pub use bounds::{ImageBounds, extract_bounds};
pub use mask::{MaskRequest, MaskSource, compose_mask, save_mask};
