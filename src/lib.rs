// psbridge-server: delivers generated images to connected image-editor
// sessions together with their placement bounds, and turns the editor's
// cropped selection masks back into full-size masks for the pipeline.

pub mod batch;
pub mod bridge;
pub mod config;
pub mod error;
pub mod imaging;
pub mod session;
pub mod shutdown_signal;
pub mod web;

pub use bridge::{BridgeService, SharedBridge};
pub use config::{AppConfig, BridgeDirs};
pub use error::{BridgeError, BridgeResult};
