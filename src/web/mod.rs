// Web server module
// Handles the HTTP API endpoints and the WebSocket sessions of editor clients

mod app;
pub mod error;
mod extract_request_data;
mod files;
mod handlers;
mod listeners;
pub mod models;
mod ws;

pub use app::create_app;
pub use listeners::create_listener;

pub use crate::bridge::SharedBridge;

// Maximum allowed size for uploads and mask requests
pub const MAX_UPLOAD_SIZE_BYTES: usize = 100 * 1024 * 1024; // 100MB
