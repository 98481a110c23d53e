use super::{MAX_UPLOAD_SIZE_BYTES, SharedBridge, handlers, ws};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::Level;

pub fn create_app(bridge: SharedBridge) -> Router {
    Router::new()
        // Delivery of generated images to the editor
        .route("/ps/renderbatch", get(handlers::render_batch))
        .route("/ps/render_complete", post(handlers::render_complete))
        // Editor sessions
        .route("/ps/ws", get(ws::session_socket))
        // Data coming back from the editor
        .route("/ps/mask", post(handlers::save_mask))
        .route(
            "/ps/inputs/{filename}",
            get(handlers::get_input).put(handlers::upload_input),
        )
        // Static files
        .route("/ps/workflows/{*name}", get(handlers::get_workflow))
        .route("/ps/icons/{filename}", get(handlers::get_icon))
        .route("/ps/error.png", get(handlers::get_error_image))
        .route("/ps/health", get(handlers::health))
        // Apply a layer to limit the maximum size of request bodies
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE_BYTES))
        // Add CORS layer so the editor's panel can call the API
        .layer(CorsLayer::permissive())
        // Turn handler panics into 500 responses instead of dropped connections
        .layer(CatchPanicLayer::new())
        // Add tracing for HTTP requests and responses
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::INFO)))
        // Provide the shared state
        .with_state(bridge)
}
