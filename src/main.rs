// Main entry point for psbridge-server.
// Parses the configuration, prepares the shared directories, builds the Axum
// router around the bridge service, and serves until a shutdown signal.

use clap::Parser;
use psbridge_server::{AppConfig, BridgeService, shutdown_signal::shutdown_signal, web};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Parse command line args and environment variables
    let config = AppConfig::parse();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(true) // Include module path in logs
        .with_file(true) // Include source file name
        .with_line_number(true) // Include line numbers
        .init();

    tracing::info!("Starting psbridge-server...");

    let dirs = config.bridge_dirs();
    if let Err(e) = dirs.ensure_writable_dirs().await {
        tracing::error!("FATAL: Failed to create directories {:?}: {}", dirs, e);
        eprintln!("FATAL: Could not prepare directories. Error: {}. Exiting.", e);
        std::process::exit(1);
    }
    tracing::info!(
        "Temp directory: {}, inputs directory: {}",
        dirs.temp.display(),
        dirs.inputs.display()
    );

    let bridge = Arc::new(BridgeService::new(
        dirs,
        config.read_timeout(),
        config.send_timeout(),
        config.session_queue,
    ));

    let app = web::create_app(bridge.clone());
    tracing::info!("Axum router configured.");

    // --- Start HTTP Server ---
    let listener = match web::create_listener(&config.host, config.port).await {
        Ok((addr, l)) => {
            tracing::info!("Server successfully bound. Listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("FATAL: Failed to bind server: {}", e);
            eprintln!("FATAL: Could not bind server. Error: {}. Exiting.", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server run error: {}", e);
        eprintln!("ERROR: Server shut down unexpectedly. Error: {}", e);
    }

    tracing::info!(
        "psbridge-server has shut down ({} session(s) were still registered).",
        bridge.registry().len().await
    );
}
