//! Event bus node entry point
//!
//! Run with:
//! ```bash
//! cargo run -p hookbus-node
//! ```
//!
//! Configuration is loaded from environment variables.

use hookbus_common::{try_init_tracing_with_config, AppConfig, AppError, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, code = e.error_code(), "Node failed");
        std::process::exit(e.exit_code());
    }
}

async fn run() -> Result<(), AppError> {
    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;

    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        transport = ?config.bus.transport,
        "Configuration loaded"
    );

    hookbus_node::run(config).await
}
