//! # hookbus-node
//!
//! Composition root: one [`Node`] per process owns the event bus, its
//! transport, the relay loop and the built-in subscribers.

pub mod node;
pub mod subscribers;

pub use node::Node;
pub use subscribers::{delete_user_cache, ItemCounters, UserCache};

use hookbus_common::{AppConfig, AppResult};

/// Run a node until Ctrl-C
pub async fn run(config: AppConfig) -> AppResult<()> {
    let node = Node::build(&config).await?;
    node.start().await?;

    tracing::info!(name = %config.app.name, "Node running, press Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");

    node.shutdown().await
}
