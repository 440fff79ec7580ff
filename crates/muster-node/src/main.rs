//! Muster Node binary
//!
//! Verification and team management for a gaming community.

use muster_node::{MusterNode, NodeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "muster_node=info,muster_engine=info,muster_store=info,muster_roster=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Muster Node");

    let config = NodeConfig::from_env();

    let node = MusterNode::new(config).await?;
    node.run().await?;

    Ok(())
}
