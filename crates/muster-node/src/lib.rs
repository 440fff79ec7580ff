//! Muster Node - community verification and team management service
//!
//! Hosts the [`muster_engine::Engine`] behind a single command worker and
//! exposes it to operators over a Unix admin socket.
//!
//! # Architecture
//!
//! - **Node**: configuration, store loading and quarantine, shutdown
//! - **Worker**: the one task allowed to touch the engine
//! - **Admin Socket**: JSON-lines commands (muster-admin CLI)
//!
//! # Example
//!
//! ```no_run
//! use muster_node::{MusterNode, NodeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::default();
//!     let node = MusterNode::new(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin_socket;
pub mod error;
pub mod node;
pub mod worker;

pub use admin_socket::{AdminSocket, Command, Response};
pub use error::{Error, Result};
pub use node::{open_engine, MusterNode, NodeConfig};
pub use worker::WorkerHandle;
