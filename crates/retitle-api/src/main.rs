//! `retitle-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use anyhow::Result;

use retitle_api::config::{Config, StoreBackend};
use retitle_api::server::Server;
use retitle_core::observability::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    config.validate()?;

    init_logging(config.log_format);

    if config.store.backend == StoreBackend::Memory {
        tracing::warn!("RETITLE_STORE_BACKEND=memory; job records are lost on restart");
    }

    let server = Server::new(config);
    server.serve().await?;
    Ok(())
}
