use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use taskd::api::{self, AppState};
use taskd::store::{MemoryTaskStore, MemoryUserStore};
use taskd::{Config, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;

    let router = api::app(AppState {
        tasks: Arc::new(MemoryTaskStore::new()),
        users: Arc::new(MemoryUserStore::new()),
        authenticator: Arc::new(config.preshared_keys()),
    });

    Server::bind(&config.addr)
        .grace(config.grace())
        .serve(router)
        .await?;

    Ok(())
}
