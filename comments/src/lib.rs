pub mod api;
pub mod config;
pub mod errors;
pub mod graphql;
pub mod metrics_defs;
pub mod relay;
pub mod store;

#[cfg(test)]
mod testutils;

use crate::config::{Config, ValidationError};
use crate::relay::CommentRelay;
use crate::store::StoreClient;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum RelayServiceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),
}

/// Builds the relay from `config` and serves it until a listener fails.
pub async fn run(config: Config) -> Result<(), RelayServiceError> {
    config.validate()?;

    let client = StoreClient::new(&config.store)?;
    tracing::info!(endpoint = %client.endpoint(), publication = ?config.publication, "using store");

    let relay = CommentRelay::new(Arc::new(client), config.publication.into());
    let api_task = async {
        api::serve(&config.listener, api::router(relay)).await?;
        Ok::<(), RelayServiceError>(())
    };

    match &config.admin_listener {
        Some(admin) => {
            let admin_task = run_http_service(
                &admin.host,
                admin.port,
                AdminService::<_, RelayServiceError>::new(|| true),
            );
            tokio::try_join!(api_task, admin_task)?;
        }
        None => api_task.await?,
    }

    Ok(())
}
