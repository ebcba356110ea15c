use crate::{core::errors::AppResult, security::keyring};

pub async fn set_graph_secret(secret: &str) -> AppResult<()> {
    keyring::set_graph_client_secret(secret)?;
    tracing::info!("graph client secret stored");
    Ok(())
}
