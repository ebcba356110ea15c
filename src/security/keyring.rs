use crate::core::errors::{AppError, AppResult};

const SERVICE: &str = "helpdesk";
const GRAPH_SECRET_USER: &str = "graph-client-secret";
pub const GRAPH_SECRET_ENV: &str = "HELPDESK_GRAPH_CLIENT_SECRET";

fn graph_entry() -> AppResult<keyring::Entry> {
    keyring::Entry::new(SERVICE, GRAPH_SECRET_USER).map_err(|err| AppError::Internal(err.to_string()))
}

pub fn set_graph_client_secret(secret: &str) -> AppResult<()> {
    if secret.trim().is_empty() {
        return Err(AppError::InvalidInput("client secret cannot be empty".to_string()));
    }
    graph_entry()?
        .set_password(secret.trim())
        .map_err(|err| AppError::Internal(err.to_string()))
}

/// The environment variable takes precedence over the keyring entry.
pub fn get_graph_client_secret() -> AppResult<String> {
    if let Some(secret) = std::env::var(GRAPH_SECRET_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
    {
        return Ok(secret);
    }
    graph_entry()?.get_password().map_err(|_err| AppError::GraphAuth)
}
