use crate::{
    admin::RemoteClientRegistration,
    core::{
        errors::{AppError, AppResult},
        types::RemoteClient,
    },
    db::repositories::remote_clients,
    AppState,
};

pub async fn register_client(state: &AppState, registration: RemoteClientRegistration) -> AppResult<RemoteClient> {
    registration.validate()?;
    let client = remote_clients::register(state.db.pool(), &registration).await?;
    tracing::info!(hostname = %client.hostname, "remote client registered");
    Ok(client)
}

pub async fn heartbeat(state: &AppState, token: &str) -> AppResult<RemoteClient> {
    if token.trim().is_empty() {
        return Err(AppError::InvalidInput("client token cannot be empty".to_string()));
    }
    remote_clients::heartbeat(state.db.pool(), token.trim()).await
}

pub async fn list_clients(state: &AppState) -> AppResult<Vec<RemoteClient>> {
    remote_clients::list_clients(state.db.pool()).await
}
