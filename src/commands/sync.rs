use crate::{
    core::{errors::AppResult, types::SyncReport},
    providers::graph::GraphClient,
    security::keyring,
    sync::m365,
    AppState,
};

pub async fn sync_m365(state: &AppState) -> AppResult<SyncReport> {
    let secret = keyring::get_graph_client_secret()?;
    let client = GraphClient::new(state.config.graph.clone(), secret)?;
    m365::run_sync(&state.db, &client).await
}
