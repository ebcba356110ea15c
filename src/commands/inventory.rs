use serde::Serialize;

use crate::{
    core::errors::AppResult,
    csv_format::{self, CsvTable},
    db::repositories::inventory,
    AppState,
};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvImportResponse {
    pub imported: usize,
}

pub async fn export_csv(state: &AppState, table: CsvTable) -> AppResult<String> {
    match table {
        CsvTable::Servers => {
            let servers = inventory::list_servers(state.db.pool()).await?;
            Ok(csv_format::export_servers(&servers))
        }
        CsvTable::NetworkDevices => {
            let devices = inventory::list_network_devices(state.db.pool()).await?;
            Ok(csv_format::export_network_devices(&devices))
        }
    }
}

/// Validates every row before the first insert.
pub async fn import_csv(state: &AppState, table: CsvTable, text: &str) -> AppResult<CsvImportResponse> {
    let imported = match table {
        CsvTable::Servers => {
            let servers = csv_format::parse_servers(text)?;
            for server in &servers {
                inventory::insert_server(state.db.pool(), server).await?;
            }
            servers.len()
        }
        CsvTable::NetworkDevices => {
            let devices = csv_format::parse_network_devices(text)?;
            for device in &devices {
                inventory::insert_network_device(state.db.pool(), device).await?;
            }
            devices.len()
        }
    };
    tracing::info!(%table, imported, "csv import finished");
    Ok(CsvImportResponse { imported })
}
