use sqlx::{Row, SqlitePool};

use crate::core::{
    errors::AppResult,
    types::{NetworkDeviceRecord, ServerRecord},
};

pub async fn insert_server(pool: &SqlitePool, server: &ServerRecord) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO servers (id, name, server_type, ip_address, specs, source)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&server.id)
    .bind(&server.name)
    .bind(&server.server_type)
    .bind(&server.ip_address)
    .bind(&server.specs)
    .bind(&server.source)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_servers(pool: &SqlitePool) -> AppResult<Vec<ServerRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, server_type, ip_address, specs, source
        FROM servers
        ORDER BY created_at ASC, name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(ServerRecord {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                server_type: row.try_get("server_type")?,
                ip_address: row.try_get("ip_address")?,
                specs: row.try_get("specs")?,
                source: row.try_get("source")?,
            })
        })
        .collect()
}

pub async fn delete_server(pool: &SqlitePool, id: &str) -> AppResult<bool> {
    let affected = sqlx::query("DELETE FROM servers WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

pub async fn insert_network_device(pool: &SqlitePool, device: &NetworkDeviceRecord) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO network_devices (id, name, device_type, ip_address, source)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&device.id)
    .bind(&device.name)
    .bind(&device.device_type)
    .bind(&device.ip_address)
    .bind(&device.source)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_network_devices(pool: &SqlitePool) -> AppResult<Vec<NetworkDeviceRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, device_type, ip_address, source
        FROM network_devices
        ORDER BY created_at ASC, name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(NetworkDeviceRecord {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                device_type: row.try_get("device_type")?,
                ip_address: row.try_get("ip_address")?,
                source: row.try_get("source")?,
            })
        })
        .collect()
}

pub async fn delete_network_device(pool: &SqlitePool, id: &str) -> AppResult<bool> {
    let affected = sqlx::query("DELETE FROM network_devices WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected > 0)
}
