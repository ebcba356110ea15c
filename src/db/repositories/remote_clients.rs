use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::{
    admin::RemoteClientRegistration,
    core::{
        errors::{AppError, AppResult},
        types::RemoteClient,
    },
    db::parse_timestamp,
};

/// Token-keyed upsert: a known token refreshes its row and `last_seen_at`.
pub async fn register(pool: &SqlitePool, registration: &RemoteClientRegistration) -> AppResult<RemoteClient> {
    sqlx::query(
        r#"
        INSERT INTO remote_clients (id, token, hostname, os, ip_address, agent_version)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(token) DO UPDATE SET
          hostname = excluded.hostname,
          os = excluded.os,
          ip_address = excluded.ip_address,
          agent_version = excluded.agent_version,
          last_seen_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(registration.token.trim())
    .bind(registration.hostname.trim())
    .bind(&registration.os)
    .bind(&registration.ip_address)
    .bind(&registration.agent_version)
    .execute(pool)
    .await?;

    get_by_token(pool, registration.token.trim()).await
}

pub async fn heartbeat(pool: &SqlitePool, token: &str) -> AppResult<RemoteClient> {
    let affected = sqlx::query(
        r#"
        UPDATE remote_clients
        SET last_seen_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE token = ?1
        "#,
    )
    .bind(token)
    .execute(pool)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(AppError::NotFound("remote client for token".to_string()));
    }
    get_by_token(pool, token).await
}

pub async fn get_by_token(pool: &SqlitePool, token: &str) -> AppResult<RemoteClient> {
    let row = sqlx::query(
        r#"
        SELECT id, token, hostname, os, ip_address, agent_version, registered_at, last_seen_at
        FROM remote_clients
        WHERE token = ?1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("remote client for token".to_string()))?;

    map_client(row)
}

pub async fn list_clients(pool: &SqlitePool) -> AppResult<Vec<RemoteClient>> {
    let rows = sqlx::query(
        r#"
        SELECT id, token, hostname, os, ip_address, agent_version, registered_at, last_seen_at
        FROM remote_clients
        ORDER BY last_seen_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_client).collect()
}

fn map_client(row: sqlx::sqlite::SqliteRow) -> AppResult<RemoteClient> {
    let registered_at: String = row.try_get("registered_at")?;
    let last_seen_at: String = row.try_get("last_seen_at")?;
    Ok(RemoteClient {
        id: row.try_get("id")?,
        token: row.try_get("token")?,
        hostname: row.try_get("hostname")?,
        os: row.try_get("os")?,
        ip_address: row.try_get("ip_address")?,
        agent_version: row.try_get("agent_version")?,
        registered_at: parse_timestamp(registered_at)?,
        last_seen_at: parse_timestamp(last_seen_at)?,
    })
}
