//! Microsoft 365 mirror tables.
//!
//! Every upsert reads `deleted_manually` before writing, and the write
//! itself is guarded on the same flag: a row someone removed by hand stays
//! removed until the flag is cleared.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::{
    core::{
        errors::{AppError, AppResult},
        types::{SyncedDevice, SyncedLicense, SyncedUser, UpsertOutcome},
    },
    db::parse_timestamp,
    providers::graph::{DirectoryUser, ManagedDevice, SubscribedSku},
};

pub const LICENSE_VENDOR: &str = "Microsoft";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncedTable {
    Devices,
    Users,
    Licenses,
}

impl SyncedTable {
    fn table(&self) -> &'static str {
        match self {
            Self::Devices => "m365_devices",
            Self::Users => "m365_users",
            Self::Licenses => "licenses",
        }
    }
}

fn outcome(existing: Option<i64>, affected: u64) -> UpsertOutcome {
    match (existing, affected) {
        (_, 0) => UpsertOutcome::SkippedDeleted,
        (Some(_), _) => UpsertOutcome::Updated,
        (None, _) => UpsertOutcome::Inserted,
    }
}

pub async fn upsert_device(
    pool: &SqlitePool,
    serial_number: &str,
    device: &ManagedDevice,
) -> AppResult<UpsertOutcome> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT deleted_manually FROM m365_devices WHERE serial_number = ?1")
            .bind(serial_number)
            .fetch_optional(pool)
            .await?;
    if existing.unwrap_or(0) != 0 {
        return Ok(UpsertOutcome::SkippedDeleted);
    }

    let device_name = device
        .device_name
        .clone()
        .unwrap_or_else(|| serial_number.to_string());
    let affected = sqlx::query(
        r#"
        INSERT INTO m365_devices (
          id, serial_number, graph_id, device_name, operating_system, os_version,
          model, manufacturer, user_principal_name, last_sync_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(serial_number) DO UPDATE SET
          graph_id = excluded.graph_id,
          device_name = excluded.device_name,
          operating_system = excluded.operating_system,
          os_version = excluded.os_version,
          model = excluded.model,
          manufacturer = excluded.manufacturer,
          user_principal_name = excluded.user_principal_name,
          last_sync_at = excluded.last_sync_at,
          synced_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE m365_devices.deleted_manually = 0
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(serial_number)
    .bind(&device.id)
    .bind(device_name)
    .bind(&device.operating_system)
    .bind(&device.os_version)
    .bind(&device.model)
    .bind(&device.manufacturer)
    .bind(&device.user_principal_name)
    .bind(&device.last_sync_date_time)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(outcome(existing, affected))
}

pub async fn upsert_user(
    pool: &SqlitePool,
    azure_ad_id: &str,
    user: &DirectoryUser,
) -> AppResult<UpsertOutcome> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT deleted_manually FROM m365_users WHERE azure_ad_id = ?1")
            .bind(azure_ad_id)
            .fetch_optional(pool)
            .await?;
    if existing.unwrap_or(0) != 0 {
        return Ok(UpsertOutcome::SkippedDeleted);
    }

    let display_name = user
        .display_name
        .clone()
        .or_else(|| user.user_principal_name.clone())
        .unwrap_or_else(|| azure_ad_id.to_string());
    let affected = sqlx::query(
        r#"
        INSERT INTO m365_users (
          id, azure_ad_id, display_name, user_principal_name, mail, job_title, department, account_enabled
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(azure_ad_id) DO UPDATE SET
          display_name = excluded.display_name,
          user_principal_name = excluded.user_principal_name,
          mail = excluded.mail,
          job_title = excluded.job_title,
          department = excluded.department,
          account_enabled = excluded.account_enabled,
          synced_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE m365_users.deleted_manually = 0
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(azure_ad_id)
    .bind(display_name)
    .bind(&user.user_principal_name)
    .bind(&user.mail)
    .bind(&user.job_title)
    .bind(&user.department)
    .bind(user.account_enabled.unwrap_or(true))
    .execute(pool)
    .await?
    .rows_affected();

    Ok(outcome(existing, affected))
}

pub async fn upsert_license(pool: &SqlitePool, sku: &SubscribedSku) -> AppResult<UpsertOutcome> {
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT deleted_manually FROM licenses WHERE sku_id = ?1 AND vendor = ?2",
    )
    .bind(&sku.sku_id)
    .bind(LICENSE_VENDOR)
    .fetch_optional(pool)
    .await?;
    if existing.unwrap_or(0) != 0 {
        return Ok(UpsertOutcome::SkippedDeleted);
    }

    let part_number = sku
        .sku_part_number
        .clone()
        .unwrap_or_else(|| sku.sku_id.clone());
    let total_units = sku
        .prepaid_units
        .as_ref()
        .and_then(|units| units.enabled)
        .unwrap_or(0);
    let affected = sqlx::query(
        r#"
        INSERT INTO licenses (id, sku_id, vendor, sku_part_number, total_units, consumed_units)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(sku_id, vendor) DO UPDATE SET
          sku_part_number = excluded.sku_part_number,
          total_units = excluded.total_units,
          consumed_units = excluded.consumed_units,
          synced_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE licenses.deleted_manually = 0
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&sku.sku_id)
    .bind(LICENSE_VENDOR)
    .bind(part_number)
    .bind(total_units)
    .bind(sku.consumed_units.unwrap_or(0))
    .execute(pool)
    .await?
    .rows_affected();

    Ok(outcome(existing, affected))
}

/// Flags (or un-flags) a mirrored row as removed by hand.
pub async fn set_deleted_manually(
    pool: &SqlitePool,
    table: SyncedTable,
    id: &str,
    deleted: bool,
) -> AppResult<()> {
    let sql = format!(
        "UPDATE {} SET deleted_manually = ?2 WHERE id = ?1",
        table.table()
    );
    let affected = sqlx::query(&sql)
        .bind(id)
        .bind(deleted)
        .execute(pool)
        .await?
        .rows_affected();
    if affected == 0 {
        return Err(AppError::NotFound(format!("{} row {id}", table.table())));
    }
    Ok(())
}

pub async fn list_devices(pool: &SqlitePool) -> AppResult<Vec<SyncedDevice>> {
    let rows = sqlx::query(
        r#"
        SELECT id, serial_number, device_name, operating_system, os_version, model,
               manufacturer, user_principal_name, deleted_manually, synced_at
        FROM m365_devices
        ORDER BY device_name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let synced_at: String = row.try_get("synced_at")?;
            Ok(SyncedDevice {
                id: row.try_get("id")?,
                serial_number: row.try_get("serial_number")?,
                device_name: row.try_get("device_name")?,
                operating_system: row.try_get("operating_system")?,
                os_version: row.try_get("os_version")?,
                model: row.try_get("model")?,
                manufacturer: row.try_get("manufacturer")?,
                user_principal_name: row.try_get("user_principal_name")?,
                deleted_manually: row.try_get("deleted_manually")?,
                synced_at: parse_timestamp(synced_at)?,
            })
        })
        .collect()
}

pub async fn list_users(pool: &SqlitePool) -> AppResult<Vec<SyncedUser>> {
    let rows = sqlx::query(
        r#"
        SELECT id, azure_ad_id, display_name, user_principal_name, mail, job_title,
               department, account_enabled, deleted_manually, synced_at
        FROM m365_users
        ORDER BY display_name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let synced_at: String = row.try_get("synced_at")?;
            Ok(SyncedUser {
                id: row.try_get("id")?,
                azure_ad_id: row.try_get("azure_ad_id")?,
                display_name: row.try_get("display_name")?,
                user_principal_name: row.try_get("user_principal_name")?,
                mail: row.try_get("mail")?,
                job_title: row.try_get("job_title")?,
                department: row.try_get("department")?,
                account_enabled: row.try_get("account_enabled")?,
                deleted_manually: row.try_get("deleted_manually")?,
                synced_at: parse_timestamp(synced_at)?,
            })
        })
        .collect()
}

pub async fn list_licenses(pool: &SqlitePool) -> AppResult<Vec<SyncedLicense>> {
    let rows = sqlx::query(
        r#"
        SELECT id, sku_id, vendor, sku_part_number, total_units, consumed_units,
               deleted_manually, synced_at
        FROM licenses
        ORDER BY sku_part_number ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let synced_at: String = row.try_get("synced_at")?;
            Ok(SyncedLicense {
                id: row.try_get("id")?,
                sku_id: row.try_get("sku_id")?,
                vendor: row.try_get("vendor")?,
                sku_part_number: row.try_get("sku_part_number")?,
                total_units: row.try_get("total_units")?,
                consumed_units: row.try_get("consumed_units")?,
                deleted_manually: row.try_get("deleted_manually")?,
                synced_at: parse_timestamp(synced_at)?,
            })
        })
        .collect()
}
