//! Microsoft 365 sync: devices, then users, then licenses.
//!
//! One token for the whole run. Inside a phase each record is handled on
//! its own; a failing record or a failing fetch is written to the report and
//! the job moves on.

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    core::{
        errors::AppResult,
        types::{PhaseSummary, SyncReport},
    },
    db::{repositories::m365, Database},
    providers::graph::{DirectoryUser, ManagedDevice, SubscribedSku},
};

#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn authenticate(&self) -> AppResult<String>;
    async fn managed_devices(&self, token: &str) -> AppResult<Vec<ManagedDevice>>;
    async fn users(&self, token: &str) -> AppResult<Vec<DirectoryUser>>;
    async fn subscribed_skus(&self, token: &str) -> AppResult<Vec<SubscribedSku>>;
}

pub async fn run_sync<S: DirectorySource + ?Sized>(db: &Database, source: &S) -> AppResult<SyncReport> {
    let mut report = SyncReport {
        started_at: Some(Utc::now()),
        ..SyncReport::default()
    };
    let token = source.authenticate().await?;
    tracing::info!("graph token acquired, starting sync");

    match source.managed_devices(&token).await {
        Ok(devices) => sync_devices(db, &devices, &mut report).await,
        Err(err) => report.errors.push(format!("devices: fetch failed: {err}")),
    }
    match source.users(&token).await {
        Ok(users) => sync_users(db, &users, &mut report).await,
        Err(err) => report.errors.push(format!("users: fetch failed: {err}")),
    }
    match source.subscribed_skus(&token).await {
        Ok(skus) => sync_licenses(db, &skus, &mut report).await,
        Err(err) => report.errors.push(format!("licenses: fetch failed: {err}")),
    }

    report.finished_at = Some(Utc::now());
    tracing::info!(
        devices = ?report.devices,
        users = ?report.users,
        licenses = ?report.licenses,
        errors = report.errors.len(),
        "sync finished"
    );
    Ok(report)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn record_failure(summary: &mut PhaseSummary, errors: &mut Vec<String>, message: String) {
    tracing::warn!("{message}");
    summary.failed += 1;
    errors.push(message);
}

async fn sync_devices(db: &Database, devices: &[ManagedDevice], report: &mut SyncReport) {
    report.devices.fetched = devices.len();
    for device in devices {
        let Some(serial) = non_empty(device.serial_number.as_deref()) else {
            record_failure(
                &mut report.devices,
                &mut report.errors,
                format!("device {}: missing serial number", device.id),
            );
            continue;
        };
        match m365::upsert_device(db.pool(), serial, device).await {
            Ok(outcome) => report.devices.record(outcome),
            Err(err) => record_failure(
                &mut report.devices,
                &mut report.errors,
                format!("device {serial}: {err}"),
            ),
        }
    }
}

async fn sync_users(db: &Database, users: &[DirectoryUser], report: &mut SyncReport) {
    report.users.fetched = users.len();
    for user in users {
        let Some(azure_ad_id) = non_empty(Some(user.id.as_str())) else {
            record_failure(
                &mut report.users,
                &mut report.errors,
                "user: missing object id".to_string(),
            );
            continue;
        };
        match m365::upsert_user(db.pool(), azure_ad_id, user).await {
            Ok(outcome) => report.users.record(outcome),
            Err(err) => record_failure(
                &mut report.users,
                &mut report.errors,
                format!("user {azure_ad_id}: {err}"),
            ),
        }
    }
}

async fn sync_licenses(db: &Database, skus: &[SubscribedSku], report: &mut SyncReport) {
    report.licenses.fetched = skus.len();
    for sku in skus {
        if non_empty(Some(sku.sku_id.as_str())).is_none() {
            record_failure(
                &mut report.licenses,
                &mut report.errors,
                "license: missing sku id".to_string(),
            );
            continue;
        }
        match m365::upsert_license(db.pool(), sku).await {
            Ok(outcome) => report.licenses.record(outcome),
            Err(err) => record_failure(
                &mut report.licenses,
                &mut report.errors,
                format!("license {}: {err}", sku.sku_id),
            ),
        }
    }
}
