use async_trait::async_trait;
use helpdesk_lib::{
    core::errors::{AppError, AppResult},
    core::types::PhaseSummary,
    db::{
        repositories::m365::{self, SyncedTable},
        Database,
    },
    providers::graph::{DirectoryUser, ManagedDevice, PrepaidUnits, SubscribedSku},
    sync::m365::{run_sync, DirectorySource},
};

#[derive(Default)]
struct FakeDirectory {
    devices: Vec<ManagedDevice>,
    users: Vec<DirectoryUser>,
    skus: Vec<SubscribedSku>,
    fail_auth: bool,
    fail_users: bool,
}

#[async_trait]
impl DirectorySource for FakeDirectory {
    async fn authenticate(&self) -> AppResult<String> {
        if self.fail_auth {
            return Err(AppError::GraphAuth);
        }
        Ok("token-1".to_string())
    }

    async fn managed_devices(&self, token: &str) -> AppResult<Vec<ManagedDevice>> {
        assert_eq!(token, "token-1");
        Ok(self.devices.clone())
    }

    async fn users(&self, _token: &str) -> AppResult<Vec<DirectoryUser>> {
        if self.fail_users {
            return Err(AppError::GraphRateLimited);
        }
        Ok(self.users.clone())
    }

    async fn subscribed_skus(&self, _token: &str) -> AppResult<Vec<SubscribedSku>> {
        Ok(self.skus.clone())
    }
}

fn device(id: &str, serial: Option<&str>, name: &str) -> ManagedDevice {
    ManagedDevice {
        id: id.to_string(),
        device_name: Some(name.to_string()),
        serial_number: serial.map(str::to_string),
        operating_system: Some("Windows".to_string()),
        os_version: Some("10.0.22631".to_string()),
        model: Some("Latitude 7440".to_string()),
        manufacturer: Some("Dell".to_string()),
        user_principal_name: Some("amy@contoso.com".to_string()),
        last_sync_date_time: Some("2026-10-01T08:00:00Z".to_string()),
    }
}

fn user(id: &str, name: &str) -> DirectoryUser {
    DirectoryUser {
        id: id.to_string(),
        display_name: Some(name.to_string()),
        user_principal_name: Some(format!("{}@contoso.com", name.to_lowercase())),
        mail: None,
        job_title: None,
        department: Some("IT".to_string()),
        account_enabled: Some(true),
    }
}

fn sku(id: &str, part: &str) -> SubscribedSku {
    SubscribedSku {
        sku_id: id.to_string(),
        sku_part_number: Some(part.to_string()),
        consumed_units: Some(12),
        prepaid_units: Some(PrepaidUnits { enabled: Some(25) }),
    }
}

#[tokio::test]
async fn first_sync_inserts_every_phase() {
    let db = Database::in_memory().await.expect("db should initialize");
    let source = FakeDirectory {
        devices: vec![device("d1", Some("SN-001"), "LAPTOP-01"), device("d2", Some("SN-002"), "LAPTOP-02")],
        users: vec![user("u1", "Amy")],
        skus: vec![sku("sku-e3", "ENTERPRISEPACK")],
        ..FakeDirectory::default()
    };

    let report = run_sync(&db, &source).await.expect("sync should run");
    assert_eq!(
        report.devices,
        PhaseSummary {
            fetched: 2,
            inserted: 2,
            ..PhaseSummary::default()
        }
    );
    assert_eq!(report.users.inserted, 1);
    assert_eq!(report.licenses.inserted, 1);
    assert!(report.errors.is_empty());
    assert!(report.started_at.is_some() && report.finished_at.is_some());

    let licenses = m365::list_licenses(db.pool()).await.expect("list licenses");
    assert_eq!(licenses.len(), 1);
    assert_eq!(licenses[0].vendor, m365::LICENSE_VENDOR);
}

#[tokio::test]
async fn second_sync_updates_existing_rows() {
    let db = Database::in_memory().await.expect("db should initialize");
    let first = FakeDirectory {
        devices: vec![device("d1", Some("SN-001"), "LAPTOP-01")],
        ..FakeDirectory::default()
    };
    run_sync(&db, &first).await.expect("first sync");

    let second = FakeDirectory {
        devices: vec![device("d1", Some("SN-001"), "LAPTOP-RENAMED")],
        ..FakeDirectory::default()
    };
    let report = run_sync(&db, &second).await.expect("second sync");
    assert_eq!(report.devices.updated, 1);
    assert_eq!(report.devices.inserted, 0);

    let devices = m365::list_devices(db.pool()).await.expect("list devices");
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_name, "LAPTOP-RENAMED");
}

#[tokio::test]
async fn manually_deleted_device_is_left_alone() {
    let db = Database::in_memory().await.expect("db should initialize");
    let first = FakeDirectory {
        devices: vec![device("d1", Some("SN-001"), "LAPTOP-01")],
        ..FakeDirectory::default()
    };
    run_sync(&db, &first).await.expect("first sync");

    let stored = m365::list_devices(db.pool()).await.expect("list devices");
    m365::set_deleted_manually(db.pool(), SyncedTable::Devices, &stored[0].id, true)
        .await
        .expect("flag device");

    let second = FakeDirectory {
        devices: vec![device("d1", Some("SN-001"), "LAPTOP-RENAMED")],
        ..FakeDirectory::default()
    };
    let report = run_sync(&db, &second).await.expect("second sync");
    assert_eq!(report.devices.skipped_deleted, 1);
    assert_eq!(report.devices.updated, 0);

    let devices = m365::list_devices(db.pool()).await.expect("list devices");
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_name, "LAPTOP-01");
    assert!(devices[0].deleted_manually);
}

#[tokio::test]
async fn manually_deleted_user_is_left_alone() {
    let db = Database::in_memory().await.expect("db should initialize");
    let first = FakeDirectory {
        users: vec![user("u1", "Amy")],
        ..FakeDirectory::default()
    };
    run_sync(&db, &first).await.expect("first sync");

    let stored = m365::list_users(db.pool()).await.expect("list users");
    m365::set_deleted_manually(db.pool(), SyncedTable::Users, &stored[0].id, true)
        .await
        .expect("flag user");

    let mut renamed = user("u1", "Amy");
    renamed.display_name = Some("Amy Renamed".to_string());
    renamed.department = Some("Finance".to_string());
    let second = FakeDirectory {
        users: vec![renamed],
        ..FakeDirectory::default()
    };
    let report = run_sync(&db, &second).await.expect("second sync");
    assert_eq!(report.users.skipped_deleted, 1);
    assert_eq!(report.users.updated, 0);

    let users = m365::list_users(db.pool()).await.expect("list users");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].display_name, "Amy");
    assert_eq!(users[0].department.as_deref(), Some("IT"));
    assert!(users[0].deleted_manually);
}

#[tokio::test]
async fn manually_deleted_license_is_left_alone() {
    let db = Database::in_memory().await.expect("db should initialize");
    let first = FakeDirectory {
        skus: vec![sku("sku-e3", "ENTERPRISEPACK")],
        ..FakeDirectory::default()
    };
    run_sync(&db, &first).await.expect("first sync");

    let stored = m365::list_licenses(db.pool()).await.expect("list licenses");
    m365::set_deleted_manually(db.pool(), SyncedTable::Licenses, &stored[0].id, true)
        .await
        .expect("flag license");

    let mut grown = sku("sku-e3", "ENTERPRISEPACK");
    grown.consumed_units = Some(40);
    grown.prepaid_units = Some(PrepaidUnits { enabled: Some(50) });
    let second = FakeDirectory {
        skus: vec![grown],
        ..FakeDirectory::default()
    };
    let report = run_sync(&db, &second).await.expect("second sync");
    assert_eq!(report.licenses.skipped_deleted, 1);
    assert_eq!(report.licenses.updated, 0);

    let licenses = m365::list_licenses(db.pool()).await.expect("list licenses");
    assert_eq!(licenses.len(), 1);
    assert_eq!(licenses[0].consumed_units, 12);
    assert_eq!(licenses[0].total_units, 25);
    assert!(licenses[0].deleted_manually);
}

#[tokio::test]
async fn clearing_the_flag_resumes_updates() {
    let db = Database::in_memory().await.expect("db should initialize");
    let first = FakeDirectory {
        users: vec![user("u1", "Amy")],
        ..FakeDirectory::default()
    };
    run_sync(&db, &first).await.expect("first sync");
    let stored = m365::list_users(db.pool()).await.expect("list users");
    m365::set_deleted_manually(db.pool(), SyncedTable::Users, &stored[0].id, true)
        .await
        .expect("flag user");
    m365::set_deleted_manually(db.pool(), SyncedTable::Users, &stored[0].id, false)
        .await
        .expect("unflag user");

    let mut renamed = user("u1", "Amy");
    renamed.display_name = Some("Amy Renamed".to_string());
    let report = run_sync(
        &db,
        &FakeDirectory {
            users: vec![renamed],
            ..FakeDirectory::default()
        },
    )
    .await
    .expect("second sync");
    assert_eq!(report.users.updated, 1);
    let users = m365::list_users(db.pool()).await.expect("list users");
    assert_eq!(users[0].display_name, "Amy Renamed");
}

#[tokio::test]
async fn device_without_serial_is_reported_and_skipped() {
    let db = Database::in_memory().await.expect("db should initialize");
    let source = FakeDirectory {
        devices: vec![device("d1", None, "VM-NOSERIAL"), device("d2", Some("SN-002"), "LAPTOP-02")],
        ..FakeDirectory::default()
    };

    let report = run_sync(&db, &source).await.expect("sync should run");
    assert_eq!(report.devices.failed, 1);
    assert_eq!(report.devices.inserted, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("d1"));
}

#[tokio::test]
async fn failed_phase_does_not_stop_the_next_one() {
    let db = Database::in_memory().await.expect("db should initialize");
    let source = FakeDirectory {
        users: vec![user("u1", "Amy")],
        skus: vec![sku("sku-e3", "ENTERPRISEPACK")],
        fail_users: true,
        ..FakeDirectory::default()
    };

    let report = run_sync(&db, &source).await.expect("sync should run");
    assert_eq!(report.users.fetched, 0);
    assert!(report.errors.iter().any(|e| e.starts_with("users: fetch failed")));
    assert_eq!(report.licenses.inserted, 1);
}

#[tokio::test]
async fn authentication_failure_aborts_the_run() {
    let db = Database::in_memory().await.expect("db should initialize");
    let source = FakeDirectory {
        devices: vec![device("d1", Some("SN-001"), "LAPTOP-01")],
        fail_auth: true,
        ..FakeDirectory::default()
    };

    let err = run_sync(&db, &source).await.expect_err("auth failure should abort");
    assert_eq!(err.code(), "GRAPH_AUTH");
    assert!(m365::list_devices(db.pool()).await.expect("list").is_empty());
}

#[tokio::test]
async fn unknown_row_cannot_be_flagged() {
    let db = Database::in_memory().await.expect("db should initialize");
    let err = m365::set_deleted_manually(db.pool(), SyncedTable::Users, "missing", true)
        .await
        .expect_err("missing row");
    assert_eq!(err.code(), "NOT_FOUND");
}
