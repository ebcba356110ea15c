use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedImage {
    pub name: String,
    /// Self-contained `data:<mime>;base64,...` URL.
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSection {
    pub id: String,
    pub section_number: usize,
    pub title: String,
    pub text: String,
    pub images: Vec<ExtractedImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerCandidate {
    pub name: String,
    #[serde(rename = "type")]
    pub server_type: String,
    pub ip: Option<String>,
    pub specs: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDeviceCandidate {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BranchCandidate {
    pub name: String,
    pub city: Option<String>,
}

/// Terminal output of one parse pass over an uploaded document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedNetworkData {
    pub servers: Vec<ServerCandidate>,
    pub network_devices: Vec<NetworkDeviceCandidate>,
    pub ip_addresses: Vec<String>,
    pub branches: Vec<BranchCandidate>,
    pub raw_text: String,
    pub extracted_images: Vec<ExtractedImage>,
    pub sections: Vec<DocumentSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDiagram {
    pub id: String,
    pub folder: String,
    pub title: String,
    pub description: String,
    pub bucket: String,
    pub object_path: String,
    pub section_number: Option<i64>,
    pub source_file: Option<String>,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub id: String,
    pub name: String,
    pub server_type: String,
    pub ip_address: Option<String>,
    pub specs: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDeviceRecord {
    pub id: String,
    pub name: String,
    pub device_type: String,
    pub ip_address: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    pub item: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub diagrams_created: usize,
    pub servers_created: usize,
    pub network_devices_created: usize,
    pub failures: Vec<ImportFailure>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    SkippedDeleted,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSummary {
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped_deleted: usize,
    pub failed: usize,
}

impl PhaseSummary {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::SkippedDeleted => self.skipped_deleted += 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub devices: PhaseSummary,
    pub users: PhaseSummary,
    pub licenses: PhaseSummary,
    pub errors: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteClient {
    pub id: String,
    pub token: String,
    pub hostname: String,
    pub os: Option<String>,
    pub ip_address: Option<String>,
    pub agent_version: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedDevice {
    pub id: String,
    pub serial_number: String,
    pub device_name: String,
    pub operating_system: Option<String>,
    pub os_version: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub user_principal_name: Option<String>,
    pub deleted_manually: bool,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedUser {
    pub id: String,
    pub azure_ad_id: String,
    pub display_name: String,
    pub user_principal_name: Option<String>,
    pub mail: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub account_enabled: bool,
    pub deleted_manually: bool,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedLicense {
    pub id: String,
    pub sku_id: String,
    pub vendor: String,
    pub sku_part_number: String,
    pub total_units: i64,
    pub consumed_units: i64,
    pub deleted_manually: bool,
    pub synced_at: DateTime<Utc>,
}
