//! Persists a reviewed extraction: section images become network diagrams,
//! detected servers and devices become inventory rows.
//!
//! Every item is written independently. A failure is logged and reported
//! but never undoes what was already written.

use std::{fmt, str::FromStr};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    core::{
        errors::{AppError, AppResult},
        types::{
            DocumentSection, ExtractedImage, ExtractedNetworkData, ImportFailure, ImportReport,
            NetworkDeviceRecord, ServerRecord,
        },
    },
    db::{
        repositories::{diagrams, inventory},
        Database,
    },
    extractor::images::decode_data_url,
    storage::{Bucket, BucketStore},
};

pub const IMPORT_SOURCE: &str = "document-import";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagramFolder {
    NymbisCloud,
    #[default]
    CompanyNetwork,
    CloudNetworks,
}

impl DiagramFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NymbisCloud => "nymbis-cloud",
            Self::CompanyNetwork => "company-network",
            Self::CloudNetworks => "cloud-networks",
        }
    }
}

impl fmt::Display for DiagramFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagramFolder {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nymbis-cloud" => Ok(Self::NymbisCloud),
            "company-network" => Ok(Self::CompanyNetwork),
            "cloud-networks" => Ok(Self::CloudNetworks),
            other => Err(AppError::InvalidInput(format!("unknown diagram folder: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub folder: DiagramFolder,
    /// Original upload name, stored on each diagram row.
    pub source_file: Option<String>,
    pub import_servers: bool,
    pub import_network_devices: bool,
}

impl ImportOptions {
    pub fn everything(source_file: Option<String>) -> Self {
        Self {
            folder: DiagramFolder::default(),
            source_file,
            import_servers: true,
            import_network_devices: true,
        }
    }
}

fn checksum_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// `<folder>/<timestamp>-section-<n>-<random>.<ext>`
pub fn diagram_object_path(folder: DiagramFolder, section_number: usize, extension: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}-section-{}-{}.{}",
        folder.as_str(),
        Utc::now().timestamp_millis(),
        section_number,
        &suffix[..8],
        extension
    )
}

pub async fn import_network_data(
    db: &Database,
    store: &BucketStore,
    data: &ExtractedNetworkData,
    options: &ImportOptions,
) -> AppResult<ImportReport> {
    let mut report = ImportReport::default();

    for section in &data.sections {
        for image in &section.images {
            match import_diagram(db, store, section, image, options).await {
                Ok(()) => report.diagrams_created += 1,
                Err(err) => {
                    let item = format!("section {} / {}", section.section_number, image.name);
                    tracing::warn!(item = %item, error = %err, "diagram import failed");
                    report.failures.push(ImportFailure {
                        item,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    if options.import_servers {
        for server in &data.servers {
            let record = ServerRecord {
                id: Uuid::new_v4().to_string(),
                name: server.name.clone(),
                server_type: server.server_type.clone(),
                ip_address: server.ip.clone(),
                specs: server.specs.clone(),
                source: IMPORT_SOURCE.to_string(),
            };
            match inventory::insert_server(db.pool(), &record).await {
                Ok(()) => report.servers_created += 1,
                Err(err) => {
                    tracing::warn!(server = %server.name, error = %err, "server import failed");
                    report.failures.push(ImportFailure {
                        item: format!("server {}", server.name),
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    if options.import_network_devices {
        for device in &data.network_devices {
            let record = NetworkDeviceRecord {
                id: Uuid::new_v4().to_string(),
                name: device.name.clone(),
                device_type: device.device_type.clone(),
                ip_address: device.ip.clone(),
                source: IMPORT_SOURCE.to_string(),
            };
            match inventory::insert_network_device(db.pool(), &record).await {
                Ok(()) => report.network_devices_created += 1,
                Err(err) => {
                    tracing::warn!(device = %device.name, error = %err, "network device import failed");
                    report.failures.push(ImportFailure {
                        item: format!("network device {}", device.name),
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    tracing::info!(
        folder = %options.folder,
        diagrams = report.diagrams_created,
        servers = report.servers_created,
        network_devices = report.network_devices_created,
        failures = report.failures.len(),
        "import finished"
    );
    Ok(report)
}

async fn import_diagram(
    db: &Database,
    store: &BucketStore,
    section: &DocumentSection,
    image: &ExtractedImage,
    options: &ImportOptions,
) -> AppResult<()> {
    let decoded = decode_data_url(&image.data_url)?;
    let key = diagram_object_path(options.folder, section.section_number, decoded.extension());
    store.upload(Bucket::Diagrams, &key, &decoded.bytes)?;

    let description = if section.text.trim().is_empty() {
        section.title.as_str()
    } else {
        section.text.as_str()
    };
    let id = Uuid::new_v4().to_string();
    let checksum = checksum_bytes(&decoded.bytes);
    diagrams::insert_diagram(
        db.pool(),
        &diagrams::NewDiagram {
            id: &id,
            folder: options.folder.as_str(),
            title: &section.title,
            description,
            bucket: Bucket::Diagrams.as_str(),
            object_path: &key,
            section_number: i64::try_from(section.section_number).ok(),
            source_file: options.source_file.as_deref(),
            checksum: &checksum,
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_parses_and_defaults() {
        assert_eq!(DiagramFolder::default(), DiagramFolder::CompanyNetwork);
        assert_eq!("Cloud-Networks".parse::<DiagramFolder>().unwrap(), DiagramFolder::CloudNetworks);
        assert!("misc".parse::<DiagramFolder>().is_err());
    }

    #[test]
    fn object_path_layout() {
        let path = diagram_object_path(DiagramFolder::NymbisCloud, 3, "png");
        let (folder, file) = path.split_once('/').unwrap();
        assert_eq!(folder, "nymbis-cloud");
        assert!(file.ends_with(".png"));
        let stem = file.trim_end_matches(".png");
        let parts: Vec<&str> = stem.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert!(parts[0].parse::<i64>().is_ok());
        assert_eq!(parts[1], "section");
        assert_eq!(parts[2], "3");
        assert_eq!(parts[3].len(), 8);
    }
}
