//! CSV templates, export and import for the inventory tables.
//!
//! Export quotes every field. Import is deliberately simple: lines are split
//! on every comma, so a quoted field that itself contains a comma cannot be
//! read back.

use std::{fmt, str::FromStr};

use uuid::Uuid;

use crate::core::{
    errors::{AppError, AppResult},
    types::{NetworkDeviceRecord, ServerRecord},
};

pub const CSV_IMPORT_SOURCE: &str = "csv-import";

const SERVER_HEADERS: [&str; 4] = ["name", "server_type", "ip_address", "specs"];
const SERVER_EXAMPLE: [&str; 4] = ["DC01", "Active Directory", "10.0.0.10", "4 vCPU 16GB RAM"];
const DEVICE_HEADERS: [&str; 3] = ["name", "device_type", "ip_address"];
const DEVICE_EXAMPLE: [&str; 3] = ["Core Switch", "Switch", "10.0.0.2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvTable {
    Servers,
    NetworkDevices,
}

impl CsvTable {
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            Self::Servers => &SERVER_HEADERS,
            Self::NetworkDevices => &DEVICE_HEADERS,
        }
    }

    /// Header row plus one example row.
    pub fn template(&self) -> String {
        let example: &[&str] = match self {
            Self::Servers => &SERVER_EXAMPLE,
            Self::NetworkDevices => &DEVICE_EXAMPLE,
        };
        let mut out = self.headers().join(",");
        out.push('\n');
        out.push_str(&quoted_row(example.iter().copied()));
        out.push('\n');
        out
    }
}

impl fmt::Display for CsvTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Servers => "servers",
            Self::NetworkDevices => "network-devices",
        })
    }
}

impl FromStr for CsvTable {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "servers" => Ok(Self::Servers),
            "network-devices" | "network_devices" => Ok(Self::NetworkDevices),
            other => Err(AppError::InvalidInput(format!("unknown csv table: {other}"))),
        }
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn quoted_row<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields.into_iter().map(quote).collect::<Vec<_>>().join(",")
}

pub fn export_servers(servers: &[ServerRecord]) -> String {
    let mut out = CsvTable::Servers.headers().join(",");
    out.push('\n');
    for server in servers {
        out.push_str(&quoted_row([
            server.name.as_str(),
            server.server_type.as_str(),
            server.ip_address.as_deref().unwrap_or(""),
            server.specs.as_deref().unwrap_or(""),
        ]));
        out.push('\n');
    }
    out
}

pub fn export_network_devices(devices: &[NetworkDeviceRecord]) -> String {
    let mut out = CsvTable::NetworkDevices.headers().join(",");
    out.push('\n');
    for device in devices {
        out.push_str(&quoted_row([
            device.name.as_str(),
            device.device_type.as_str(),
            device.ip_address.as_deref().unwrap_or(""),
        ]));
        out.push('\n');
    }
    out
}

/// Splits on commas, trims, and drops one pair of surrounding quotes.
fn split_naive(line: &str) -> Vec<String> {
    line.split(',')
        .map(|field| {
            let field = field.trim();
            field
                .strip_prefix('"')
                .and_then(|f| f.strip_suffix('"'))
                .unwrap_or(field)
                .replace("\"\"", "\"")
        })
        .collect()
}

/// Data rows with their 1-based line numbers; the first non-blank line is
/// the header and is skipped.
fn data_rows(text: &str, table: CsvTable) -> AppResult<Vec<(usize, Vec<String>)>> {
    let mut rows = Vec::new();
    let mut seen_header = false;
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if !seen_header {
            seen_header = true;
            continue;
        }
        let fields = split_naive(line);
        if fields.len() != table.headers().len() {
            return Err(AppError::InvalidInput(format!(
                "line {}: expected {} columns, found {}",
                idx + 1,
                table.headers().len(),
                fields.len()
            )));
        }
        rows.push((idx + 1, fields));
    }
    Ok(rows)
}

fn required(fields: &[String], col: usize, line: usize, table: CsvTable) -> AppResult<String> {
    let value = fields[col].trim();
    if value.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "line {line}: {} is required",
            table.headers()[col]
        )));
    }
    Ok(value.to_string())
}

fn optional(fields: &[String], col: usize) -> Option<String> {
    Some(fields[col].trim().to_string()).filter(|v| !v.is_empty())
}

pub fn parse_servers(text: &str) -> AppResult<Vec<ServerRecord>> {
    let table = CsvTable::Servers;
    data_rows(text, table)?
        .into_iter()
        .map(|(line, fields)| {
            Ok(ServerRecord {
                id: Uuid::new_v4().to_string(),
                name: required(&fields, 0, line, table)?,
                server_type: required(&fields, 1, line, table)?,
                ip_address: optional(&fields, 2),
                specs: optional(&fields, 3),
                source: CSV_IMPORT_SOURCE.to_string(),
            })
        })
        .collect()
}

pub fn parse_network_devices(text: &str) -> AppResult<Vec<NetworkDeviceRecord>> {
    let table = CsvTable::NetworkDevices;
    data_rows(text, table)?
        .into_iter()
        .map(|(line, fields)| {
            Ok(NetworkDeviceRecord {
                id: Uuid::new_v4().to_string(),
                name: required(&fields, 0, line, table)?,
                device_type: required(&fields, 1, line, table)?,
                ip_address: optional(&fields, 2),
                source: CSV_IMPORT_SOURCE.to_string(),
            })
        })
        .collect()
}
