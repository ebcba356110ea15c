//! Line-oriented keyword heuristics over extracted text.
//!
//! Results are suggestions for a human to review before import. The four
//! scans share nothing and hold no state between calls.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::types::{BranchCandidate, NetworkDeviceCandidate, ServerCandidate};

const MAX_NAME_CHARS: usize = 50;
const MIN_NAME_CHARS: usize = 4;
const SERVER_LOOKAHEAD_LINES: usize = 4;

static IP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\b",
    )
    .expect("ip regex")
});

static SPECS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\d+\s*(?:vcpu|cpu|core|gb|ram|tb|storage)").expect("specs regex")
});

static AD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bad\b").expect("ad regex"));
static RDS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\brds\b").expect("rds regex"));
static FILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfile\b").expect("file regex"));

static CITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:located(?:\s+(?:in|at))?|in|at)\s+([A-Za-z][A-Za-z .'-]*[A-Za-z])")
        .expect("city regex")
});

static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s\-\*•·–—>]+").expect("bullet regex"));

const SERVER_KEYWORDS: [&str; 3] = ["server", "vm ", "virtual"];
const DEVICE_KEYWORDS: [(&str, &str); 4] = [
    ("router", "Router"),
    ("switch", "Switch"),
    ("firewall", "Firewall"),
    ("gateway", "Gateway"),
];
const BRANCH_KEYWORDS: [&str; 3] = ["branch", "office", "site"];

/// Every valid dotted-quad address, de-duplicated in first-seen order.
pub fn extract_ip_addresses(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    IP_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|ip| seen.insert(ip.clone()))
        .collect()
}

pub fn extract_servers(text: &str) -> Vec<ServerCandidate> {
    let lines: Vec<&str> = text.lines().collect();
    let mut servers = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let lower = line.to_lowercase();
        if !SERVER_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            continue;
        }
        let Some(name) = candidate_name(line) else {
            continue;
        };
        let window = &lines[idx..(idx + SERVER_LOOKAHEAD_LINES + 1).min(lines.len())];
        let ip = window
            .iter()
            .find_map(|l| IP_RE.find(l).map(|m| m.as_str().to_string()));
        let specs = window
            .iter()
            .find(|l| SPECS_RE.is_match(l))
            .map(|l| clean_line(l));

        servers.push(ServerCandidate {
            name,
            server_type: server_type(&lower).to_string(),
            ip,
            specs,
        });
    }
    servers
}

fn server_type(lower: &str) -> &'static str {
    if lower.contains("rdp") {
        "RDP"
    } else if lower.contains("active directory") || AD_RE.is_match(lower) {
        "Active Directory"
    } else if lower.contains("remote desktop services") || RDS_RE.is_match(lower) {
        "Remote Desktop Services"
    } else if lower.contains("file server") || FILE_RE.is_match(lower) {
        "File Server"
    } else {
        "Server"
    }
}

pub fn extract_network_devices(text: &str) -> Vec<NetworkDeviceCandidate> {
    let mut devices = Vec::new();
    for line in text.lines() {
        let lower = line.to_lowercase();
        let Some((_, device_type)) = DEVICE_KEYWORDS.iter().find(|(kw, _)| lower.contains(kw))
        else {
            continue;
        };
        let Some(name) = candidate_name(line) else {
            continue;
        };
        devices.push(NetworkDeviceCandidate {
            name,
            device_type: (*device_type).to_string(),
            ip: IP_RE.find(line).map(|m| m.as_str().to_string()),
        });
    }
    devices
}

pub fn extract_branches(text: &str) -> Vec<BranchCandidate> {
    let mut branches = Vec::new();
    for line in text.lines() {
        let lower = line.to_lowercase();
        if !BRANCH_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            continue;
        }
        let Some(name) = candidate_name(line) else {
            continue;
        };
        let city = CITY_RE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|city| !city.is_empty());
        branches.push(BranchCandidate { name, city });
    }
    branches
}

fn clean_line(line: &str) -> String {
    BULLET_RE.replace(line, "").trim().to_string()
}

/// Bullet-stripped, truncated line; `None` for noise of three chars or less.
fn candidate_name(line: &str) -> Option<String> {
    let cleaned = clean_line(line);
    let name: String = cleaned.chars().take(MAX_NAME_CHARS).collect();
    let name = name.trim_end().to_string();
    (name.chars().count() >= MIN_NAME_CHARS).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_server_line_yields_default_type_ip_and_specs() {
        let servers = extract_servers("Server: WEB01 10.0.0.5 8 vCPU 16GB RAM");
        assert_eq!(servers.len(), 1);
        let server = &servers[0];
        assert_eq!(server.server_type, "Server");
        assert_eq!(server.ip.as_deref(), Some("10.0.0.5"));
        let specs = server.specs.as_deref().unwrap();
        assert!(specs.contains("8 vCPU"));
        assert!(specs.contains("16GB RAM"));
    }

    #[test]
    fn server_type_follows_keyword_priority() {
        let text = "\
- RDP server for AD users
- Domain controller server (Active Directory)
- RDS server farm
- File server for shares
- Virtual machine host";
        let types: Vec<String> = extract_servers(text)
            .into_iter()
            .map(|s| s.server_type)
            .collect();
        assert_eq!(
            types,
            vec![
                "RDP",
                "Active Directory",
                "Remote Desktop Services",
                "File Server",
                "Server"
            ]
        );
    }

    #[test]
    fn server_ip_and_specs_come_from_the_lookahead_window() {
        let text = "\
* Backup Server
Location: rack 4
IP 192.168.10.20
4 cores
unrelated
10.9.9.9";
        let servers = extract_servers(text);
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "Backup Server");
        assert_eq!(servers[0].ip.as_deref(), Some("192.168.10.20"));
        assert_eq!(servers[0].specs.as_deref(), Some("4 cores"));
    }

    #[test]
    fn ip_outside_the_window_is_not_attached() {
        let text = "Print server\na\nb\nc\nd\n10.1.1.1";
        let servers = extract_servers(text);
        assert_eq!(servers[0].ip, None);
    }

    #[test]
    fn short_and_long_names_are_filtered_and_truncated() {
        assert!(extract_servers("- vm ").is_empty());
        let long = format!("Server {}", "X".repeat(80));
        let servers = extract_servers(&long);
        assert_eq!(servers[0].name.chars().count(), 50);
    }

    #[test]
    fn ips_are_deduplicated_and_octets_validated() {
        let ips = extract_ip_addresses(
            "gw 10.0.0.1, dns 10.0.0.2, again 10.0.0.1, bogus 999.1.1.1 and 256.256.256.256",
        );
        assert_eq!(ips, vec!["10.0.0.1", "10.0.0.2"]);
        for ip in &ips {
            assert!(ip.split('.').all(|o| o.parse::<u16>().unwrap() <= 255));
        }
    }

    #[test]
    fn devices_take_ip_from_the_same_line_only() {
        let text = "Core switch SW-01 10.0.0.2\nEdge Firewall\n10.0.0.254\nISP router";
        let devices = extract_network_devices(text);
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].device_type, "Switch");
        assert_eq!(devices[0].ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(devices[1].device_type, "Firewall");
        assert_eq!(devices[1].ip, None);
        assert_eq!(devices[2].device_type, "Router");
    }

    #[test]
    fn branches_capture_a_loose_city() {
        let branches = extract_branches(
            "Branch office located in Cape Town\nHead office at Johannesburg\nSite B",
        );
        assert_eq!(branches.len(), 3);
        assert_eq!(branches[0].city.as_deref(), Some("Cape Town"));
        assert_eq!(branches[1].city.as_deref(), Some("Johannesburg"));
        assert_eq!(branches[2].name, "Site B");
        assert_eq!(branches[2].city, None);
    }

    #[test]
    fn scans_are_idempotent() {
        let text = "File server FS01 10.0.0.9\n16GB RAM\nCore router 10.0.0.1\nBranch in Durban";
        assert_eq!(extract_servers(text), extract_servers(text));
        assert_eq!(extract_network_devices(text), extract_network_devices(text));
        assert_eq!(extract_branches(text), extract_branches(text));
        assert_eq!(extract_ip_addresses(text), extract_ip_addresses(text));
    }
}
