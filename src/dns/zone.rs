/// BIND zone file codec.
///
/// Generation of the canonical zone template, record line parsing and
/// formatting, SOA serial extraction and bumping, and the `named.conf.local`
/// zone block.
use crate::common::config::SerialPolicy;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Record types the panel will write
pub const ALLOWED_RECORD_TYPES: &[&str] = &["A", "AAAA", "CNAME", "MX", "TXT", "NS", "PTR", "SRV"];

pub const DEFAULT_TTL: u32 = 3600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub name: String,
    /// `None` when the line relies on the zone's `$TTL`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsZone {
    pub domain: String,
    pub serial: u64,
    pub records: Vec<ZoneRecord>,
}

/// Canonical zone body for a freshly created domain
pub fn build_zone_file(domain: &str, ip: &str, serial: &str) -> String {
    format!(
        r#"$TTL 3600
@   IN  SOA ns1.{d}. admin.{d}. (
            {serial}  ; Serial
            3600        ; Refresh
            1800        ; Retry
            604800      ; Expire
            300 )       ; Minimum TTL

; Name Servers
@       IN  NS  ns1.{d}.
@       IN  NS  ns2.{d}.

; A Records
@       IN  A   {ip}
www     IN  A   {ip}
ns1     IN  A   {ip}
ns2     IN  A   {ip}

; Mail
@       IN  MX  10 mail.{d}.
mail    IN  A   {ip}

; SPF
@       IN  TXT "v=spf1 mx a ip4:{ip} -all"
"#,
        d = domain,
        serial = serial,
        ip = ip
    )
}

/// Drop a trailing `;` comment, ignoring semicolons inside quoted strings
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Parse `name [ttl] IN type value...`.
///
/// SOA and its continuation lines are not records.
pub fn parse_record_line(line: &str) -> Option<ZoneRecord> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('$') {
        return None;
    }

    let parts: Vec<&str> = strip_comment(trimmed).split_whitespace().collect();
    let (ttl, type_idx) = if parts.len() >= 4 && parts[1].eq_ignore_ascii_case("IN") {
        (None, 2)
    } else if parts.len() >= 5 && parts[2].eq_ignore_ascii_case("IN") {
        (Some(parts[1].parse::<u32>().ok()?), 3)
    } else {
        return None;
    };

    let record_type = parts[type_idx].to_ascii_uppercase();
    if record_type == "SOA" {
        return None;
    }

    Some(ZoneRecord {
        name: parts[0].to_string(),
        ttl,
        record_type,
        value: parts[type_idx + 1..].join(" "),
    })
}

/// `name\tttl\tIN\ttype\tvalue`
pub fn format_record_line(record: &ZoneRecord) -> String {
    format!(
        "{}\t{}\tIN\t{}\t{}",
        record.name,
        record.ttl.unwrap_or(DEFAULT_TTL),
        record.record_type,
        record.value
    )
}

/// Index of the line carrying the SOA serial
fn serial_line(lines: &[&str]) -> Option<usize> {
    lines
        .iter()
        .position(|l| l.contains("Serial") || l.contains("serial"))
}

/// Serial currently recorded in the zone
pub fn current_serial(content: &str) -> Option<u64> {
    let lines: Vec<&str> = content.split('\n').collect();
    let idx = serial_line(&lines)?;
    lines[idx].split_whitespace().next()?.parse().ok()
}

pub fn parse_zone(domain: &str, content: &str) -> DnsZone {
    DnsZone {
        domain: domain.to_string(),
        serial: current_serial(content).unwrap_or(0),
        records: content
            .lines()
            .filter(|l| !l.contains("Serial") && !l.contains("serial"))
            .filter_map(parse_record_line)
            .collect(),
    }
}

/// `YYYYMMDDHH`
pub fn serial_from_time(now: NaiveDateTime) -> String {
    now.format("%Y%m%d%H").to_string()
}

/// Serial to write next under `policy`
pub fn next_serial(policy: SerialPolicy, current: Option<u64>, now: NaiveDateTime) -> String {
    let wall = serial_from_time(now);
    match (policy, current) {
        (SerialPolicy::Monotonic, Some(cur)) => match wall.parse::<u64>() {
            Ok(w) if w > cur => wall,
            _ => (cur + 1).to_string(),
        },
        _ => wall,
    }
}

/// Replace the first token of the serial line, keeping its indentation.
///
/// Content without a serial line is returned unchanged.
pub fn bump_serial(content: &str, new_serial: &str) -> String {
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    if let Some(idx) = serial_line(&refs) {
        if let Some(token) = lines[idx].split_whitespace().next().map(str::to_string) {
            lines[idx] = lines[idx].replacen(&token, new_serial, 1);
        }
    }
    lines.join("\n")
}

/// Block appended to `named.conf.local` for a master zone
pub fn zone_block(domain: &str, zone_file: &str) -> String {
    format!(
        "\nzone \"{}\" {{\n    type master;\n    file \"{}\";\n}};",
        domain, zone_file
    )
}

pub fn has_zone_block(lines: &[String], domain: &str) -> bool {
    let marker = format!("zone \"{}\"", domain);
    lines.iter().any(|l| l.contains(&marker))
}

/// Remove the `zone "<domain>" { ... };` block by brace depth.
///
/// Returns whether anything was removed.
pub fn remove_zone_block(lines: &mut Vec<String>, domain: &str) -> bool {
    let marker = format!("zone \"{}\"", domain);
    let before = lines.len();
    let mut kept = Vec::with_capacity(lines.len());
    let mut skipping = false;
    let mut depth: i64 = 0;

    for line in lines.drain(..) {
        if !skipping && line.contains(&marker) {
            skipping = true;
            depth = 0;
        }
        if skipping {
            depth += line.matches('{').count() as i64 - line.matches('}').count() as i64;
            if depth <= 0 && line.contains('}') {
                skipping = false;
            }
            continue;
        }
        kept.push(line);
    }

    // Drop the blank separator line the block was appended with
    while kept.len() >= 2 && kept[kept.len() - 1].trim().is_empty() && kept[kept.len() - 2].trim().is_empty() {
        kept.pop();
    }

    *lines = kept;
    lines.len() != before
}

/// Structural match used by record deletion
pub fn record_matches(record: &ZoneRecord, name: &str, record_type: &str, value: Option<&str>) -> bool {
    if !record.name.eq_ignore_ascii_case(name) || !record.record_type.eq_ignore_ascii_case(record_type) {
        return false;
    }
    match value {
        Some(v) => {
            let wanted: Vec<&str> = v.split_whitespace().collect();
            let have: Vec<&str> = record.value.split_whitespace().collect();
            wanted == have
        }
        None => true,
    }
}
