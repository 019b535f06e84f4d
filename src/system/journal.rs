/// `journalctl --output=short-iso` line parsing.
use super::types::LogEntry;

pub const DEFAULT_LOG_LINES: u32 = 100;
pub const MAX_LOG_LINES: u32 = 1000;

pub fn clamp_lines(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_LOG_LINES)
        .clamp(1, MAX_LOG_LINES)
}

/// Keyword guess at a severity; the short-iso format carries none
pub fn guess_level(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    if lower.contains("error") || lower.contains("fail") {
        "ERROR"
    } else if lower.contains("warn") {
        "WARN"
    } else {
        "INFO"
    }
}

/// Parse `2024-06-01T06:42:11+0000 host unit[pid]: message` lines.
///
/// Lines of another shape (journal markers) keep their text as the message.
pub fn parse_journal_lines(raw: &str) -> Vec<LogEntry> {
    raw.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let parts: Vec<&str> = line.splitn(4, ' ').collect();
            if parts.len() < 4 {
                return LogEntry {
                    message: line.to_string(),
                    ..Default::default()
                };
            }
            let unit = parts[2].trim_end_matches(':');
            let unit = unit.split_once('[').map_or(unit, |(name, _)| name);
            LogEntry {
                time: parts[0].to_string(),
                level: guess_level(parts[3]).to_string(),
                message: parts[3].to_string(),
                unit: unit.to_string(),
            }
        })
        .collect()
}
