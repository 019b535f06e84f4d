/// Parsers for `/proc` files and the `df`/`systemctl show` outputs.
use super::types::{DiskStat, MemoryStat, ServiceStatus};

/// Jiffy counters of the aggregate `cpu ` line of `/proc/stat`
pub fn parse_cpu_line(stat: &str) -> Option<Vec<u64>> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    Some(
        line.split_whitespace()
            .skip(1)
            .map(|v| v.parse().unwrap_or(0))
            .collect(),
    )
}

/// Busy percentage between two samples
pub fn cpu_usage(before: &[u64], after: &[u64]) -> f64 {
    let idle = |s: &[u64]| s.get(3).copied().unwrap_or(0);
    let total = |s: &[u64]| s.iter().sum::<u64>();

    let total_diff = total(after).saturating_sub(total(before)) as f64;
    let idle_diff = idle(after).saturating_sub(idle(before)) as f64;
    if total_diff <= 0.0 {
        return 0.0;
    }
    (1.0 - idle_diff / total_diff) * 100.0
}

pub fn count_cores(cpuinfo: &str) -> usize {
    cpuinfo
        .lines()
        .filter(|l| l.starts_with("processor"))
        .count()
        .max(1)
}

/// Memory from `MemTotal` and `MemAvailable`
pub fn parse_meminfo(meminfo: &str) -> MemoryStat {
    let field = |name: &str| -> u64 {
        meminfo
            .lines()
            .find_map(|l| l.strip_prefix(name)?.strip_prefix(':'))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    };
    let total_kb = field("MemTotal");
    let free_kb = field("MemAvailable");
    MemoryStat {
        total_mb: total_kb / 1024,
        used_mb: total_kb.saturating_sub(free_kb) / 1024,
        free_mb: free_kb / 1024,
    }
}

/// `/proc/uptime` seconds as `Nd Nh Nm`
pub fn format_uptime(uptime: &str) -> Option<String> {
    let secs: f64 = uptime.split_whitespace().next()?.parse().ok()?;
    let secs = secs as u64;
    Some(format!(
        "{}d {}h {}m",
        secs / 86_400,
        (secs / 3_600) % 24,
        (secs / 60) % 60
    ))
}

pub fn parse_loadavg(loadavg: &str) -> Option<String> {
    let parts: Vec<&str> = loadavg.split_whitespace().take(3).collect();
    (parts.len() == 3).then(|| parts.join(" "))
}

/// `PRETTY_NAME` of os-release, unquoted
pub fn parse_os_release(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|l| l.strip_prefix("PRETTY_NAME="))
        .map(|v| v.trim().trim_matches('"').to_string())
}

/// Output of `df -BG --output=size,used,avail,pcent /`
pub fn parse_df(output: &str) -> Option<DiskStat> {
    let fields: Vec<&str> = output.lines().nth(1)?.split_whitespace().collect();
    if fields.len() < 4 {
        return None;
    }
    let num = |s: &str| s.trim_end_matches(['G', '%']).parse::<f64>().ok();
    let used_pct = num(fields[3])?;
    Some(DiskStat {
        total_gb: num(fields[0])?,
        used_gb: num(fields[1])?,
        used_pct,
        free_pct: 100.0 - used_pct,
    })
}

/// Output of `systemctl show <unit> --property=ActiveState,MainPID,ActiveEnterTimestamp`
pub fn parse_systemctl_show(name: &str, output: &str) -> ServiceStatus {
    let mut status = ServiceStatus {
        name: name.to_string(),
        status: "unknown".to_string(),
        ..Default::default()
    };
    for (key, value) in output.lines().filter_map(|l| l.split_once('=')) {
        match key {
            "ActiveState" => {
                status.status = value.to_string();
                status.active = value == "active";
            }
            "MainPID" => status.pid = value.to_string(),
            "ActiveEnterTimestamp" => status.since = value.to_string(),
            _ => {}
        }
    }
    status
}
