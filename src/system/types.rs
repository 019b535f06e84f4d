/// Result types for host monitoring and service control.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuStat {
    pub used_pct: f64,
    pub cores: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStat {
    pub total_mb: u64,
    pub used_mb: u64,
    pub free_mb: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskStat {
    pub total_gb: f64,
    pub used_gb: f64,
    pub used_pct: f64,
    pub free_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStats {
    pub cpu: CpuStat,
    pub ram: MemoryStat,
    pub disk: DiskStat,
    /// `3d 4h 12m`
    pub uptime: String,
    /// 1, 5 and 15 minute averages as printed by the kernel
    pub load_avg: String,
    pub os: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub name: String,
    /// systemd `ActiveState`, or `unknown`
    pub status: String,
    pub active: bool,
    pub pid: String,
    pub since: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    pub fn verb(self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceActionResult {
    pub service: String,
    pub action: ServiceAction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub message: String,
    pub unit: String,
}
