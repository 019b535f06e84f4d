use crate::common::context::PanelContext;
use crate::common::error::{PanelError, PanelResult};
use crate::common::panel_module::PanelModule;
use crate::common::security::helpers::audit_operation;
use std::path::Path;
use std::time::Duration;

use super::journal::{clamp_lines, parse_journal_lines};
use super::procfs::{
    count_cores, cpu_usage, format_uptime, parse_cpu_line, parse_df, parse_loadavg,
    parse_meminfo, parse_os_release, parse_systemctl_show,
};
use super::types::{
    CpuStat, DiskStat, LogEntry, ServiceAction, ServiceActionResult, ServiceStatus, SystemStats,
};

/// Units the panel reports on and may start, stop or restart
pub const MONITORED_SERVICES: &[&str] = &[
    "nginx", "mariadb", "ssh", "postfix", "dovecot", "named", "vsftpd", "fail2ban", "cron",
];

const CPU_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

/// Host statistics, service control and journal access
pub struct SystemTools {
    ctx: PanelContext,
}

impl SystemTools {
    pub fn new(ctx: PanelContext) -> Self {
        Self { ctx }
    }

    /// CPU, memory, root filesystem, uptime, load and OS name
    pub async fn stats(&self) -> PanelResult<SystemStats> {
        audit_operation(&self.ctx.audit, "system_stats", None, || async {
            let paths = &self.ctx.config.paths;
            let proc_root = paths.proc_root.as_path();

            let before = read_or_empty(&proc_root.join("stat")).await;
            tokio::time::sleep(CPU_SAMPLE_INTERVAL).await;
            let after = read_or_empty(&proc_root.join("stat")).await;
            let used_pct = match (parse_cpu_line(&before), parse_cpu_line(&after)) {
                (Some(b), Some(a)) => cpu_usage(&b, &a),
                _ => 0.0,
            };
            let cores = count_cores(&read_or_empty(&proc_root.join("cpuinfo")).await);

            Ok(SystemStats {
                cpu: CpuStat { used_pct, cores },
                ram: parse_meminfo(&read_or_empty(&proc_root.join("meminfo")).await),
                disk: self.disk().await,
                uptime: format_uptime(&read_or_empty(&proc_root.join("uptime")).await)
                    .unwrap_or_default(),
                load_avg: parse_loadavg(&read_or_empty(&proc_root.join("loadavg")).await)
                    .unwrap_or_default(),
                os: parse_os_release(&read_or_empty(&paths.os_release).await)
                    .unwrap_or_else(|| "Linux".to_string()),
            })
        })
        .await
    }

    /// Status of every monitored unit; a failing query reports `unknown`
    pub async fn services(&self) -> PanelResult<Vec<ServiceStatus>> {
        audit_operation(&self.ctx.audit, "list_services", None, || async {
            let mut statuses = Vec::with_capacity(MONITORED_SERVICES.len());
            for name in MONITORED_SERVICES {
                let query = self
                    .ctx
                    .gate
                    .run(
                        "systemctl",
                        &[
                            "show",
                            name,
                            "--property=ActiveState,MainPID,ActiveEnterTimestamp",
                        ],
                    )
                    .await;
                let status = match query {
                    Ok(out) => parse_systemctl_show(name, &out),
                    Err(e) => {
                        tracing::debug!(service = %name, error = %e, "service query failed");
                        parse_systemctl_show(name, "")
                    }
                };
                statuses.push(status);
            }
            Ok(statuses)
        })
        .await
    }

    pub async fn service_action(
        &self,
        name: &str,
        action: ServiceAction,
    ) -> PanelResult<ServiceActionResult> {
        audit_operation(
            &self.ctx.audit,
            "service_action",
            Some(serde_json::json!({"service": name, "action": action.verb()})),
            || async {
                let service = managed_service(name)?;
                if action == ServiceAction::Stop {
                    self.ctx.audit.log_dangerous_operation(
                        "service_action",
                        true,
                        &format!("Stopping {}", service),
                    );
                }
                self.ctx
                    .gate
                    .run("systemctl", &[action.verb(), service])
                    .await?;
                Ok(ServiceActionResult {
                    service: service.to_string(),
                    action,
                })
            },
        )
        .await
    }

    /// Recent journal lines, optionally for one unit
    pub async fn logs(&self, unit: Option<&str>, lines: Option<u32>) -> PanelResult<Vec<LogEntry>> {
        audit_operation(
            &self.ctx.audit,
            "system_logs",
            Some(serde_json::json!({"unit": unit, "lines": lines})),
            || async {
                let count = clamp_lines(lines).to_string();
                let mut args = vec!["-n", count.as_str(), "--no-pager", "--output=short-iso"];
                let unit = unit.map(str::trim).filter(|u| !u.is_empty());
                if let Some(u) = unit {
                    args.extend(["-u", u]);
                }
                let out = self.ctx.gate.run("journalctl", &args).await?;
                Ok(parse_journal_lines(&out))
            },
        )
        .await
    }

    async fn disk(&self) -> DiskStat {
        match self
            .ctx
            .gate
            .run("df", &["-BG", "--output=size,used,avail,pcent", "/"])
            .await
        {
            Ok(out) => parse_df(&out).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "disk usage unavailable");
                DiskStat::default()
            }
        }
    }
}

impl PanelModule for SystemTools {
    fn context(&self) -> &PanelContext {
        &self.ctx
    }

    fn name(&self) -> &'static str {
        "SystemTools"
    }
}

fn managed_service(name: &str) -> PanelResult<&'static str> {
    MONITORED_SERVICES
        .iter()
        .copied()
        .find(|s| *s == name.trim())
        .ok_or_else(|| PanelError::forbidden(format!("{} is not a managed service", name.trim())))
}

async fn read_or_empty(path: &Path) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "host statistic unavailable");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_service() {
        assert_eq!(managed_service("nginx").unwrap(), "nginx");
        assert_eq!(managed_service(" cron ").unwrap(), "cron");
        assert!(matches!(managed_service("sshd"), Err(PanelError::Forbidden(_))));
        assert!(matches!(managed_service("nginx; reboot"), Err(PanelError::Forbidden(_))));
    }
}
