/// Host statistics from a fake `/proc`, service control and journal access.
mod common;

use common::Sandbox;
use vpsctl::common::error::PanelError;
use vpsctl::system::{ServiceAction, SystemTools, MONITORED_SERVICES};

fn fake_proc(sb: &Sandbox) {
    let proc_root = &sb.paths().proc_root;
    sb.write(&proc_root.join("stat"), "cpu  100 0 100 800 0 0 0 0 0 0\ncpu0 50 0 50 400\n");
    sb.write(
        &proc_root.join("cpuinfo"),
        "processor\t: 0\nmodel name\t: Fake\n\nprocessor\t: 1\nmodel name\t: Fake\n",
    );
    sb.write(
        &proc_root.join("meminfo"),
        "MemTotal:        4096000 kB\nMemFree:          512000 kB\nMemAvailable:    1024000 kB\n",
    );
    sb.write(&proc_root.join("uptime"), "273600.52 500000.10\n");
    sb.write(&proc_root.join("loadavg"), "0.52 0.41 0.30 1/345 9876\n");
    sb.write(
        &sb.paths().os_release,
        "NAME=\"Debian GNU/Linux\"\nPRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\nID=debian\n",
    );
}

#[tokio::test]
async fn test_stats_from_proc() {
    let sb = Sandbox::new();
    fake_proc(&sb);
    sb.executor.respond(
        "df",
        "1G-blocks  Used Avail Use%\n      80G   20G   56G  25%\n",
    );

    let stats = SystemTools::new(sb.ctx.clone()).stats().await.unwrap();
    assert_eq!(stats.cpu.cores, 2);
    // identical samples
    assert_eq!(stats.cpu.used_pct, 0.0);
    assert_eq!(stats.ram.total_mb, 4000);
    assert_eq!(stats.ram.free_mb, 1000);
    assert_eq!(stats.ram.used_mb, 3000);
    assert_eq!(stats.disk.total_gb, 80.0);
    assert_eq!(stats.disk.used_pct, 25.0);
    assert_eq!(stats.disk.free_pct, 75.0);
    assert_eq!(stats.uptime, "3d 4h 0m");
    assert_eq!(stats.load_avg, "0.52 0.41 0.30");
    assert_eq!(stats.os, "Debian GNU/Linux 12 (bookworm)");
}

#[tokio::test]
async fn test_stats_degrade_without_sources() {
    let sb = Sandbox::new();
    sb.executor.fail("df", "df: /: Permission denied");

    let stats = SystemTools::new(sb.ctx.clone()).stats().await.unwrap();
    assert_eq!(stats.cpu.cores, 1);
    assert_eq!(stats.ram.total_mb, 0);
    assert_eq!(stats.disk.total_gb, 0.0);
    assert_eq!(stats.uptime, "");
    assert_eq!(stats.os, "Linux");
}

#[tokio::test]
async fn test_services_report_every_monitored_unit() {
    let sb = Sandbox::new();
    sb.executor.respond(
        "systemctl",
        "ActiveState=active\nMainPID=812\nActiveEnterTimestamp=Sat 2024-06-01 09:00:01 UTC\n",
    );

    let services = SystemTools::new(sb.ctx.clone()).services().await.unwrap();
    assert_eq!(services.len(), MONITORED_SERVICES.len());
    assert_eq!(services[0].name, "nginx");
    assert!(services.iter().all(|s| s.active && s.pid == "812"));
    assert_eq!(
        sb.executor.calls_to("systemctl")[0].command_line(),
        "systemctl show nginx --property=ActiveState,MainPID,ActiveEnterTimestamp"
    );
}

#[tokio::test]
async fn test_failed_service_query_reports_unknown() {
    let sb = Sandbox::new();
    sb.executor.fail("systemctl", "Failed to connect to bus");

    let services = SystemTools::new(sb.ctx.clone()).services().await.unwrap();
    assert!(services.iter().all(|s| s.status == "unknown" && !s.active));
}

#[tokio::test]
async fn test_service_actions_limited_to_monitored_units() {
    let sb = Sandbox::new();
    let system = SystemTools::new(sb.ctx.clone());

    let result = system
        .service_action("nginx", ServiceAction::Restart)
        .await
        .unwrap();
    assert_eq!(result.service, "nginx");
    system
        .service_action("postfix", ServiceAction::Stop)
        .await
        .unwrap();

    assert!(matches!(
        system.service_action("docker", ServiceAction::Start).await,
        Err(PanelError::Forbidden(_))
    ));
    assert_eq!(
        sb.executor.command_lines(),
        vec![
            "systemctl restart nginx".to_string(),
            "systemctl stop postfix".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_logs_clamp_and_parse() {
    let sb = Sandbox::new();
    sb.executor.respond(
        "journalctl",
        "2024-06-01T12:00:01+0000 host nginx[812]: upstream timed out\n\
         2024-06-01T12:00:02+0000 host sshd[901]: error: maximum authentication attempts exceeded\n",
    );
    let system = SystemTools::new(sb.ctx.clone());

    let entries = system.logs(Some("nginx"), Some(5000)).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].unit, "nginx");
    assert_eq!(entries[1].level, "ERROR");

    system.logs(None, None).await.unwrap();
    assert_eq!(
        sb.executor.command_lines(),
        vec![
            "journalctl -n 1000 --no-pager --output=short-iso -u nginx".to_string(),
            "journalctl -n 100 --no-pager --output=short-iso".to_string(),
        ]
    );

    assert!(matches!(
        system.logs(Some("nginx;reboot"), None).await,
        Err(PanelError::InvalidArgument { .. })
    ));
}
