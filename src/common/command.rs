/// Command gatekeeper: the only path from the panel to a spawned process.
///
/// A program must be on [`ALLOWED_COMMANDS`] and no argument may carry a shell
/// metacharacter. Processes are spawned through an [`Executor`], which owns the
/// privilege-elevation mechanism, with argv passed as discrete arguments.
use crate::common::error::{PanelError, PanelResult};
use crate::common::security::audit::AuditLogger;
use crate::common::security::helpers::with_timeout;
use crate::common::security::input_validation::find_metacharacter;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

/// Programs the panel may execute
pub const ALLOWED_COMMANDS: &[&str] = &[
    "useradd",
    "userdel",
    "usermod",
    "passwd",
    "chpasswd",
    "nginx",
    "systemctl",
    "certbot",
    "mysql",
    "mysqladmin",
    "mkdir",
    "rm",
    "mv",
    "ls",
    "cat",
    "find",
    "df",
    "free",
    "uptime",
    "journalctl",
    "ln",
    "chmod",
    "chown",
    "postmap",
    "postqueue",
    "bash",
];

/// Raw output of a finished process
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Spawns processes on behalf of the gate
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> std::io::Result<ProcessOutput>;
}

/// Runs programs behind an elevation wrapper such as `sudo`
pub struct ElevatedExecutor {
    wrapper: Option<String>,
}

impl ElevatedExecutor {
    /// An empty wrapper runs programs directly
    pub fn new(wrapper: &str) -> Self {
        let wrapper = wrapper.trim();
        Self {
            wrapper: (!wrapper.is_empty()).then(|| wrapper.to_string()),
        }
    }
}

#[async_trait]
impl Executor for ElevatedExecutor {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> std::io::Result<ProcessOutput> {
        let mut cmd = match &self.wrapper {
            Some(wrapper) => {
                let mut cmd = tokio::process::Command::new(wrapper);
                cmd.arg(program);
                cmd
            }
            None => tokio::process::Command::new(program),
        };

        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input).await?;
            pipe.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        Ok(ProcessOutput {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Result of executing a command
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandResult {
    pub fn from_output(output: ProcessOutput) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.success,
        }
    }

    /// Trimmed stdout on success; trimmed stderr (never stdout) on failure
    pub fn into_stdout(self, program: &str) -> PanelResult<String> {
        if !self.success {
            return Err(PanelError::ExecutionFailed {
                command: program.to_string(),
                stderr: self.stderr.trim().to_string(),
            });
        }
        Ok(self.stdout.trim().to_string())
    }
}

/// Check a program and its arguments without running anything
pub fn validate_command(program: &str, args: &[&str]) -> PanelResult<()> {
    if !ALLOWED_COMMANDS.contains(&program) {
        return Err(PanelError::CommandNotAllowed(program.to_string()));
    }

    for arg in args {
        if let Some(character) = find_metacharacter(arg) {
            return Err(PanelError::InvalidArgument {
                argument: arg.to_string(),
                character,
            });
        }
    }

    Ok(())
}

/// Validates, executes and audits every privileged command
pub struct CommandGate {
    executor: Arc<dyn Executor>,
    audit: Arc<AuditLogger>,
    timeout: Duration,
}

impl CommandGate {
    pub fn new(executor: Arc<dyn Executor>, audit: Arc<AuditLogger>, timeout: Duration) -> Self {
        Self {
            executor,
            audit,
            timeout,
        }
    }

    /// Run and return trimmed stdout
    pub async fn run(&self, program: &str, args: &[&str]) -> PanelResult<String> {
        self.output(program, args, None).await?.into_stdout(program)
    }

    /// Run with a payload on stdin (passwords, SQL)
    ///
    /// The payload is not subject to the metacharacter check.
    pub async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        stdin: &[u8],
    ) -> PanelResult<String> {
        self.output(program, args, Some(stdin))
            .await?
            .into_stdout(program)
    }

    /// Run and hand back both streams regardless of exit status
    pub async fn output(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> PanelResult<CommandResult> {
        self.check(program, args)?;

        let argv: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let start = Instant::now();

        let result = with_timeout(&self.audit, program, self.timeout, || async {
            self.executor
                .run(program, &argv, stdin)
                .await
                .map_err(|e| PanelError::ExecutionFailed {
                    command: program.to_string(),
                    stderr: format!("failed to start: {}", e),
                })
        })
        .await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let success = matches!(&result, Ok(out) if out.success);
        self.audit
            .log_command_executed(program, argv.len(), success, duration_ms);

        result.map(CommandResult::from_output)
    }

    /// Validate now, then run on a detached task nobody awaits
    pub fn spawn_detached(&self, program: &str, args: &[&str]) -> PanelResult<()> {
        self.check(program, args)?;

        let executor = Arc::clone(&self.executor);
        let audit = Arc::clone(&self.audit);
        let program = program.to_string();
        let argv: Vec<String> = args.iter().map(|a| a.to_string()).collect();

        tokio::spawn(async move {
            let start = Instant::now();
            let success = match executor.run(&program, &argv, None).await {
                Ok(out) => out.success,
                Err(e) => {
                    tracing::warn!(command = %program, error = %e, "detached command failed to start");
                    false
                }
            };
            audit.log_command_executed(
                &program,
                argv.len(),
                success,
                start.elapsed().as_millis() as u64,
            );
        });

        Ok(())
    }

    fn check(&self, program: &str, args: &[&str]) -> PanelResult<()> {
        validate_command(program, args).inspect_err(|e| {
            let injection = matches!(e, PanelError::InvalidArgument { .. });
            self.audit
                .log_command_rejected(program, &e.to_string(), injection);
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any argument containing a metacharacter is refused, whatever the program
        #[test]
        fn prop_metachar_rejected(
            program in prop::sample::select(ALLOWED_COMMANDS.to_vec()),
            prefix in "[a-z0-9/.-]{0,10}",
            metachar in prop::sample::select(vec![";", "&", "|", "`", "$", "(", ")", "<", ">", "\n", "\r"]),
            suffix in "[a-z0-9]{0,10}"
        ) {
            let arg = format!("{}{}{}", prefix, metachar, suffix);
            let is_invalid_argument = matches!(
                validate_command(program, &[&arg]),
                Err(PanelError::InvalidArgument { .. })
            );
            prop_assert!(is_invalid_argument);
        }

        /// Programs outside the allowlist are refused even with clean arguments
        #[test]
        fn prop_unknown_program_rejected(program in "[a-z]{2,12}") {
            prop_assume!(!ALLOWED_COMMANDS.contains(&program.as_str()));
            let is_not_allowed = matches!(
                validate_command(&program, &["--help"]),
                Err(PanelError::CommandNotAllowed(_))
            );
            prop_assert!(is_not_allowed);
        }
    }
}
