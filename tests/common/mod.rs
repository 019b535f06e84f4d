#![allow(dead_code)]

/// Shared fixtures for integration tests: a recording executor that never
/// spawns a process, and a sandboxed file tree with every managed path.
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use vpsctl::common::command::{Executor, ProcessOutput};
use vpsctl::common::config::{PanelConfig, PathsConfig};
use vpsctl::common::context::{Clock, PanelContext};
use vpsctl::common::security::audit_logger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
}

impl Call {
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Records every call; programs succeed unless told to fail
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<String, String>>,
    matched_failures: Mutex<Vec<(String, String)>>,
    outputs: Mutex<HashMap<String, String>>,
}

impl RecordingExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every run of `program` exit non-zero with `stderr`
    pub fn fail(&self, program: &str, stderr: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(program.to_string(), stderr.to_string());
    }

    /// Fail only the calls whose command line or stdin contains `needle`
    pub fn fail_matching(&self, needle: &str, stderr: &str) {
        self.matched_failures
            .lock()
            .unwrap()
            .push((needle.to_string(), stderr.to_string()));
    }

    /// Canned stdout for `program`
    pub fn respond(&self, program: &str, stdout: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert(program.to_string(), stdout.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(Call::command_line).collect()
    }

    pub fn ran(&self, program: &str) -> bool {
        self.calls().iter().any(|c| c.program == program)
    }

    pub fn calls_to(&self, program: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> std::io::Result<ProcessOutput> {
        let call = Call {
            program: program.to_string(),
            args: args.to_vec(),
            stdin: stdin.map(<[u8]>::to_vec),
        };
        let haystack = format!(
            "{}\n{}",
            call.command_line(),
            String::from_utf8_lossy(stdin.unwrap_or_default())
        );
        self.calls.lock().unwrap().push(call);

        let matched = self
            .matched_failures
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| haystack.contains(needle.as_str()))
            .map(|(_, stderr)| stderr.clone());
        if let Some(stderr) = matched {
            return Ok(ProcessOutput {
                success: false,
                stdout: Vec::new(),
                stderr: stderr.into_bytes(),
            });
        }

        if let Some(stderr) = self.failures.lock().unwrap().get(program) {
            return Ok(ProcessOutput {
                success: false,
                stdout: Vec::new(),
                stderr: stderr.as_bytes().to_vec(),
            });
        }
        let stdout = self
            .outputs
            .lock()
            .unwrap()
            .get(program)
            .cloned()
            .unwrap_or_default();
        Ok(ProcessOutput {
            success: true,
            stdout: stdout.into_bytes(),
            stderr: Vec::new(),
        })
    }
}

/// Local time that advances one hour per reading
pub struct SteppingClock {
    next: Mutex<NaiveDateTime>,
}

impl SteppingClock {
    pub fn starting(start: NaiveDateTime) -> Self {
        Self {
            next: Mutex::new(start),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> NaiveDateTime {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next = now + chrono::Duration::hours(1);
        now
    }
}

pub fn june_first_noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// A temp directory laid out like the managed host
pub struct Sandbox {
    pub dir: TempDir,
    pub executor: Arc<RecordingExecutor>,
    pub ctx: PanelContext,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut PanelConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathsConfig::rooted_at(dir.path());

        for d in [
            &paths.files_root,
            &paths.web_root,
            &paths.home_root,
            &paths.cron_spool,
            &paths.zones_dir,
            &paths.mail_storage,
            &paths.nginx_available,
            &paths.nginx_enabled,
            &paths.proc_root,
        ] {
            std::fs::create_dir_all(d).unwrap();
        }
        for f in [
            &paths.system_crontab,
            &paths.named_conf,
            &paths.postfix_domains,
            &paths.postfix_maps,
            &paths.dovecot_users,
            &paths.vsftpd_userlist,
            &paths.passwd,
            &paths.shadow,
            &paths.os_release,
        ] {
            std::fs::create_dir_all(f.parent().unwrap()).unwrap();
        }

        let mut config = PanelConfig {
            paths,
            ..PanelConfig::default()
        };
        config.commands.elevation = String::new();
        adjust(&mut config);

        let executor = RecordingExecutor::new();
        let ctx = PanelContext::new(config, executor.clone(), audit_logger())
            .with_clock(Arc::new(SteppingClock::starting(june_first_noon())));

        Self { dir, executor, ctx }
    }

    pub fn paths(&self) -> &PathsConfig {
        &self.ctx.config.paths
    }

    pub fn write(&self, path: &Path, content: &str) {
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, path: &Path) -> String {
        std::fs::read_to_string(path).unwrap_or_default()
    }
}
