use crate::common::context::PanelContext;
use crate::common::error::{PanelError, PanelResult};
use crate::common::line_store::{positioned, RecordFilter};
use crate::common::panel_module::PanelModule;
use crate::common::security::helpers::audit_operation;
use crate::common::security::{validate_username, ValidationError};
use std::path::{Path, PathBuf};

use super::schedule::{format_cron_line, parse_cron_line, CronSchedule};
use super::types::{CronJob, CronJobArgs, RunTriggered};

const DEFAULT_USER: &str = "root";
const MAX_COMMAND_LEN: usize = 4096;

/// Per-user crontab management over the cron spool directory.
///
/// Jobs are addressed by position, see [`CronJob::position`]. The cron daemon
/// watches the spool directory itself, so no reload follows an edit.
pub struct CronTools {
    ctx: PanelContext,
}

impl CronTools {
    pub fn new(ctx: PanelContext) -> Self {
        Self { ctx }
    }

    fn crontab_path(&self, user: &str) -> PathBuf {
        self.ctx.config.paths.cron_spool.join(user)
    }

    /// One user's jobs, or every spool crontab plus the system crontab
    pub async fn list_jobs(&self, user: Option<&str>) -> PanelResult<Vec<CronJob>> {
        audit_operation(
            &self.ctx.audit,
            "list_cron_jobs",
            Some(serde_json::json!({"user": user})),
            || async {
                if let Some(raw) = user.filter(|u| !u.is_empty()) {
                    let user = validate_username(raw)?;
                    return self.read_crontab(&user).await;
                }

                let mut jobs = Vec::new();
                for user in self.spool_users().await? {
                    jobs.extend(self.read_crontab(&user).await?);
                }
                jobs.extend(self.read_system_crontab().await?);
                Ok(jobs)
            },
        )
        .await
    }

    pub async fn create_job(&self, args: CronJobArgs) -> PanelResult<CronJob> {
        audit_operation(
            &self.ctx.audit,
            "create_cron_job",
            Some(serde_json::json!({"user": &args.user})),
            || async {
                let user = job_owner(args.user.as_deref())?;
                let (schedule, command) = validate_job(&args)?;
                let line = format_cron_line(&schedule, &command);

                tokio::fs::create_dir_all(&self.ctx.config.paths.cron_spool).await?;
                let path = self.crontab_path(&user);
                self.ctx.store.append_private(&path, &line).await?;

                let position = self
                    .ctx
                    .store
                    .records(&path, RecordFilter::Crontab)
                    .await?
                    .len();
                Ok(job_from(&schedule, command, &user, position, false))
            },
        )
        .await
    }

    /// Replace the job at `position` in the crontab of `args.user`
    pub async fn update_job(&self, position: usize, args: CronJobArgs) -> PanelResult<CronJob> {
        audit_operation(
            &self.ctx.audit,
            "update_cron_job",
            Some(serde_json::json!({"user": &args.user, "position": position})),
            || async {
                let user = job_owner(args.user.as_deref())?;
                let (schedule, command) = validate_job(&args)?;
                let line = format_cron_line(&schedule, &command);

                self.ctx
                    .store
                    .replace_by_position(&self.crontab_path(&user), RecordFilter::Crontab, position, &line)
                    .await?
                    .ok_or_else(|| job_not_found(&user, position))?;

                Ok(job_from(&schedule, command, &user, position, false))
            },
        )
        .await
    }

    pub async fn delete_job(&self, user: Option<&str>, position: usize) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "delete_cron_job",
            Some(serde_json::json!({"user": user, "position": position})),
            || async {
                let user = job_owner(user)?;
                self.ctx
                    .store
                    .remove_by_position(&self.crontab_path(&user), RecordFilter::Crontab, position)
                    .await?
                    .ok_or_else(|| job_not_found(&user, position))?;
                Ok(())
            },
        )
        .await
    }

    /// Launch the job's command now through `bash -c` without waiting for it
    pub async fn run_job_now(&self, user: Option<&str>, position: usize) -> PanelResult<RunTriggered> {
        audit_operation(
            &self.ctx.audit,
            "run_cron_job",
            Some(serde_json::json!({"user": user, "position": position})),
            || async {
                let user = job_owner(user)?;
                let job = self
                    .read_crontab(&user)
                    .await?
                    .into_iter()
                    .find(|j| j.position == position)
                    .ok_or_else(|| job_not_found(&user, position))?;

                self.ctx
                    .audit
                    .log_dangerous_operation("run_cron_job", true, &format!("Running job {} of {}", position, user));
                self.ctx.gate.spawn_detached("bash", &["-c", &job.command])?;

                Ok(RunTriggered {
                    status: "triggered",
                    position,
                    command: job.command,
                })
            },
        )
        .await
    }

    async fn read_crontab(&self, user: &str) -> PanelResult<Vec<CronJob>> {
        let path = self.crontab_path(user);
        let lines = self.ctx.store.read_lines(&path).await?;
        Ok(jobs_from_lines(&lines, Some(user)))
    }

    async fn read_system_crontab(&self) -> PanelResult<Vec<CronJob>> {
        let lines = self
            .ctx
            .store
            .read_lines(&self.ctx.config.paths.system_crontab)
            .await?;
        Ok(jobs_from_lines(&lines, None))
    }

    /// Crontab owners present in the spool, sorted
    async fn spool_users(&self) -> PanelResult<Vec<String>> {
        let spool: &Path = &self.ctx.config.paths.cron_spool;
        let mut entries = match tokio::fs::read_dir(spool).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut users = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // skips editor and rewrite temp files
            if name.starts_with('.') || !entry.file_type().await?.is_file() {
                continue;
            }
            users.push(name);
        }
        users.sort();
        Ok(users)
    }
}

impl PanelModule for CronTools {
    fn context(&self) -> &PanelContext {
        &self.ctx
    }

    fn name(&self) -> &'static str {
        "CronTools"
    }
}

/// Build jobs from crontab lines.
///
/// `owner` is `None` for the system crontab, whose lines carry a user column.
/// Malformed record lines keep their position but are not listed.
fn jobs_from_lines(lines: &[String], owner: Option<&str>) -> Vec<CronJob> {
    positioned(lines, RecordFilter::Crontab)
        .into_iter()
        .filter_map(|rec| {
            let parsed = parse_cron_line(&rec.line, owner.is_none())?;
            let user = match owner {
                Some(u) => u.to_string(),
                None => parsed.user.unwrap_or_default(),
            };
            Some(job_from(
                &parsed.schedule,
                parsed.command,
                &user,
                rec.position,
                owner.is_none(),
            ))
        })
        .collect()
}

fn job_from(schedule: &CronSchedule, command: String, user: &str, position: usize, system: bool) -> CronJob {
    CronJob {
        position,
        minute: schedule.minute.clone(),
        hour: schedule.hour.clone(),
        day: schedule.day.clone(),
        month: schedule.month.clone(),
        weekday: schedule.weekday.clone(),
        command,
        user: user.to_string(),
        schedule: schedule.human_readable(),
        enabled: true,
        system,
    }
}

fn job_owner(raw: Option<&str>) -> Result<String, ValidationError> {
    match raw.map(str::trim).filter(|u| !u.is_empty()) {
        Some(u) => validate_username(u),
        None => Ok(DEFAULT_USER.to_string()),
    }
}

fn validate_job(args: &CronJobArgs) -> Result<(CronSchedule, String), ValidationError> {
    let schedule = CronSchedule {
        minute: args.minute.trim().to_string(),
        hour: args.hour.trim().to_string(),
        day: args.day.trim().to_string(),
        month: args.month.trim().to_string(),
        weekday: args.weekday.trim().to_string(),
    };

    if let Some(bad) = schedule.invalid_field() {
        return Err(ValidationError::InvalidCharacters {
            field: "schedule".to_string(),
            value: bad.to_string(),
        });
    }

    let command = args.command.trim();
    if command.is_empty() {
        return Err(ValidationError::Empty {
            field: "command".to_string(),
        });
    }
    if command.len() > MAX_COMMAND_LEN {
        return Err(ValidationError::TooLong {
            field: "command".to_string(),
            max_length: MAX_COMMAND_LEN,
            actual: command.len(),
        });
    }
    // One job per line
    if command.contains(['\n', '\r', '\0']) {
        return Err(ValidationError::Suspicious {
            field: "command".to_string(),
            reason: "contains a line break".to_string(),
        });
    }

    Ok((schedule, command.to_string()))
}

fn job_not_found(user: &str, position: usize) -> PanelError {
    PanelError::not_found(format!("cron job {} for {}", position, user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(minute: &str, command: &str) -> CronJobArgs {
        CronJobArgs {
            minute: minute.to_string(),
            hour: "*".to_string(),
            day: "*".to_string(),
            month: "*".to_string(),
            weekday: "*".to_string(),
            command: command.to_string(),
            user: None,
        }
    }

    #[test]
    fn test_validate_job() {
        assert!(validate_job(&args("*/5", "/bin/true")).is_ok());
        assert!(validate_job(&args("5;rm", "/bin/true")).is_err());
        assert!(validate_job(&args("*", "  ")).is_err());
        assert!(validate_job(&args("*", "a\n* * * * * evil")).is_err());
    }

    #[test]
    fn test_job_owner() {
        assert_eq!(job_owner(None).unwrap(), "root");
        assert_eq!(job_owner(Some("")).unwrap(), "root");
        assert_eq!(job_owner(Some("deploy")).unwrap(), "deploy");
        assert_eq!(job_owner(Some("../deploy")).unwrap(), "..deploy");
        assert!(job_owner(Some("..")).is_err());
    }

    #[test]
    fn test_malformed_lines_keep_positions() {
        let lines: Vec<String> = [
            "MAILTO=ops@example.com",
            "0 0 * * * /a",
            "garbage",
            "5 * * * * /b",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let jobs = jobs_from_lines(&lines, Some("root"));
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].position, 1);
        assert_eq!(jobs[1].position, 3);
        assert_eq!(jobs[1].command, "/b");
    }

    #[test]
    fn test_system_crontab_user_column() {
        let lines = vec!["SHELL=/bin/sh".to_string(), "17 * * * * root run-parts /etc/cron.hourly".to_string()];
        let jobs = jobs_from_lines(&lines, None);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].user, "root");
        assert!(jobs[0].system);
        assert_eq!(jobs[0].command, "run-parts /etc/cron.hourly");
    }
}
