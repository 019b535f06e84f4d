/// Parameter and result types for cron operations.
use serde::{Deserialize, Serialize};

/// Parameters for creating or replacing a job.
///
/// Used by [`CronTools::create_job`](crate::cron::CronTools::create_job) and
/// [`CronTools::update_job`](crate::cron::CronTools::update_job).
///
/// # Examples
///
/// ```
/// use vpsctl::cron::types::CronJobArgs;
///
/// let args = CronJobArgs {
///     minute: "*/5".to_string(),
///     hour: "*".to_string(),
///     day: "*".to_string(),
///     month: "*".to_string(),
///     weekday: "*".to_string(),
///     command: "/usr/local/bin/sync-backups".to_string(),
///     user: None,
/// };
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CronJobArgs {
    pub minute: String,
    pub hour: String,
    pub day: String,
    pub month: String,
    pub weekday: String,
    pub command: String,
    /// Crontab owner (default: root)
    #[serde(default)]
    pub user: Option<String>,
}

/// A job as listed.
///
/// `position` is the 1-based index among record lines of the owning crontab,
/// recomputed on every read. It is not stable across edits: deleting job 2
/// turns job 3 into job 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CronJob {
    pub position: usize,
    pub minute: String,
    pub hour: String,
    pub day: String,
    pub month: String,
    pub weekday: String,
    pub command: String,
    pub user: String,
    /// Human-readable summary
    pub schedule: String,
    pub enabled: bool,
    /// Listed from the system crontab rather than a user spool file
    pub system: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunTriggered {
    pub status: &'static str,
    pub position: usize,
    pub command: String,
}
