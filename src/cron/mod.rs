/// Crontab management
pub mod jobs;
pub mod schedule;
pub mod types;

pub use jobs::CronTools;
pub use schedule::{is_valid_cron_field, CronSchedule};
pub use types::{CronJob, CronJobArgs, RunTriggered};
