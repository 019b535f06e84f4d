/// Crontab line codec: five schedule fields followed by a command.
use serde::{Deserialize, Serialize};

/// The five schedule fields of a crontab line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronSchedule {
    pub minute: String,
    pub hour: String,
    pub day: String,
    pub month: String,
    pub weekday: String,
}

impl CronSchedule {
    pub fn fields(&self) -> [&str; 5] {
        [
            self.minute.as_str(),
            self.hour.as_str(),
            self.day.as_str(),
            self.month.as_str(),
            self.weekday.as_str(),
        ]
    }

    /// First field outside the accepted alphabet, if any
    pub fn invalid_field(&self) -> Option<&str> {
        self.fields().into_iter().find(|f| !is_valid_cron_field(f))
    }

    /// Canonical summaries for the common shapes, else the raw fields
    pub fn human_readable(&self) -> String {
        let [min, hour, day, month, weekday] = self.fields();
        match (min, hour, day, month, weekday) {
            ("*", "*", "*", "*", "*") => "Every minute".to_string(),
            ("0", "*", _, _, _) => "Every hour".to_string(),
            ("0", "0", "*", "*", "*") => "Daily at midnight".to_string(),
            ("0", "0", "*", "*", "0") => "Weekly on Sunday".to_string(),
            ("0", "0", "1", _, _) => "Monthly on the 1st".to_string(),
            _ => self.fields().join(" "),
        }
    }
}

/// Syntactic check only: `[0-9*/,-]+`. `5-2` or `99` pass.
pub fn is_valid_cron_field(field: &str) -> bool {
    !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '*' | '/' | ',' | '-'))
}

/// A parsed record line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronLine {
    pub schedule: CronSchedule,
    /// Only present in the system crontab
    pub user: Option<String>,
    pub command: String,
}

/// Parse a record line; `with_user` expects the system crontab's user column.
///
/// The command is the remaining tokens rejoined with single spaces.
pub fn parse_cron_line(line: &str, with_user: bool) -> Option<CronLine> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let command_start = if with_user { 6 } else { 5 };
    if parts.len() <= command_start {
        return None;
    }

    Some(CronLine {
        schedule: CronSchedule {
            minute: parts[0].to_string(),
            hour: parts[1].to_string(),
            day: parts[2].to_string(),
            month: parts[3].to_string(),
            weekday: parts[4].to_string(),
        },
        user: with_user.then(|| parts[5].to_string()),
        command: parts[command_start..].join(" "),
    })
}

pub fn format_cron_line(schedule: &CronSchedule, command: &str) -> String {
    format!("{} {}", schedule.fields().join(" "), command)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Fields built from the accepted alphabet always validate
        #[test]
        fn prop_alphabet_accepted(field in "[0-9*/,-]{1,12}") {
            prop_assert!(is_valid_cron_field(&field));
        }

        /// Any field carrying a character outside the alphabet is rejected
        #[test]
        fn prop_injection_rejected(
            base in "[0-9*]{0,4}",
            bad in prop::sample::select(vec![";", " ", "$", "`", "|", "&", "\n", "a", "("]),
        ) {
            let field = format!("{}{}", base, bad);
            prop_assert!(!is_valid_cron_field(&field));
        }
    }
}
