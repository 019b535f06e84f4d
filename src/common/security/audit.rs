/// Structured audit trail.
///
/// Every privileged panel action is written as one JSON event under the
/// `vpsctl::audit` tracing target.
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Severity attached to an audit event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SecurityLevel {
    /// Normal panel activity
    Info,
    /// Refused input or a failed but harmless action
    Warning,
    Error,
    /// Likely attack, or a rollback that left the host inconsistent
    Critical,
}

impl SecurityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            SecurityLevel::Info => "info",
            SecurityLevel::Warning => "warning",
            SecurityLevel::Error => "error",
            SecurityLevel::Critical => "critical",
        }
    }

    /// `Info` on success, `failure` otherwise
    fn outcome(success: bool, failure: SecurityLevel) -> SecurityLevel {
        if success {
            SecurityLevel::Info
        } else {
            failure
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum AuditEvent {
    /// One panel operation from start to finish
    OperationInvoked {
        operation: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        parameters: Option<serde_json::Value>,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        duration_ms: u64,
    },

    ValidationFailed {
        field: String,
        value: String,
        reason: String,
    },

    /// The command gate refused to spawn a process
    CommandRejected { command: String, reason: String },

    /// A privileged process ran. Argument values are never recorded.
    CommandExecuted {
        command: String,
        args_count: usize,
        success: bool,
        duration_ms: u64,
    },

    OperationTimeout {
        operation: String,
        timeout_secs: u64,
    },

    /// Admin login attempt or token rejection
    AuthEvent { success: bool, reason: String },

    /// Service stop, recursive purge and similar destructive actions
    DangerousOperation {
        operation: String,
        approved: bool,
        reason: String,
    },

    /// Rollback of a multi-stage operation
    CompensationApplied {
        operation: String,
        steps_undone: Vec<String>,
        success: bool,
    },
}

impl AuditEvent {
    /// Short event name for log filtering
    pub fn kind(&self) -> &'static str {
        match self {
            AuditEvent::OperationInvoked { .. } => "operation",
            AuditEvent::ValidationFailed { .. } => "validation",
            AuditEvent::CommandRejected { .. } => "command_rejected",
            AuditEvent::CommandExecuted { .. } => "command",
            AuditEvent::OperationTimeout { .. } => "timeout",
            AuditEvent::AuthEvent { .. } => "auth",
            AuditEvent::DangerousOperation { .. } => "dangerous",
            AuditEvent::CompensationApplied { .. } => "compensation",
        }
    }
}

/// Writes [`AuditEvent`]s to the tracing pipeline
#[derive(Debug, Clone)]
pub struct AuditLogger {
    /// Longest rejected input copied into a validation event
    max_value_len: usize,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self { max_value_len: 64 }
    }

    pub fn log(&self, level: SecurityLevel, event: AuditEvent) {
        let kind = event.kind();
        let event_json = serde_json::to_string(&event)
            .unwrap_or_else(|e| format!("{{\"error\": \"unserializable {} event: {}\"}}", kind, e));

        match level {
            SecurityLevel::Info => {
                info!(target: "vpsctl::audit", severity = level.as_str(), kind, event = %event_json, "audit");
            }
            SecurityLevel::Warning => {
                warn!(target: "vpsctl::audit", severity = level.as_str(), kind, event = %event_json, "audit");
            }
            SecurityLevel::Error | SecurityLevel::Critical => {
                error!(target: "vpsctl::audit", severity = level.as_str(), kind, event = %event_json, "audit");
            }
        }
    }

    pub fn log_operation(
        &self,
        operation: &str,
        parameters: Option<serde_json::Value>,
        success: bool,
        error: Option<String>,
        duration_ms: u64,
    ) {
        self.log(
            SecurityLevel::outcome(success, SecurityLevel::Warning),
            AuditEvent::OperationInvoked {
                operation: operation.into(),
                parameters,
                success,
                error,
                duration_ms,
            },
        );
    }

    /// Password values are never copied; other values are cut short.
    pub fn log_validation_failure(&self, field: &str, value: &str, reason: &str) {
        let value = if field.contains("password") {
            "<redacted>".to_string()
        } else {
            value.chars().take(self.max_value_len).collect()
        };
        self.log(
            SecurityLevel::Warning,
            AuditEvent::ValidationFailed {
                field: field.into(),
                value,
                reason: reason.into(),
            },
        );
    }

    /// Metacharacter hits are logged as critical
    pub fn log_command_rejected(&self, command: &str, reason: &str, injection: bool) {
        let level = if injection {
            SecurityLevel::Critical
        } else {
            SecurityLevel::Error
        };
        self.log(
            level,
            AuditEvent::CommandRejected {
                command: command.into(),
                reason: reason.into(),
            },
        );
    }

    pub fn log_command_executed(
        &self,
        command: &str,
        args_count: usize,
        success: bool,
        duration_ms: u64,
    ) {
        self.log(
            SecurityLevel::outcome(success, SecurityLevel::Warning),
            AuditEvent::CommandExecuted {
                command: command.into(),
                args_count,
                success,
                duration_ms,
            },
        );
    }

    pub fn log_timeout(&self, operation: &str, timeout_secs: u64) {
        self.log(
            SecurityLevel::Warning,
            AuditEvent::OperationTimeout {
                operation: operation.into(),
                timeout_secs,
            },
        );
    }

    pub fn log_auth_event(&self, success: bool, reason: &str) {
        self.log(
            SecurityLevel::outcome(success, SecurityLevel::Error),
            AuditEvent::AuthEvent {
                success,
                reason: reason.into(),
            },
        );
    }

    /// Approved destructive actions are still warnings
    pub fn log_dangerous_operation(&self, operation: &str, approved: bool, reason: &str) {
        let level = if approved {
            SecurityLevel::Warning
        } else {
            SecurityLevel::Error
        };
        self.log(
            level,
            AuditEvent::DangerousOperation {
                operation: operation.into(),
                approved,
                reason: reason.into(),
            },
        );
    }

    /// A failed rollback is critical: the host may be half-configured
    pub fn log_compensation(&self, operation: &str, steps_undone: Vec<String>, success: bool) {
        let level = if success {
            SecurityLevel::Warning
        } else {
            SecurityLevel::Critical
        };
        self.log(
            level,
            AuditEvent::CompensationApplied {
                operation: operation.into(),
                steps_undone,
                success,
            },
        );
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

static PROCESS_AUDIT: once_cell::sync::Lazy<Arc<AuditLogger>> =
    once_cell::sync::Lazy::new(|| Arc::new(AuditLogger::new()));

/// Process-wide logger shared by every module
pub fn audit_logger() -> Arc<AuditLogger> {
    Arc::clone(&PROCESS_AUDIT)
}
