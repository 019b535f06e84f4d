/// Security helper functions for wrapping panel operations with audit logging and timeouts
use super::{AuditLogger, ValidationError};
use crate::common::error::{PanelError, PanelResult};
use std::time::{Duration, Instant};

/// Value recorded in the audit trail for a rejected input
fn rejected_value(err: &ValidationError) -> &str {
    match err {
        ValidationError::InvalidCharacters { value, .. }
        | ValidationError::Protected { value, .. }
        | ValidationError::Duplicate { value, .. } => value,
        ValidationError::InvalidFormat { got, .. } => got,
        _ => "",
    }
}

/// Audit operation execution with timing
///
/// Validation failures surfacing from `f` are additionally recorded as
/// `ValidationFailed` events.
pub async fn audit_operation<F, Fut, T>(
    audit: &AuditLogger,
    operation: &str,
    parameters: Option<serde_json::Value>,
    f: F,
) -> PanelResult<T>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = PanelResult<T>>,
{
    let start = Instant::now();
    let result = f().await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match &result {
        Ok(_) => {
            audit.log_operation(operation, parameters, true, None, duration_ms);
        }
        Err(e) => {
            if let PanelError::Validation(v) = e {
                audit.log_validation_failure(v.field(), rejected_value(v), &v.to_string());
            }
            audit.log_operation(operation, parameters, false, Some(e.to_string()), duration_ms);
        }
    }

    result
}

/// Execute with timeout
pub async fn with_timeout<F, Fut, T>(
    audit: &AuditLogger,
    operation_name: &str,
    timeout: Duration,
    f: F,
) -> PanelResult<T>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = PanelResult<T>>,
{
    match tokio::time::timeout(timeout, f()).await {
        Ok(result) => result,
        Err(_) => {
            audit.log_timeout(operation_name, timeout.as_secs());
            Err(PanelError::Timeout {
                command: operation_name.to_string(),
                timeout_secs: timeout.as_secs(),
            })
        }
    }
}
