/// Security infrastructure for the panel.
///
/// Everything that stands between an HTTP request and a privileged side effect
/// lives here.
///
/// # Modules
///
/// - [`audit`] - Security event logging and audit trail management
/// - [`confine`] - Directory confinement for user-supplied paths
/// - [`helpers`] - Operation wrappers (audit timing, timeouts)
/// - [`input_validation`] - Sanitizer and field validators
/// - [`password`] - Argon2id hashing for stored credentials
///
/// # Security Features
///
/// ## Input Validation
///
/// Untrusted values are reduced to `[A-Za-z0-9._-]` before they become a file
/// name or a command argument. Values that must keep a richer alphabet (DNS
/// record data, passwords) are checked against the shell metacharacter set
/// instead, and passwords never travel through argv.
///
/// ## Audit Logging
///
/// Operation invocations, rejected inputs, gate refusals, privileged process
/// runs (without argument values), timeouts, logins, destructive operations
/// and rollbacks are all logged as JSON events.
///
/// # Examples
///
/// ```no_run
/// use vpsctl::common::security::{audit_logger, sanitize, validate_domain};
///
/// assert_eq!(sanitize("a;b|c"), "abc");
/// let domain = validate_domain("Example.com").expect("valid domain");
///
/// let logger = audit_logger();
/// logger.log_operation("create_zone", None, true, None, 0);
/// # let _ = domain;
/// ```
///
/// # Threat Model
///
/// - **Command Injection** (OWASP A03:2021): allowlist plus metacharacter gate
/// - **Path Traversal** (OWASP A01:2021): lexical confinement
/// - **Config Injection**: newline and metacharacter checks on generated lines
/// - **Denial of Service**: per-command timeouts, payload limits
pub mod audit;
pub mod confine;
pub mod helpers;
pub mod input_validation;
pub mod password;

pub use audit::{audit_logger, AuditLogger};
pub use confine::{confine, PathConfiner};
pub use input_validation::{
    find_metacharacter, sanitize, sanitized_token, split_email, validate_domain,
    validate_ip_address, validate_password, validate_php_version, validate_quota,
    validate_record_name, validate_record_value, validate_shell, validate_username,
    ValidationError,
};
pub use password::{hash_password, verify_password};
