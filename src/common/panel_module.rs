/// Common trait for all panel modules.
///
/// Every domain module (`DnsTools`, `CronTools`, `MailTools`, ...) holds the
/// shared [`PanelContext`] and implements [`PanelModule`].
///
/// # Examples
///
/// ```no_run
/// use vpsctl::common::config::PanelConfig;
/// use vpsctl::common::context::PanelContext;
/// use vpsctl::common::panel_module::PanelModule;
/// use vpsctl::common::security::audit_logger;
/// use vpsctl::dns::DnsTools;
///
/// let ctx = PanelContext::elevated(PanelConfig::default(), audit_logger());
/// let dns = DnsTools::new(ctx);
/// assert_eq!(dns.name(), "DnsTools");
/// dns.log_operation_error("create_zone", "zone exists");
/// ```
use crate::common::context::PanelContext;
use crate::common::security::AuditLogger;
use std::sync::Arc;

pub trait PanelModule {
    /// Shared context: config, gate, line store, reload dispatcher
    fn context(&self) -> &PanelContext;

    /// Returns the name of this module.
    ///
    /// Used for logging and error messages.
    fn name(&self) -> &'static str;

    fn audit_logger(&self) -> &Arc<AuditLogger> {
        &self.context().audit
    }

    /// Log successful completion of an operation.
    fn log_operation_success(&self, operation: &str, detail: Option<&str>) {
        let message = match detail {
            Some(d) => format!("{}::{} completed: {}", self.name(), operation, d),
            None => format!("{}::{} completed successfully", self.name(), operation),
        };
        tracing::debug!("{}", message);
    }

    /// Log an operation error for debugging.
    fn log_operation_error(&self, operation: &str, error: &str) {
        tracing::error!("{}::{} failed: {}", self.name(), operation, error);
    }
}
