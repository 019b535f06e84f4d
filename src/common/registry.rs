use crate::common::context::PanelContext;
use crate::common::panel_module::PanelModule;
use crate::common::security::AuditLogger;
use std::sync::Arc;

/// Every panel module, built once over one shared [`PanelContext`].
///
/// Cloning is cheap; handlers receive the registry through router state.
#[derive(Clone)]
pub struct PanelRegistry {
    pub dns: Arc<crate::dns::DnsTools>,
    pub cron: Arc<crate::cron::CronTools>,
    pub mail: Arc<crate::mail::MailTools>,
    pub ftp: Arc<crate::ftp::FtpTools>,
    pub files: Arc<crate::files::FileManager>,
    pub vhosts: Arc<crate::vhosts::VhostTools>,
    pub users: Arc<crate::users::UserTools>,
    pub databases: Arc<crate::databases::DatabaseTools>,
    pub system: Arc<crate::system::SystemTools>,

    ctx: PanelContext,
}

impl PanelRegistry {
    pub fn new(ctx: PanelContext) -> Self {
        Self {
            dns: Arc::new(crate::dns::DnsTools::new(ctx.clone())),
            cron: Arc::new(crate::cron::CronTools::new(ctx.clone())),
            mail: Arc::new(crate::mail::MailTools::new(ctx.clone())),
            ftp: Arc::new(crate::ftp::FtpTools::new(ctx.clone())),
            files: Arc::new(crate::files::FileManager::new(ctx.clone())),
            vhosts: Arc::new(crate::vhosts::VhostTools::new(ctx.clone())),
            users: Arc::new(crate::users::UserTools::new(ctx.clone())),
            databases: Arc::new(crate::databases::DatabaseTools::new(ctx.clone())),
            system: Arc::new(crate::system::SystemTools::new(ctx.clone())),
            ctx,
        }
    }

    pub fn context(&self) -> &PanelContext {
        &self.ctx
    }

    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.ctx.audit
    }

    /// Module names, in registration order
    pub fn module_names(&self) -> [&'static str; 9] {
        [
            self.dns.name(),
            self.cron.name(),
            self.mail.name(),
            self.ftp.name(),
            self.files.name(),
            self.vhosts.name(),
            self.users.name(),
            self.databases.name(),
            self.system.name(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::PanelConfig;
    use crate::common::security::audit_logger;

    #[test]
    fn test_registry_shares_one_context() {
        let audit = audit_logger();
        let registry = PanelRegistry::new(PanelContext::elevated(
            PanelConfig::default(),
            Arc::clone(&audit),
        ));

        assert!(Arc::ptr_eq(registry.audit(), &audit));
        assert!(Arc::ptr_eq(registry.dns.audit_logger(), &audit));
        assert!(Arc::ptr_eq(registry.system.audit_logger(), &audit));
        assert!(Arc::ptr_eq(
            &registry.mail.context().gate,
            &registry.context().gate
        ));

        let names = registry.module_names();
        assert_eq!(names[0], "DnsTools");
        assert_eq!(names[8], "SystemTools");
    }
}
