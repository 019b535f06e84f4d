/// Reload dispatcher: tells a daemon to pick up a committed config change.
use crate::common::command::CommandGate;
use crate::common::error::{PanelError, PanelResult};
use std::sync::Arc;

/// Daemons the panel edits configuration for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Nginx,
    Postfix,
    Bind,
    Vsftpd,
}

impl Service {
    /// vsftpd has no graceful reload
    pub fn verb(self) -> &'static str {
        match self {
            Service::Vsftpd => "restart",
            Service::Nginx | Service::Postfix | Service::Bind => "reload",
        }
    }
}

pub struct ReloadDispatcher {
    gate: Arc<CommandGate>,
    bind_unit: String,
}

impl ReloadDispatcher {
    pub fn new(gate: Arc<CommandGate>, bind_unit: &str) -> Self {
        Self {
            gate,
            bind_unit: bind_unit.to_string(),
        }
    }

    pub fn unit(&self, service: Service) -> &str {
        match service {
            Service::Nginx => "nginx",
            Service::Postfix => "postfix",
            Service::Bind => &self.bind_unit,
            Service::Vsftpd => "vsftpd",
        }
    }

    /// `systemctl reload|restart <unit>`.
    ///
    /// The file change that preceded the call stays in place on failure.
    pub async fn reload(&self, service: Service) -> PanelResult<()> {
        let unit = self.unit(service);
        match self.gate.run("systemctl", &[service.verb(), unit]).await {
            Ok(_) => {
                tracing::info!(unit = %unit, verb = service.verb(), "service reloaded");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(unit = %unit, error = %e, "service reload failed");
                Err(PanelError::ReloadFailed {
                    service: unit.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// `nginx -t`
    pub async fn test_nginx(&self) -> PanelResult<()> {
        self.gate.run("nginx", &["-t"]).await.map(|_| ())
    }
}
