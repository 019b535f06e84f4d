/// Shared state handed to every panel module.
use crate::common::command::{CommandGate, ElevatedExecutor, Executor};
use crate::common::config::PanelConfig;
use crate::common::file_locks::FileLocks;
use crate::common::line_store::LineStore;
use crate::common::reload::ReloadDispatcher;
use crate::common::security::AuditLogger;
use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Duration;

/// Source of local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

#[derive(Clone)]
pub struct PanelContext {
    pub config: Arc<PanelConfig>,
    pub audit: Arc<AuditLogger>,
    pub gate: Arc<CommandGate>,
    pub store: Arc<LineStore>,
    pub reload: Arc<ReloadDispatcher>,
    pub clock: Arc<dyn Clock>,
}

impl PanelContext {
    /// Wire the core around an executor
    pub fn new(config: PanelConfig, executor: Arc<dyn Executor>, audit: Arc<AuditLogger>) -> Self {
        let gate = Arc::new(CommandGate::new(
            executor,
            Arc::clone(&audit),
            Duration::from_secs(config.commands.timeout_secs),
        ));
        let reload = Arc::new(ReloadDispatcher::new(
            Arc::clone(&gate),
            &config.services.bind_unit,
        ));

        Self {
            config: Arc::new(config),
            audit,
            gate,
            store: Arc::new(LineStore::new(Arc::new(FileLocks::new()))),
            reload,
            clock: Arc::new(SystemClock),
        }
    }

    /// Production wiring: real processes behind the configured elevation wrapper
    pub fn elevated(config: PanelConfig, audit: Arc<AuditLogger>) -> Self {
        let executor = Arc::new(ElevatedExecutor::new(&config.commands.elevation));
        Self::new(config, executor, audit)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
