/// Host statistics, managed services and the journal
pub mod journal;
pub mod monitor;
pub mod procfs;
pub mod types;

pub use monitor::{SystemTools, MONITORED_SERVICES};
pub use types::{LogEntry, ServiceAction, ServiceActionResult, ServiceStatus, SystemStats};
