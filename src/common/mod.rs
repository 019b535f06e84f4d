/// Common infrastructure shared by every panel module.
///
/// # Modules
///
/// - [`command`] - Command gatekeeper: allowlist, metacharacter gate, executor seam
/// - [`compensation`] - Undo stack for multi-step operations
/// - [`config`] - Process configuration (defaults, TOML file, environment)
/// - [`context`] - Shared state handed to every module
/// - [`error`] - `PanelError` and its HTTP status mapping
/// - [`file_locks`] - Per-file async mutexes
/// - [`line_store`] - Line-oriented config file editing
/// - [`panel_module`] - Trait implemented by every domain module
/// - [`registry`] - Central registry of module instances
/// - [`reload`] - Daemon reload/restart after a committed change
/// - [`security`] - Input validation, confinement, audit logging, password hashing
///
/// # Architecture
///
/// ```text
/// Router (server)
///   └── PanelRegistry (one instance of each module)
///       ├── DnsTools, CronTools, MailTools, ...
///       └── PanelContext (shared)
///           ├── PanelConfig
///           ├── AuditLogger (security event logging)
///           ├── CommandGate ── Executor (sudo / test double)
///           ├── LineStore ──── FileLocks
///           └── ReloadDispatcher
/// ```
pub mod command;
pub mod compensation;
pub mod config;
pub mod context;
pub mod error;
pub mod file_locks;
pub mod line_store;
pub mod panel_module;
pub mod registry;
pub mod reload;
pub mod security;
