/// MySQL/MariaDB schemas and grants
pub mod schemas;
pub mod sql;
pub mod types;

pub use schemas::DatabaseTools;
pub use types::{CreateDatabaseArgs, Database, DatabaseCreated, TableList};
