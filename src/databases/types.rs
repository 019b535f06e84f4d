/// Parameter and result types for MySQL/MariaDB schemas.
use serde::{Deserialize, Serialize};

/// Parameters for [`DatabaseTools::create`](crate::databases::DatabaseTools::create).
///
/// `db_user` and `password` go together: both or neither.
///
/// # Examples
///
/// ```
/// use vpsctl::databases::types::CreateDatabaseArgs;
///
/// let args = CreateDatabaseArgs {
///     name: "shop".to_string(),
///     db_user: Some("shop_app".to_string()),
///     password: Some("n0t-in-argv".to_string()),
///     host: None,
/// };
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDatabaseArgs {
    pub name: String,
    #[serde(default)]
    pub db_user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Account host (default: localhost)
    #[serde(default)]
    pub host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Database {
    pub name: String,
    /// Data plus index size, e.g. `12.5 MB`
    pub size: String,
    pub tables: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseCreated {
    pub database: String,
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableList {
    pub database: String,
    pub tables: Vec<String>,
}
