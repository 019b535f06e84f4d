/// Parameter and result types for system accounts.
use serde::{Deserialize, Serialize};

/// Parameters for [`UserTools::create`](crate::users::UserTools::create).
///
/// # Examples
///
/// ```
/// use vpsctl::users::types::CreateUserArgs;
///
/// let args = CreateUserArgs {
///     username: "deploy".to_string(),
///     password: "hunter2-but-longer".to_string(),
///     shell: Some("/bin/bash".to_string()),
///     groups: Some("www-data,adm".to_string()),
/// };
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserArgs {
    pub username: String,
    pub password: String,
    /// Login shell (default: /bin/bash)
    #[serde(default)]
    pub shell: Option<String>,
    /// Comma-separated supplementary groups
    #[serde(default)]
    pub groups: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserArgs {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub shell: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemUser {
    pub username: String,
    pub uid: u32,
    pub gid: u32,
    pub home: String,
    pub shell: String,
    /// Password field in the shadow file starts with `!`
    pub locked: bool,
}
