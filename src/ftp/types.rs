/// Parameter and result types for FTP accounts.
use serde::{Deserialize, Serialize};

/// Parameters for [`FtpTools::create_user`](crate::ftp::FtpTools::create_user).
///
/// # Examples
///
/// ```
/// use vpsctl::ftp::types::CreateFtpUserArgs;
///
/// let args = CreateFtpUserArgs {
///     username: "shop".to_string(),
///     password: "upl0ad-only!".to_string(),
///     home_dir: Some("shop.example.com".to_string()),
/// };
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFtpUserArgs {
    pub username: String,
    pub password: String,
    /// Home directory under the web root (default: `<web_root>/<username>`)
    #[serde(default)]
    pub home_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FtpPasswordArgs {
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FtpUser {
    pub username: String,
    pub home_dir: String,
    pub active: bool,
}
