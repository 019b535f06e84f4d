/// Parameter and result types for nginx virtual hosts.
use serde::{Deserialize, Serialize};

/// Parameters for [`VhostTools::create`](crate::vhosts::VhostTools::create).
///
/// # Examples
///
/// ```
/// use vpsctl::vhosts::types::CreateVhostArgs;
///
/// let args = CreateVhostArgs {
///     domain: "shop.example.com".to_string(),
///     docroot: None,
///     php: Some("8.3".to_string()),
///     ssl: false,
/// };
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVhostArgs {
    pub domain: String,
    /// Under the web root (default: `<web_root>/<domain>/public_html`)
    #[serde(default)]
    pub docroot: Option<String>,
    /// PHP-FPM version (default: 8.2)
    #[serde(default)]
    pub php: Option<String>,
    /// Request a certificate once the site is live
    #[serde(default)]
    pub ssl: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnableSslArgs {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vhost {
    pub domain: String,
    pub docroot: Option<String>,
    pub ssl: bool,
    pub enabled: bool,
    pub php: Option<String>,
}
