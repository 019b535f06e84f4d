/// Parameter and result types for mail operations.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct AddDomainArgs {
    pub domain: String,
}

/// Parameters for [`MailTools::create_mailbox`](crate::mail::MailTools::create_mailbox).
///
/// # Examples
///
/// ```
/// use vpsctl::mail::types::CreateMailboxArgs;
///
/// let args = CreateMailboxArgs {
///     email: "info@example.com".to_string(),
///     password: "s3cret-passw0rd".to_string(),
///     quota: Some("2G".to_string()),
/// };
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMailboxArgs {
    pub email: String,
    pub password: String,
    /// Dovecot storage quota such as `500M` (default: 1G)
    #[serde(default)]
    pub quota: Option<String>,
}

/// A hosted domain with the number of mailboxes mapped to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailDomain {
    pub domain: String,
    pub mailboxes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mailbox {
    pub email: String,
    pub domain: String,
    /// Maildir relative to the mail storage root (`domain/user/`)
    pub maildir: String,
    /// From the credential entry, when one exists
    pub quota: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailQueue {
    pub queue: String,
}
