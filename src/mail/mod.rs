/// Postfix/Dovecot virtual mail
pub mod mailboxes;
pub mod maps;
pub mod types;

pub use mailboxes::MailTools;
pub use types::{AddDomainArgs, CreateMailboxArgs, MailDomain, MailQueue, Mailbox};
