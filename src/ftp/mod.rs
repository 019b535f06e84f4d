/// vsftpd accounts
pub mod accounts;
pub mod types;

pub use accounts::FtpTools;
pub use types::{CreateFtpUserArgs, FtpPasswordArgs, FtpUser};
