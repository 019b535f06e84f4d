/// Linux system accounts
pub mod accounts;
pub mod passwd;
pub mod types;

pub use accounts::UserTools;
pub use types::{CreateUserArgs, SystemUser, UpdateUserArgs};
