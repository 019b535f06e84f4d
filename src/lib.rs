// Library exports for vpsctl
// The binary and the integration tests drive the panel through these modules

pub mod common;
pub mod cron;
pub mod databases;
pub mod dns;
pub mod files;
pub mod ftp;
pub mod mail;
pub mod server;
pub mod system;
pub mod users;
pub mod vhosts;
