/// nginx virtual hosts
pub mod sites;
pub mod template;
pub mod types;

pub use sites::VhostTools;
pub use types::{CreateVhostArgs, EnableSslArgs, Vhost};
