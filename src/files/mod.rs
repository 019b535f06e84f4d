/// Confined file manager
pub mod manager;
pub mod types;

pub use manager::{FileManager, MAX_READ_BYTES, MAX_UPLOAD_BYTES};
pub use types::{DirectoryListing, FileContent, FileEntry, PathArgs, RenameArgs, Uploaded, WriteFileArgs};
