//! Small shared helpers

pub mod fs;
pub mod hashing;
pub mod paths;

pub use fs::{file_name_of, probe_writable, write_atomic};
pub use hashing::content_digest;
pub use paths::{display_relative, normalize_path};
