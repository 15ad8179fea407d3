//! rulepatch: apply ordered pattern/replacement rules to text files
//!
//! A patch plan names an entry file, an optional batch directory, a descriptor
//! edit and a static response artifact. Originals are backed up once, before
//! the first write, and a file is only written when its content changed.

pub mod backup;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod patch;
pub mod render;
pub mod rules;
pub mod scan;
pub mod utils;
